use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use filakiosk::config::Config;
use filakiosk::manifest::{fetch_with_fallback, HttpManifestClient};

pub async fn manifest(config: &Config) -> Result<()> {
    if config.api.shop_slug.trim().is_empty() {
        anyhow::bail!("api.shop_slug is required to fetch the manifest");
    }

    let client = HttpManifestClient::new(
        &config.api.base_url,
        &config.api.shop_slug,
        config.request_timeout(),
    )
    .context("Failed to create manifest client")?;

    let cancel = CancellationToken::new();
    let Some(manifest) = fetch_with_fallback(&client, &config.manifest_retry(), &cancel).await
    else {
        return Ok(());
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&manifest).context("Failed to encode manifest")?
    );

    if manifest.is_empty() {
        eprintln!("Manifest is empty; the kiosk would show the queue only.");
    }
    Ok(())
}
