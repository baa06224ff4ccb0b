use anyhow::{Context, Result};

use filakiosk::config::Config;
use filakiosk::probe::{probe_all, HttpAssetProbe};

pub async fn probe(config: &Config) -> Result<()> {
    let slots = &config.kiosk.static_slots;
    if slots.is_empty() {
        println!("No static slots configured.");
        return Ok(());
    }

    let probe = HttpAssetProbe::with_base_url(config.asset_base_url(), config.request_timeout())
        .context("Failed to create asset probe")?;

    println!("Probing {} slots against {}", slots.len(), config.asset_base_url());
    println!("================================");

    let availability = probe_all(&probe, slots).await;

    for (index, url) in slots.iter().enumerate() {
        let ordinal = index + 1;
        let status = if availability.is_available(ordinal) {
            "available"
        } else {
            "UNAVAILABLE"
        };
        println!("{ordinal:>3}  {status:<12} {url}");
    }

    println!(
        "\n{} of {} slots available",
        availability.available_count(),
        slots.len()
    );
    Ok(())
}
