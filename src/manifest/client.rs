//! HTTP client for the shop's ads manifest endpoint

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::ManifestSource;
use crate::models::AdManifest;
use crate::utils::error::FetchError;
use crate::utils::join_url;

/// Path of the manifest endpoint, relative to the API base URL
pub const MANIFEST_PATH: &str = "ads-manifest";

/// Fetches `GET {base}/ads-manifest?slug=<shop>`
pub struct HttpManifestClient {
    client: Client,
    base_url: String,
    shop_slug: String,
}

impl HttpManifestClient {
    /// Create a client bound to one shop
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(
        base_url: impl Into<String>,
        shop_slug: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            shop_slug: shop_slug.into(),
        })
    }

    pub fn shop_slug(&self) -> &str {
        &self.shop_slug
    }

    /// Full manifest URL without the query string
    pub fn endpoint(&self) -> String {
        join_url(&self.base_url, MANIFEST_PATH)
    }
}

#[async_trait]
impl ManifestSource for HttpManifestClient {
    async fn fetch_manifest(&self) -> Result<AdManifest, FetchError> {
        let url = self.endpoint();
        debug!(url = %url, slug = %self.shop_slug, "Fetching ads manifest");

        let response = self
            .client
            .get(&url)
            .query(&[("slug", self.shop_slug.as_str())])
            .send()
            .await
            .map_err(FetchError::from_request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        let manifest: AdManifest = response.json().await.map_err(FetchError::from_request)?;

        Ok(AdManifest::new(manifest.ads))
    }
}
