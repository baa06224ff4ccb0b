//! Advertisement asset availability probing
//!
//! Before a static slot is offered for display its asset is checked with a
//! lightweight `HEAD` request. Servers that reject `HEAD` (or a transport
//! that cannot send one) get a plain `GET` instead. Every failure maps to
//! "unavailable"; probing never returns an error.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

use crate::models::AdAvailability;
use crate::utils::error::FetchError;
use crate::utils::join_url;

/// Checks whether an asset URL can be fetched
#[async_trait]
pub trait AssetProbe: Send + Sync {
    /// `true` if the asset answered with a success status
    async fn is_available(&self, url: &str) -> bool;
}

/// Probe every URL concurrently; slot `n` is `urls[n - 1]`
pub async fn probe_all(probe: &dyn AssetProbe, urls: &[String]) -> AdAvailability {
    let results = join_all(urls.iter().map(|url| probe.is_available(url))).await;

    let availability: AdAvailability = results
        .into_iter()
        .enumerate()
        .map(|(index, available)| (index + 1, available))
        .collect();

    info!(
        slots = urls.len(),
        available = availability.available_count(),
        "Asset probe finished"
    );

    availability
}

/// HTTP implementation of [`AssetProbe`]
pub struct HttpAssetProbe {
    client: Client,

    /// Base for root-relative asset paths such as `/ads/ad1.png`
    base_url: Option<String>,
}

impl HttpAssetProbe {
    /// Create a probe whose requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Create a probe that resolves relative asset paths against `base_url`
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let mut probe = Self::new(timeout)?;
        probe.base_url = Some(base_url.to_string());
        Ok(probe)
    }

    fn resolve(&self, url: &str) -> Result<String, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }

        match &self.base_url {
            Some(base) => Ok(join_url(base, url)),
            None => Err(FetchError::InvalidUrl(url.to_string())),
        }
    }

    /// Full `GET`, used when `HEAD` is unsupported or blocked
    async fn get_fallback(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                debug!(url = %url, status = response.status().as_u16(), "GET probe");
                ok
            }
            Err(e) => {
                debug!(url = %url, error = %e, "GET probe failed");
                false
            }
        }
    }
}

/// Statuses meaning "this server does not take HEAD", not "asset missing"
fn head_rejected(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED | StatusCode::FORBIDDEN
    )
}

#[async_trait]
impl AssetProbe for HttpAssetProbe {
    async fn is_available(&self, url: &str) -> bool {
        let url = match self.resolve(url) {
            Ok(url) => url,
            Err(e) => {
                debug!(error = %e, "Asset URL cannot be probed");
                return false;
            }
        };

        match self.client.head(&url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) if head_rejected(response.status()) => {
                debug!(
                    url = %url,
                    status = response.status().as_u16(),
                    "HEAD rejected, falling back to GET"
                );
                self.get_fallback(&url).await
            }
            Ok(response) => {
                debug!(url = %url, status = response.status().as_u16(), "Asset unavailable");
                false
            }
            Err(e) if e.is_timeout() => {
                debug!(url = %url, "HEAD probe timed out");
                false
            }
            Err(e) => {
                debug!(url = %url, error = %e, "HEAD probe failed, falling back to GET");
                self.get_fallback(&url).await
            }
        }
    }
}
