//! Server-provided ad manifest
//!
//! This module covers the two ways ads reach the kiosk from the shop API:
//! - [`client`] - `GET /ads-manifest?slug=<shop>` with bounded retries
//! - [`push`] - push channel whose `ads.updated` message triggers a refetch
//!
//! A fetch that exhausts its retries yields an empty manifest, which makes
//! the kiosk fall back to queue-only rotation instead of surfacing an error.

pub mod client;
pub mod push;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::metrics;
use crate::models::AdManifest;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_cancellable, RetryConfig};

pub use client::HttpManifestClient;
pub use push::{run_push_loop, PushMessage, PushSource, UpdateSink, WsPushSource};

/// Source of the current ad manifest
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetch the full manifest once
    async fn fetch_manifest(&self) -> Result<AdManifest, FetchError>;
}

/// Fetch with retries, falling back to an empty manifest
///
/// Returns `None` if `cancel` fired first; the caller's session is gone and
/// the result must not be applied.
pub async fn fetch_with_fallback(
    source: &dyn ManifestSource,
    retry: &RetryConfig,
    cancel: &CancellationToken,
) -> Option<AdManifest> {
    let _timer = metrics::start_manifest_fetch_timer();
    match with_retry_cancellable(retry, cancel, || source.fetch_manifest()).await? {
        Ok(manifest) => {
            info!(ads = manifest.len(), "Ads manifest loaded");
            Some(manifest)
        }
        Err(e) => {
            metrics::record_manifest_fetch_failure();
            warn!(
                error = %e,
                attempts = retry.attempts(),
                "Ads manifest unavailable, falling back to queue-only rotation"
            );
            Some(AdManifest::empty())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdEntry, MediaType};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakySource {
        failures_before_success: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ManifestSource for FlakySource {
        async fn fetch_manifest(&self) -> Result<AdManifest, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                return Err(FetchError::ServerError(503));
            }
            Ok(AdManifest::new(vec![AdEntry {
                id: "1".into(),
                position: 1,
                media_type: MediaType::Image,
                url: "/uploads/1.png".into(),
                version: 1,
            }]))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_within_retry_budget() {
        let source = FlakySource {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
        };
        let cancel = CancellationToken::new();

        let manifest = fetch_with_fallback(&source, &RetryConfig::default(), &cancel)
            .await
            .unwrap();

        assert_eq!(manifest.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_give_empty_manifest() {
        let source = FlakySource {
            failures_before_success: u32::MAX,
            calls: AtomicU32::new(0),
        };
        let cancel = CancellationToken::new();

        let manifest = fetch_with_fallback(&source, &RetryConfig::default(), &cancel)
            .await
            .unwrap();

        assert!(manifest.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_fetch_returns_none() {
        let source = FlakySource {
            failures_before_success: 0,
            calls: AtomicU32::new(0),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = fetch_with_fallback(&source, &RetryConfig::default(), &cancel).await;
        assert!(result.is_none());
    }
}
