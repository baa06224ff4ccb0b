//! Push channel for manifest invalidation
//!
//! The shop server pushes `{"type": "ads.updated"}` whenever its ad list
//! changes. The connection is kept alive for the whole kiosk session:
//! whenever it closes or fails, the loop waits a fixed delay and
//! reconnects, until the session's cancellation token fires.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::metrics;
use crate::utils::error::PushError;

/// Default wait between reconnect attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Messages understood on the push channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum PushMessage {
    #[serde(rename = "ads.updated")]
    AdsUpdated,
    #[serde(other)]
    Other,
}

impl PushMessage {
    /// Parse a text frame; malformed frames are ignored as `Other`
    pub fn parse(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or(Self::Other)
    }
}

/// Receiver of "ads updated" notifications
#[async_trait]
pub trait UpdateSink: Send + Sync {
    async fn ads_updated(&self);
}

/// One connection's worth of push listening
#[async_trait]
pub trait PushSource: Send + Sync {
    /// Connect and forward notifications until the connection ends
    ///
    /// `Ok(())` means the server closed the connection cleanly.
    async fn listen(&self, sink: &dyn UpdateSink) -> Result<(), PushError>;
}

/// Keep a push connection alive until `cancel` fires
///
/// Reconnects after `reconnect_delay` whenever the connection ends, clean
/// or not. A malformed endpoint stops the loop for good.
pub async fn run_push_loop(
    source: Arc<dyn PushSource>,
    sink: Arc<dyn UpdateSink>,
    reconnect_delay: Duration,
    cancel: CancellationToken,
) {
    info!("Push channel started");

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = source.listen(sink.as_ref()) => result,
        };

        match result {
            Ok(()) => debug!("Push channel closed by server"),
            Err(e) if !e.is_recoverable() => {
                warn!(error = %e, "Push channel disabled");
                break;
            }
            Err(e) => warn!(error = %e, "Push channel failed"),
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(reconnect_delay) => {}
        }

        metrics::record_push_reconnect();
        debug!(
            delay_ms = reconnect_delay.as_millis() as u64,
            "Reconnecting push channel"
        );
    }

    info!("Push channel stopped");
}

/// WebSocket implementation of [`PushSource`]
pub struct WsPushSource {
    url: String,
}

impl WsPushSource {
    /// Build the source for one shop; `slug` is sent as a query parameter
    ///
    /// # Errors
    ///
    /// Returns `PushError::InvalidUrl` unless `endpoint` is a `ws://` or
    /// `wss://` URL
    pub fn new(endpoint: &str, slug: &str) -> Result<Self, PushError> {
        let mut url = Url::parse(endpoint).map_err(|_| PushError::InvalidUrl(endpoint.to_string()))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(PushError::InvalidUrl(endpoint.to_string()));
        }
        url.query_pairs_mut().append_pair("slug", slug);

        Ok(Self {
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PushSource for WsPushSource {
    async fn listen(&self, sink: &dyn UpdateSink) -> Result<(), PushError> {
        let (mut stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| PushError::Connect(Box::new(e)))?;
        info!(url = %self.url, "Push channel connected");

        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => match PushMessage::parse(text.as_str()) {
                    PushMessage::AdsUpdated => {
                        debug!("ads.updated received");
                        sink.ads_updated().await;
                    }
                    PushMessage::Other => {}
                },
                Ok(Message::Close(_)) => return Ok(()),
                Ok(_) => {}
                Err(e) => return Err(PushError::Transport(Box::new(e))),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        updates: AtomicUsize,
    }

    #[async_trait]
    impl UpdateSink for CountingSink {
        async fn ads_updated(&self) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Each connection delivers one update, then drops
    #[derive(Default)]
    struct DroppingSource {
        connects: AtomicUsize,
    }

    #[async_trait]
    impl PushSource for DroppingSource {
        async fn listen(&self, sink: &dyn UpdateSink) -> Result<(), PushError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            sink.ads_updated().await;
            Err(PushError::Transport(Box::new(
                tokio_tungstenite::tungstenite::Error::ConnectionClosed,
            )))
        }
    }

    #[test]
    fn test_parse_messages() {
        assert_eq!(PushMessage::parse(r#"{"type":"ads.updated"}"#), PushMessage::AdsUpdated);
        assert_eq!(PushMessage::parse(r#"{"type":"queue.changed","n":3}"#), PushMessage::Other);
        assert_eq!(PushMessage::parse("not json"), PushMessage::Other);
    }

    #[test]
    fn test_ws_url_validation() {
        let source = WsPushSource::new("wss://push.example.com/ws", "mineiro").unwrap();
        assert_eq!(source.url(), "wss://push.example.com/ws?slug=mineiro");

        assert!(WsPushSource::new("https://push.example.com/ws", "mineiro").is_err());
        assert!(WsPushSource::new("::::", "mineiro").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_with_fixed_delay_until_cancelled() {
        let source = Arc::new(DroppingSource::default());
        let sink = Arc::new(CountingSink::default());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_push_loop(
            source.clone(),
            sink.clone(),
            Duration::from_secs(3),
            cancel.clone(),
        ));

        // connects at 0s, 3s, 6s, 9s
        tokio::time::sleep(Duration::from_millis(9_500)).await;
        assert_eq!(source.connects.load(Ordering::SeqCst), 4);
        assert_eq!(sink.updates.load(Ordering::SeqCst), 4);

        cancel.cancel();
        task.await.unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.connects.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_endpoint_stops_loop() {
        struct BrokenSource;

        #[async_trait]
        impl PushSource for BrokenSource {
            async fn listen(&self, _sink: &dyn UpdateSink) -> Result<(), PushError> {
                Err(PushError::InvalidUrl("nope".into()))
            }
        }

        let cancel = CancellationToken::new();
        run_push_loop(
            Arc::new(BrokenSource),
            Arc::new(CountingSink::default()),
            Duration::from_secs(3),
            cancel,
        )
        .await;
    }
}
