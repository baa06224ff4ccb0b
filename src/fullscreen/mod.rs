//! Full-screen coordination
//!
//! Full screen can only be requested in response to a user gesture, and the
//! platform may refuse. The coordinator keeps at most one request in flight,
//! swallows denials, and tracks the real state from the platform's change
//! notifications rather than from the request outcome.
//!
//! Every request belongs to an epoch. [`FullscreenCoordinator::withdraw`]
//! starts a new one, and a request that completes for an older epoch leaves
//! full screen again, so a slow grant cannot outlive the kiosk session.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::metrics;

/// Platform full-screen failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FullscreenError {
    #[error("Full-screen permission denied")]
    PermissionDenied,

    #[error("Full screen is not supported on this display")]
    Unsupported,

    #[error("Full-screen platform error: {0}")]
    Platform(String),
}

impl FullscreenError {
    /// A later user gesture may succeed
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Display that can enter and leave full screen
#[async_trait]
pub trait FullscreenPlatform: Send + Sync {
    async fn request_fullscreen(&self) -> Result<(), FullscreenError>;

    async fn exit_fullscreen(&self) -> Result<(), FullscreenError>;

    /// Change notifications; `true` while the display is full screen
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Observed full-screen state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullscreenState {
    #[default]
    NotFullscreen,
    Fullscreen,
}

/// Clears the in-flight flag when the request finishes, however it ends
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Guards full-screen requests and mirrors the platform state
#[derive(Clone)]
pub struct FullscreenCoordinator {
    platform: Arc<dyn FullscreenPlatform>,
    state: watch::Receiver<bool>,
    in_flight: Arc<AtomicBool>,
    epoch: Arc<AtomicU64>,
}

impl FullscreenCoordinator {
    pub fn new(platform: Arc<dyn FullscreenPlatform>) -> Self {
        let state = platform.subscribe();
        Self {
            platform,
            state,
            in_flight: Arc::new(AtomicBool::new(false)),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        *self.state.borrow()
    }

    pub fn state(&self) -> FullscreenState {
        if self.is_fullscreen() {
            FullscreenState::Fullscreen
        } else {
            FullscreenState::NotFullscreen
        }
    }

    /// Receiver of platform change notifications
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.state.clone()
    }

    /// Current request epoch
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Invalidate requests made so far; returns the new epoch
    pub fn withdraw(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Ask for full screen; must only be called from a user gesture
    ///
    /// Returns `false` if a request was already in flight or the display is
    /// already full screen. Denials are logged, never returned.
    pub async fn request_fullscreen(&self) -> bool {
        self.request_fullscreen_for(self.epoch()).await
    }

    /// Like [`request_fullscreen`](Self::request_fullscreen), for a gesture
    /// seen during `epoch`
    ///
    /// Nothing is requested if the epoch was already withdrawn. A grant that
    /// arrives after a withdrawal is undone.
    pub async fn request_fullscreen_for(&self, epoch: u64) -> bool {
        if self.is_fullscreen() || self.epoch() != epoch {
            return false;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Full-screen request already in flight");
            return false;
        }
        let _guard = InFlight(Arc::clone(&self.in_flight));

        match self.platform.request_fullscreen().await {
            Ok(()) if self.epoch() != epoch => {
                debug!(epoch, "Full screen granted after withdrawal, leaving again");
                if let Err(e) = self.platform.exit_fullscreen().await {
                    warn!(error = %e, "Failed to leave full screen");
                }
            }
            Ok(()) => debug!("Full-screen request accepted"),
            Err(e) => {
                metrics::record_fullscreen_denied();
                warn!(error = %e, "Full-screen request refused");
            }
        }
        true
    }

    /// Leave full screen; no-op when not full screen
    ///
    /// Also withdraws any request still in flight.
    pub async fn exit_fullscreen(&self) {
        self.withdraw();
        if !self.is_fullscreen() {
            return;
        }
        if let Err(e) = self.platform.exit_fullscreen().await {
            warn!(error = %e, "Failed to leave full screen");
        }
    }

    /// React to a user gesture: request full screen while in kiosk mode
    pub async fn on_interaction(&self, kiosk_active: bool) -> bool {
        self.on_interaction_for(kiosk_active, self.epoch()).await
    }

    /// React to a user gesture seen during `epoch`
    pub async fn on_interaction_for(&self, kiosk_active: bool, epoch: u64) -> bool {
        if !kiosk_active || self.is_fullscreen() {
            return false;
        }
        self.request_fullscreen_for(epoch).await
    }
}

/// Full-screen platform for headless runs
///
/// Requests succeed immediately unless denial is switched on, and state
/// changes are published like a real display would.
pub struct HeadlessDisplay {
    state: watch::Sender<bool>,
    deny: AtomicBool,
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state,
            deny: AtomicBool::new(false),
        }
    }

    /// Refuse every following request with `PermissionDenied`
    pub fn set_deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::Relaxed);
    }

    /// Simulate the user leaving full screen outside the app
    pub fn force_exit(&self) {
        self.state.send_replace(false);
    }
}

#[async_trait]
impl FullscreenPlatform for HeadlessDisplay {
    async fn request_fullscreen(&self) -> Result<(), FullscreenError> {
        if self.deny.load(Ordering::Relaxed) {
            return Err(FullscreenError::PermissionDenied);
        }
        self.state.send_replace(true);
        Ok(())
    }

    async fn exit_fullscreen(&self) -> Result<(), FullscreenError> {
        self.state.send_replace(false);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Platform whose requests hang until released
    struct SlowPlatform {
        state: watch::Sender<bool>,
        requests: AtomicUsize,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl FullscreenPlatform for SlowPlatform {
        async fn request_fullscreen(&self) -> Result<(), FullscreenError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            self.state.send_replace(true);
            Ok(())
        }

        async fn exit_fullscreen(&self) -> Result<(), FullscreenError> {
            self.state.send_replace(false);
            Ok(())
        }

        fn subscribe(&self) -> watch::Receiver<bool> {
            self.state.subscribe()
        }
    }

    #[tokio::test]
    async fn test_request_and_exit() {
        let display = Arc::new(HeadlessDisplay::new());
        let coordinator = FullscreenCoordinator::new(display.clone());
        assert_eq!(coordinator.state(), FullscreenState::NotFullscreen);

        assert!(coordinator.request_fullscreen().await);
        assert_eq!(coordinator.state(), FullscreenState::Fullscreen);

        // already full screen
        assert!(!coordinator.request_fullscreen().await);

        coordinator.exit_fullscreen().await;
        assert_eq!(coordinator.state(), FullscreenState::NotFullscreen);
    }

    #[tokio::test]
    async fn test_denial_is_swallowed() {
        let display = Arc::new(HeadlessDisplay::new());
        display.set_deny(true);
        let coordinator = FullscreenCoordinator::new(display.clone());

        assert!(coordinator.request_fullscreen().await);
        assert!(!coordinator.is_fullscreen());

        // the flag was released, a later gesture may try again
        display.set_deny(false);
        assert!(coordinator.on_interaction(true).await);
        assert!(coordinator.is_fullscreen());
    }

    #[tokio::test]
    async fn test_exit_when_not_fullscreen_is_noop() {
        let display = Arc::new(HeadlessDisplay::new());
        let coordinator = FullscreenCoordinator::new(display);
        coordinator.exit_fullscreen().await;
        assert!(!coordinator.is_fullscreen());
    }

    #[tokio::test]
    async fn test_interaction_outside_kiosk_mode_is_ignored() {
        let coordinator = FullscreenCoordinator::new(Arc::new(HeadlessDisplay::new()));
        assert!(!coordinator.on_interaction(false).await);
        assert!(!coordinator.is_fullscreen());
    }

    #[tokio::test]
    async fn test_duplicate_requests_are_guarded() {
        let (state, _) = watch::channel(false);
        let platform = Arc::new(SlowPlatform {
            state,
            requests: AtomicUsize::new(0),
            release: tokio::sync::Notify::new(),
        });
        let coordinator = FullscreenCoordinator::new(platform.clone());

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.request_fullscreen().await }
        });
        while platform.requests.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert!(!coordinator.request_fullscreen().await);

        platform.release.notify_one();
        assert!(first.await.unwrap());
        assert_eq!(platform.requests.load(Ordering::SeqCst), 1);
        assert!(coordinator.is_fullscreen());
    }

    #[tokio::test]
    async fn test_exit_withdraws_request_in_flight() {
        let (state, _) = watch::channel(false);
        let platform = Arc::new(SlowPlatform {
            state,
            requests: AtomicUsize::new(0),
            release: tokio::sync::Notify::new(),
        });
        let coordinator = FullscreenCoordinator::new(platform.clone());

        let request = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.request_fullscreen().await }
        });
        while platform.requests.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // not full screen yet, so the exit itself has nothing to undo
        coordinator.exit_fullscreen().await;
        platform.release.notify_one();

        assert!(request.await.unwrap());
        assert!(!coordinator.is_fullscreen());
    }

    #[tokio::test]
    async fn test_withdrawn_epoch_requests_nothing() {
        let display = Arc::new(HeadlessDisplay::new());
        let coordinator = FullscreenCoordinator::new(display);

        let epoch = coordinator.epoch();
        assert_eq!(coordinator.withdraw(), epoch + 1);

        assert!(!coordinator.on_interaction_for(true, epoch).await);
        assert!(!coordinator.is_fullscreen());
        assert!(coordinator.on_interaction_for(true, epoch + 1).await);
        assert!(coordinator.is_fullscreen());
    }

    #[tokio::test]
    async fn test_state_follows_platform_notifications() {
        let display = Arc::new(HeadlessDisplay::new());
        let coordinator = FullscreenCoordinator::new(display.clone());
        coordinator.request_fullscreen().await;

        display.force_exit();
        assert_eq!(coordinator.state(), FullscreenState::NotFullscreen);
    }
}
