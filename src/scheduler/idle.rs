//! Idle return guard
//!
//! When an operator navigates to the queue by hand, automatic rotation is
//! frozen and a one-shot idle countdown starts. If nobody touches the kiosk
//! before it runs out, rotation resumes. Every further `pause()` restarts
//! the countdown.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::rotation::RotationState;
use super::timer::TimerSlot;

/// Default idle period before rotation resumes
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Resumes rotation after a period without manual interaction
pub struct IdleReturnGuard<E> {
    timer: TimerSlot<E>,
    timeout: Duration,
}

impl<E: Send + 'static> IdleReturnGuard<E> {
    pub fn new(timeout: Duration, events: mpsc::Sender<E>) -> Self {
        Self {
            timer: TimerSlot::new("idle", events),
            timeout,
        }
    }

    /// Freeze rotation and (re)start the idle countdown
    pub fn pause<F>(&mut self, rotation: &mut RotationState, make_event: F)
    where
        F: FnOnce(u64) -> E + Send + 'static,
    {
        rotation.pause();
        self.timer.arm(self.timeout, make_event);
        debug!(
            timeout_ms = self.timeout.as_millis() as u64,
            "rotation paused, idle countdown started"
        );
    }

    /// Handle an idle timer fire
    ///
    /// Returns `true` when rotation was resumed; stale fires are ignored.
    pub fn on_timer(&mut self, generation: u64, rotation: &mut RotationState) -> bool {
        if !self.timer.take_fired(generation) {
            return false;
        }
        rotation.resume();
        debug!("idle period elapsed, rotation resumed");
        true
    }

    /// Stop the countdown without resuming rotation
    pub fn cancel(&mut self) -> bool {
        self.timer.cancel()
    }

    /// Whether an idle countdown is running
    pub fn is_counting(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn pending(&self) -> usize {
        self.timer.pending()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
