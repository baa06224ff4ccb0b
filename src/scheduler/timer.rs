//! Single cancellable one-shot timer
//!
//! A [`TimerSlot`] holds at most one pending timer. Arming always cancels
//! the previous one first, and every fire carries the generation it was
//! armed with, so a fire that raced a cancel is recognized and dropped.
//! Fires are delivered as events on the owner's channel; nothing runs
//! inside the timer task itself.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Holder for one pending timer
pub struct TimerSlot<E> {
    name: &'static str,
    events: mpsc::Sender<E>,
    armed: Option<ArmedTimer>,
    generation: u64,
}

impl<E: Send + 'static> TimerSlot<E> {
    /// Create an unarmed slot delivering fires to `events`
    pub fn new(name: &'static str, events: mpsc::Sender<E>) -> Self {
        Self {
            name,
            events,
            armed: None,
            generation: 0,
        }
    }

    /// Arm the timer, cancelling any pending one first
    ///
    /// `make_event` receives the generation that [`TimerSlot::take_fired`]
    /// must be called with. Returns that generation.
    pub fn arm<F>(&mut self, delay: Duration, make_event: F) -> u64
    where
        F: FnOnce(u64) -> E + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let events = self.events.clone();
        let name = self.name;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if events.send(make_event(generation)).await.is_err() {
                trace!(timer = name, generation, "timer fired after receiver closed");
            }
        });

        trace!(
            timer = self.name,
            generation,
            delay_ms = delay.as_millis() as u64,
            "timer armed"
        );
        self.armed = Some(ArmedTimer { generation, handle });
        generation
    }

    /// Cancel the pending timer, if any; returns whether one was pending
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(timer) => {
                timer.handle.abort();
                trace!(timer = self.name, generation = timer.generation, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Consume a fire event
    ///
    /// Returns `true` only for the currently armed generation; the slot is
    /// then unarmed. Stale fires (cancelled or superseded) return `false`.
    pub fn take_fired(&mut self, generation: u64) -> bool {
        match &self.armed {
            Some(timer) if timer.generation == generation => {
                self.armed = None;
                true
            }
            _ => {
                trace!(timer = self.name, generation, "stale timer fire ignored");
                false
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Number of timers this slot has pending (0 or 1)
    pub fn pending(&self) -> usize {
        usize::from(self.armed.is_some())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<E> Drop for TimerSlot<E> {
    fn drop(&mut self) {
        if let Some(timer) = self.armed.take() {
            timer.handle.abort();
        }
    }
}
