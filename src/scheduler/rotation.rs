//! Availability-aware ad rotation
//!
//! This module implements the pure part of the kiosk scheduler:
//! - The `Queue` / `Ad(k)` state machine and its round-robin cursor
//! - Slot selection that skips unavailable assets (preferred, next, previous)
//! - The two slot sources: fixed numbered slots and the server manifest
//!
//! Nothing here touches timers or the network. The session feeds ticks in
//! and arms the returned delay.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::error::{SchedulerError, SchedulerResult};
use crate::models::{AdAvailability, AdManifest, AdSlot, DisplayView, StaticSlot};

// ============================================================================
// Timings
// ============================================================================

/// How long each view stays on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationTimings {
    /// Time spent on the queue view between ads
    pub queue_duration: Duration,

    /// Time spent on each ad
    pub ad_duration: Duration,
}

impl Default for RotationTimings {
    fn default() -> Self {
        Self {
            queue_duration: Duration::from_secs(15),
            ad_duration: Duration::from_secs(15),
        }
    }
}

impl RotationTimings {
    pub fn new(queue_duration: Duration, ad_duration: Duration) -> SchedulerResult<Self> {
        let timings = Self {
            queue_duration,
            ad_duration,
        };
        timings.validate()?;
        Ok(timings)
    }

    /// Reject zero durations, which would spin the rotation
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.queue_duration.is_zero() {
            return Err(SchedulerError::invalid_timing(
                "queue_duration",
                "must be greater than zero",
            ));
        }
        if self.ad_duration.is_zero() {
            return Err(SchedulerError::invalid_timing(
                "ad_duration",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Duration to arm while `view` is on screen
    pub fn duration_for(&self, view: &DisplayView) -> Duration {
        match view {
            DisplayView::Queue => self.queue_duration,
            DisplayView::Ad(_) => self.ad_duration,
        }
    }
}

// ============================================================================
// Slot Sources
// ============================================================================

/// A set of ad slots the scheduler can rotate through
pub trait SlotSource {
    /// Number of slots in rotation
    fn len(&self) -> usize;

    /// Whether slot `index` (0-based) may be shown right now
    fn is_available(&self, index: usize) -> bool;

    /// Build the slot value for `index`
    fn slot(&self, index: usize) -> Option<AdSlot>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixed numbered slots backed by static asset paths, gated by probing
#[derive(Debug, Clone, Default)]
pub struct StaticSlotMode {
    urls: Vec<String>,
    availability: AdAvailability,
}

impl StaticSlotMode {
    /// Create from asset URLs; slot `n` is `urls[n - 1]`
    ///
    /// Every slot starts unavailable until a probe result arrives.
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            availability: AdAvailability::new(),
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn availability(&self) -> &AdAvailability {
        &self.availability
    }

    /// Replace availability with a fresh probe result
    pub fn set_availability(&mut self, availability: AdAvailability) {
        self.availability = availability;
    }
}

impl SlotSource for StaticSlotMode {
    fn len(&self) -> usize {
        self.urls.len()
    }

    fn is_available(&self, index: usize) -> bool {
        index < self.urls.len() && self.availability.is_available(index + 1)
    }

    fn slot(&self, index: usize) -> Option<AdSlot> {
        self.urls.get(index).map(|url| {
            AdSlot::Static(StaticSlot {
                ordinal: index + 1,
                url: url.clone(),
            })
        })
    }
}

/// Server-provided ads; every listed entry is eligible
#[derive(Debug, Clone, Default)]
pub struct ManifestMode {
    manifest: Arc<AdManifest>,
}

impl ManifestMode {
    pub fn new(manifest: AdManifest) -> Self {
        Self {
            manifest: Arc::new(manifest),
        }
    }

    /// The manifest currently in rotation
    pub fn manifest(&self) -> Arc<AdManifest> {
        Arc::clone(&self.manifest)
    }

    /// Swap in a new manifest as a whole; returns the previous one
    pub fn replace(&mut self, manifest: AdManifest) -> Arc<AdManifest> {
        std::mem::replace(&mut self.manifest, Arc::new(manifest))
    }
}

impl SlotSource for ManifestMode {
    fn len(&self) -> usize {
        self.manifest.len()
    }

    fn is_available(&self, index: usize) -> bool {
        index < self.manifest.len()
    }

    fn slot(&self, index: usize) -> Option<AdSlot> {
        self.manifest.get(index).map(|entry| AdSlot::Manifest {
            index,
            entry: entry.clone(),
        })
    }
}

// ============================================================================
// Rotation State
// ============================================================================

/// Outcome of a single rotation tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// `Queue -> Ad(index)`; `skipped` unavailable slots were passed over
    ShowAd { index: usize, skipped: usize },
    /// `Ad -> Queue`; the cursor now points at `cursor`
    ReturnToQueue { cursor: usize },
    /// No slot could be shown, the cursor did not move
    StayOnQueue,
    /// Rotation is paused, nothing changed
    Paused,
}

/// Scheduler-owned rotation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationState {
    current_view: DisplayView,
    in_rotation: bool,
    cursor: usize,
}

impl Default for RotationState {
    fn default() -> Self {
        Self::new()
    }
}

impl RotationState {
    /// Start on the queue view, rotating, with the cursor on the first slot
    pub fn new() -> Self {
        Self::with_cursor(0)
    }

    pub fn with_cursor(cursor: usize) -> Self {
        Self {
            current_view: DisplayView::Queue,
            in_rotation: true,
            cursor,
        }
    }

    pub fn current_view(&self) -> &DisplayView {
        &self.current_view
    }

    pub fn in_rotation(&self) -> bool {
        self.in_rotation
    }

    /// 0-based index of the slot due next
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Delay to arm for the view now on screen
    pub fn next_delay(&self, timings: &RotationTimings) -> Duration {
        timings.duration_for(&self.current_view)
    }

    /// Advance the state machine by one timer fire
    pub fn tick(&mut self, slots: &dyn SlotSource) -> Transition {
        if !self.in_rotation {
            return Transition::Paused;
        }

        match &self.current_view {
            DisplayView::Queue => match select_slot(self.cursor, slots) {
                Some((index, skipped)) => match slots.slot(index) {
                    Some(slot) => {
                        self.current_view = DisplayView::Ad(slot);
                        Transition::ShowAd { index, skipped }
                    }
                    None => Transition::StayOnQueue,
                },
                None => Transition::StayOnQueue,
            },
            DisplayView::Ad(slot) => {
                let len = slots.len();
                self.cursor = if len == 0 { 0 } else { (slot.index() + 1) % len };
                self.current_view = DisplayView::Queue;
                Transition::ReturnToQueue {
                    cursor: self.cursor,
                }
            }
        }
    }

    /// Manual navigation to the queue; the cursor is preserved
    pub fn show_queue(&mut self) {
        self.current_view = DisplayView::Queue;
    }

    /// Freeze automatic rotation without touching the cursor
    pub fn pause(&mut self) {
        self.in_rotation = false;
    }

    /// Re-enable automatic rotation
    pub fn resume(&mut self) {
        self.in_rotation = true;
    }

    /// Re-fit the state after the slot set was replaced
    ///
    /// An ad that is still present (matched by manifest id, or by ordinal
    /// for static slots) stays on screen with its refreshed value; anything
    /// else falls back to the queue. Returns `true` if the view changed.
    pub fn reconcile(&mut self, slots: &dyn SlotSource) -> bool {
        let len = slots.len();
        self.cursor = if len == 0 { 0 } else { self.cursor % len };

        let DisplayView::Ad(current) = &self.current_view else {
            return false;
        };

        let replacement = match current {
            AdSlot::Static(slot) => slots.slot(slot.ordinal.saturating_sub(1)),
            AdSlot::Manifest { entry, .. } => (0..len)
                .filter_map(|index| slots.slot(index))
                .find(|candidate| candidate.entry_id() == Some(entry.id.as_str())),
        };

        match replacement {
            Some(slot) if *current == slot => false,
            Some(slot) => {
                self.current_view = DisplayView::Ad(slot);
                true
            }
            None => {
                self.current_view = DisplayView::Queue;
                true
            }
        }
    }
}

/// Pick the slot to show from `cursor`, skipping unavailable ones
///
/// Order: preferred, next, previous, then the rest of the cycle going
/// forward. Returns the chosen index and how many candidates were skipped,
/// or `None` when no slot is available.
pub fn select_slot(cursor: usize, slots: &dyn SlotSource) -> Option<(usize, usize)> {
    let len = slots.len();
    if len == 0 {
        return None;
    }

    let preferred = cursor % len;
    let mut order = Vec::with_capacity(len);
    order.push(preferred);
    order.push((preferred + 1) % len);
    order.push((preferred + len - 1) % len);
    order.extend((2..len).map(|offset| (preferred + offset) % len));

    let mut seen = vec![false; len];
    let mut skipped = 0;
    for index in order {
        if std::mem::replace(&mut seen[index], true) {
            continue;
        }
        if slots.is_available(index) {
            return Some((index, skipped));
        }
        skipped += 1;
    }

    None
}

// ============================================================================
// Tests
// ============================================================================
