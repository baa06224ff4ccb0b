//! Kiosk rotation scheduling
//!
//! This module holds the pieces that decide what the kiosk display shows
//! and when it changes.
//!
//! # Overview
//!
//! The display alternates between the live queue and advertisement slots:
//!
//! ```text
//!            queue_duration               ad_duration
//!   ┌───────┐ ───────────────▶ ┌───────┐ ─────────────▶ ┌───────┐
//!   │ Queue │                  │ Ad(k) │                │ Queue │ ...
//!   └───────┘ ◀── showQueue ── └───────┘   cursor = k+1 └───────┘
//!       │
//!       └── paused: idle guard resumes rotation after idle_timeout
//! ```
//!
//! # Modules
//!
//! - [`rotation`] - Pure state machine, slot sources and slot selection
//! - [`timer`] - Single cancellable timer with stale-fire detection
//! - [`idle`] - Idle countdown that resumes rotation after manual navigation
//! - [`error`] - Scheduler errors
//!
//! # Quick Start
//!
//! ```
//! use filakiosk::scheduler::{RotationState, StaticSlotMode, Transition};
//! use filakiosk::models::AdAvailability;
//!
//! let mut slots = StaticSlotMode::new(vec![
//!     "/ads/ad1.png".to_string(),
//!     "/ads/ad2.png".to_string(),
//! ]);
//! slots.set_availability(AdAvailability::all_available(2));
//!
//! let mut state = RotationState::new();
//! assert_eq!(state.tick(&slots), Transition::ShowAd { index: 0, skipped: 0 });
//! assert_eq!(state.tick(&slots), Transition::ReturnToQueue { cursor: 1 });
//! ```

pub mod error;
pub mod idle;
pub mod rotation;
pub mod timer;

// Re-export main types
pub use error::{SchedulerError, SchedulerResult};
pub use idle::{IdleReturnGuard, DEFAULT_IDLE_TIMEOUT};
pub use rotation::{
    select_slot, ManifestMode, RotationState, RotationTimings, SlotSource, StaticSlotMode,
    Transition,
};
pub use timer::TimerSlot;
