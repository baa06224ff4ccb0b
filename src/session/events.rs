//! Events consumed by the kiosk session actor

use crate::models::{AdAvailability, AdManifest};

/// Keys the kiosk reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other,
}

/// Which timer produced a [`KioskEvent::TimerFired`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Rotation,
    Idle,
}

impl TimerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Rotation => "rotation",
            TimerKind::Idle => "idle",
        }
    }
}

/// Everything that can change session state
///
/// Async results carry the session id (and request generation) they were
/// started for; the actor drops them once that session is gone.
#[derive(Debug)]
pub enum KioskEvent {
    Enter,
    Exit,
    ShowQueue,
    UserInteraction,
    KeyPressed(Key),

    /// Push notification; `session` is `None` when sent from outside
    AdsUpdated {
        session: Option<u64>,
    },

    TimerFired {
        kind: TimerKind,
        generation: u64,
    },

    ProbeCompleted {
        session: u64,
        probe_gen: u64,
        availability: AdAvailability,
    },

    ManifestLoaded {
        session: u64,
        fetch_gen: u64,
        manifest: AdManifest,
    },

    Shutdown,
}

impl KioskEvent {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            KioskEvent::Enter => "enter",
            KioskEvent::Exit => "exit",
            KioskEvent::ShowQueue => "show_queue",
            KioskEvent::UserInteraction => "user_interaction",
            KioskEvent::KeyPressed(_) => "key_pressed",
            KioskEvent::AdsUpdated { .. } => "ads_updated",
            KioskEvent::TimerFired { .. } => "timer_fired",
            KioskEvent::ProbeCompleted { .. } => "probe_completed",
            KioskEvent::ManifestLoaded { .. } => "manifest_loaded",
            KioskEvent::Shutdown => "shutdown",
        }
    }
}
