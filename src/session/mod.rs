//! Kiosk session actor
//!
//! All kiosk state lives in one task that consumes [`KioskEvent`]s one at a
//! time: operator commands arrive through a [`KioskHandle`], timer fires and
//! async results (probe, manifest fetch, push notifications) arrive on an
//! internal channel. Because nothing else touches the state, every
//! transition sees a consistent view and timers can be cancelled before the
//! next one is armed.
//!
//! ```text
//!  KioskHandle ──commands──▶ ┌──────────────┐ ──watch──▶ KioskSnapshot
//!                            │ KioskSession │
//!  timers / probe / fetch ─▶ └──────────────┘
//!        (internal events, tagged with session id)
//! ```
//!
//! A session starts on [`KioskHandle::enter_kiosk_mode`] and ends on exit,
//! `Escape`, or shutdown. Ending it cancels both timers and the session's
//! [`CancellationToken`]; results from its background work that still show
//! up afterwards carry a stale session id and are dropped.

pub mod events;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::fullscreen::{FullscreenCoordinator, FullscreenPlatform};
use crate::manifest::{fetch_with_fallback, run_push_loop, ManifestSource, PushSource, UpdateSink};
use crate::metrics;
use crate::models::{AdManifest, AdMode, DisplayView};
use crate::probe::{probe_all, AssetProbe};
use crate::scheduler::{
    IdleReturnGuard, ManifestMode, RotationState, RotationTimings, SchedulerError, SchedulerResult,
    SlotSource,
    StaticSlotMode, TimerSlot, Transition, DEFAULT_IDLE_TIMEOUT,
};
use crate::utils::retry::RetryConfig;

pub use events::{KioskEvent, Key, TimerKind};

const COMMAND_BUFFER: usize = 32;
const INTERNAL_BUFFER: usize = 64;

// ============================================================================
// Configuration and dependencies
// ============================================================================

/// Session behavior settings
#[derive(Debug, Clone)]
pub struct KioskConfig {
    pub timings: RotationTimings,
    pub idle_timeout: Duration,
    pub mode: AdMode,

    /// Asset URLs for static mode; slot `n` is `static_slots[n - 1]`
    pub static_slots: Vec<String>,

    /// Retry schedule for manifest fetches
    pub retry: RetryConfig,

    /// Wait between push reconnect attempts
    pub reconnect_delay: Duration,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            timings: RotationTimings::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            mode: AdMode::Static,
            static_slots: Vec::new(),
            retry: RetryConfig::default(),
            reconnect_delay: crate::manifest::push::DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// External collaborators of a session
#[derive(Clone)]
pub struct KioskDeps {
    pub probe: Arc<dyn AssetProbe>,
    pub manifest: Arc<dyn ManifestSource>,

    /// Push channel; manifest mode only refreshes on push when present
    pub push: Option<Arc<dyn PushSource>>,

    pub fullscreen: Arc<dyn FullscreenPlatform>,
}

// ============================================================================
// Snapshot
// ============================================================================

/// Render-side view of the session, published after every change
#[derive(Debug, Clone, PartialEq)]
pub struct KioskSnapshot {
    pub kiosk_active: bool,
    pub view: DisplayView,
    pub in_rotation: bool,
    pub cursor: usize,
    pub fullscreen: bool,
    pub pending_rotation_timers: usize,
    pub pending_idle_timers: usize,
    pub manifest_len: usize,
    pub changed_at: DateTime<Utc>,
}

impl Default for KioskSnapshot {
    fn default() -> Self {
        Self {
            kiosk_active: false,
            view: DisplayView::Queue,
            in_rotation: false,
            cursor: 0,
            fullscreen: false,
            pending_rotation_timers: 0,
            pending_idle_timers: 0,
            manifest_len: 0,
            changed_at: Utc::now(),
        }
    }
}

impl KioskSnapshot {
    /// Equality ignoring `changed_at`
    fn same_state(&self, other: &Self) -> bool {
        self.kiosk_active == other.kiosk_active
            && self.view == other.view
            && self.in_rotation == other.in_rotation
            && self.cursor == other.cursor
            && self.fullscreen == other.fullscreen
            && self.pending_rotation_timers == other.pending_rotation_timers
            && self.pending_idle_timers == other.pending_idle_timers
            && self.manifest_len == other.manifest_len
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable front end of a running [`KioskSession`]
///
/// Every method fails only with `SchedulerError::SessionClosed`, once the
/// actor has stopped.
#[derive(Clone)]
pub struct KioskHandle {
    commands: mpsc::Sender<KioskEvent>,
    snapshot: watch::Receiver<KioskSnapshot>,
}

impl KioskHandle {
    async fn send(&self, event: KioskEvent) -> SchedulerResult<()> {
        self.commands.send(event).await?;
        Ok(())
    }

    pub async fn enter_kiosk_mode(&self) -> SchedulerResult<()> {
        self.send(KioskEvent::Enter).await
    }

    pub async fn exit_kiosk_mode(&self) -> SchedulerResult<()> {
        self.send(KioskEvent::Exit).await
    }

    /// Manual navigation to the queue; pauses rotation
    pub async fn show_queue_view(&self) -> SchedulerResult<()> {
        self.send(KioskEvent::ShowQueue).await
    }

    /// Pointer or click gesture anywhere on the kiosk
    pub async fn user_interaction(&self) -> SchedulerResult<()> {
        self.send(KioskEvent::UserInteraction).await
    }

    pub async fn key_pressed(&self, key: Key) -> SchedulerResult<()> {
        self.send(KioskEvent::KeyPressed(key)).await
    }

    /// Same as receiving `ads.updated` on the push channel
    pub async fn ads_updated(&self) -> SchedulerResult<()> {
        self.send(KioskEvent::AdsUpdated { session: None }).await
    }

    /// Tear down any session and stop the actor; waits until it has stopped
    pub async fn shutdown(&self) -> SchedulerResult<()> {
        self.send(KioskEvent::Shutdown).await?;
        let mut snapshot = self.snapshot.clone();
        while snapshot.changed().await.is_ok() {}
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<KioskSnapshot> {
        self.snapshot.clone()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> KioskSnapshot {
        self.snapshot.borrow().clone()
    }
}

// ============================================================================
// Session state
// ============================================================================

enum SlotSet {
    Static(StaticSlotMode),
    Manifest(ManifestMode),
}

impl SlotSet {
    fn for_mode(mode: AdMode, static_slots: &[String]) -> Self {
        match mode {
            AdMode::Static => SlotSet::Static(StaticSlotMode::new(static_slots.to_vec())),
            AdMode::Manifest => SlotSet::Manifest(ManifestMode::default()),
        }
    }

    fn source(&self) -> &dyn SlotSource {
        match self {
            SlotSet::Static(slots) => slots,
            SlotSet::Manifest(slots) => slots,
        }
    }

    fn manifest_len(&self) -> usize {
        match self {
            SlotSet::Static(_) => 0,
            SlotSet::Manifest(slots) => slots.len(),
        }
    }
}

struct RunningSession {
    id: u64,
    cancel: CancellationToken,
    rotation: RotationState,
    slots: SlotSet,
    rotation_timer: TimerSlot<KioskEvent>,
    idle: IdleReturnGuard<KioskEvent>,
    probe_gen: u64,
    fetch_gen: u64,
    push_task: Option<JoinHandle<()>>,
}

enum SessionState {
    Idle,
    Running(Box<RunningSession>),
}

fn rotation_fired(generation: u64) -> KioskEvent {
    KioskEvent::TimerFired {
        kind: TimerKind::Rotation,
        generation,
    }
}

fn idle_fired(generation: u64) -> KioskEvent {
    KioskEvent::TimerFired {
        kind: TimerKind::Idle,
        generation,
    }
}

/// Forwards push notifications into the owning session
struct SessionUpdateSink {
    events: mpsc::Sender<KioskEvent>,
    session: u64,
}

#[async_trait]
impl UpdateSink for SessionUpdateSink {
    async fn ads_updated(&self) {
        let event = KioskEvent::AdsUpdated {
            session: Some(self.session),
        };
        if self.events.send(event).await.is_err() {
            trace!(session = self.session, "push update after session actor stopped");
        }
    }
}

impl RunningSession {
    /// Arm the rotation timer for the view now on screen
    fn arm_rotation(&mut self, timings: &RotationTimings) {
        let delay = self.rotation.next_delay(timings);
        self.rotation_timer.arm(delay, rotation_fired);
    }

    /// Probe static slots in the background
    fn start_probe(&mut self, deps: &KioskDeps, events: &mpsc::Sender<KioskEvent>) {
        let SlotSet::Static(slots) = &self.slots else {
            return;
        };
        self.probe_gen += 1;

        let probe = Arc::clone(&deps.probe);
        let urls = slots.urls().to_vec();
        let events = events.clone();
        let cancel = self.cancel.clone();
        let session = self.id;
        let probe_gen = self.probe_gen;

        tokio::spawn(async move {
            let availability = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                availability = probe_all(probe.as_ref(), &urls) => availability,
            };
            let _ = events
                .send(KioskEvent::ProbeCompleted {
                    session,
                    probe_gen,
                    availability,
                })
                .await;
        });
    }

    /// Fetch the manifest in the background
    fn start_fetch(&mut self, deps: &KioskDeps, retry: &RetryConfig, events: &mpsc::Sender<KioskEvent>) {
        if !matches!(self.slots, SlotSet::Manifest(_)) {
            return;
        }
        self.fetch_gen += 1;

        let source = Arc::clone(&deps.manifest);
        let retry = retry.clone();
        let events = events.clone();
        let cancel = self.cancel.clone();
        let session = self.id;
        let fetch_gen = self.fetch_gen;

        tokio::spawn(async move {
            let Some(manifest) = fetch_with_fallback(source.as_ref(), &retry, &cancel).await else {
                return;
            };
            let _ = events
                .send(KioskEvent::ManifestLoaded {
                    session,
                    fetch_gen,
                    manifest,
                })
                .await;
        });
    }

    fn start_push(
        &mut self,
        source: Arc<dyn PushSource>,
        reconnect_delay: Duration,
        events: &mpsc::Sender<KioskEvent>,
    ) {
        let sink = Arc::new(SessionUpdateSink {
            events: events.clone(),
            session: self.id,
        });
        self.push_task = Some(tokio::spawn(run_push_loop(
            source,
            sink,
            reconnect_delay,
            self.cancel.clone(),
        )));
    }

    /// Stop all timers and background work of this session
    fn teardown(&mut self) {
        self.cancel.cancel();
        self.rotation_timer.cancel();
        self.idle.cancel();
        if let Some(task) = self.push_task.take() {
            task.abort();
        }
    }

    /// At most one timer may be pending, and a rotating session must have
    /// its rotation timer armed
    fn timers_consistent(&self) -> bool {
        let rotation = self.rotation_timer.pending();
        let idle = self.idle.pending();
        rotation + idle <= 1 && (!self.rotation.in_rotation() || rotation == 1)
    }
}

impl Drop for RunningSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ============================================================================
// Actor
// ============================================================================

/// The kiosk session actor
pub struct KioskSession {
    config: KioskConfig,
    deps: KioskDeps,
    fullscreen: FullscreenCoordinator,
    internal_tx: mpsc::Sender<KioskEvent>,
    internal_rx: mpsc::Receiver<KioskEvent>,
    commands: mpsc::Receiver<KioskEvent>,
    snapshot: watch::Sender<KioskSnapshot>,
    state: SessionState,
    next_session_id: u64,
}

impl KioskSession {
    /// Start the actor on the current runtime
    pub fn spawn(config: KioskConfig, deps: KioskDeps) -> KioskHandle {
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (internal_tx, internal_rx) = mpsc::channel(INTERNAL_BUFFER);
        let (snapshot, snapshot_rx) = watch::channel(KioskSnapshot::default());
        let fullscreen = FullscreenCoordinator::new(Arc::clone(&deps.fullscreen));

        let session = Self {
            config,
            deps,
            fullscreen,
            internal_tx,
            internal_rx,
            commands,
            snapshot,
            state: SessionState::Idle,
            next_session_id: 0,
        };
        tokio::spawn(session.run());

        KioskHandle {
            commands: command_tx,
            snapshot: snapshot_rx,
        }
    }

    async fn run(mut self) {
        info!(mode = %self.config.mode, "Kiosk session actor started");
        let mut fullscreen_rx = self.fullscreen.watch();
        let mut fullscreen_open = true;

        loop {
            let event = tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(event) => event,
                    None => break,
                },
                Some(event) = self.internal_rx.recv() => event,
                changed = fullscreen_rx.changed(), if fullscreen_open => {
                    if changed.is_err() {
                        fullscreen_open = false;
                    }
                    self.publish();
                    continue;
                }
            };

            trace!(event = event.name(), "Kiosk event");
            if matches!(event, KioskEvent::Shutdown) {
                break;
            }
            self.handle(event);
            self.publish();
        }

        self.exit();
        self.publish();
        info!("Kiosk session actor stopped");
    }

    fn handle(&mut self, event: KioskEvent) {
        match event {
            KioskEvent::Enter => self.enter(),
            KioskEvent::Exit => self.exit(),
            KioskEvent::ShowQueue => self.show_queue(),
            KioskEvent::UserInteraction => self.user_interaction(),
            KioskEvent::KeyPressed(Key::Escape) => {
                if self.is_active() {
                    info!("Escape pressed, leaving kiosk mode");
                    self.exit();
                }
            }
            KioskEvent::KeyPressed(Key::Other) => {}
            KioskEvent::AdsUpdated { session } => self.ads_updated(session),
            KioskEvent::TimerFired { kind, generation } => match kind {
                TimerKind::Rotation => self.on_rotation_timer(generation),
                TimerKind::Idle => self.on_idle_timer(generation),
            },
            KioskEvent::ProbeCompleted {
                session,
                probe_gen,
                availability,
            } => {
                let Some(run) = self.current(session) else {
                    return;
                };
                if probe_gen != run.probe_gen {
                    debug!(probe_gen, current = run.probe_gen, "Stale probe result dropped");
                    return;
                }
                if let SlotSet::Static(slots) = &mut run.slots {
                    slots.set_availability(availability);
                }
            }
            KioskEvent::ManifestLoaded {
                session,
                fetch_gen,
                manifest,
            } => self.apply_manifest(session, fetch_gen, manifest),
            KioskEvent::Shutdown => {}
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Running(_))
    }

    /// The running session, if `session` is still the current one
    fn current(&mut self, session: u64) -> Option<&mut RunningSession> {
        match &mut self.state {
            SessionState::Running(run) if run.id == session => Some(run),
            _ => {
                debug!(session, "Result for an ended session dropped");
                None
            }
        }
    }

    fn enter(&mut self) {
        if let SessionState::Running(run) = &mut self.state {
            run.rotation_timer.cancel();
            run.idle.cancel();
            run.rotation = RotationState::with_cursor(run.rotation.cursor());
            run.start_probe(&self.deps, &self.internal_tx);
            run.start_fetch(&self.deps, &self.config.retry, &self.internal_tx);
            run.arm_rotation(&self.config.timings);
            info!(session = run.id, cursor = run.rotation.cursor(), "Kiosk mode refreshed");
            return;
        }

        self.next_session_id += 1;
        let events = &self.internal_tx;
        let mut run = Box::new(RunningSession {
            id: self.next_session_id,
            cancel: CancellationToken::new(),
            rotation: RotationState::new(),
            slots: SlotSet::for_mode(self.config.mode, &self.config.static_slots),
            rotation_timer: TimerSlot::new("rotation", events.clone()),
            idle: IdleReturnGuard::new(self.config.idle_timeout, events.clone()),
            probe_gen: 0,
            fetch_gen: 0,
            push_task: None,
        });

        run.start_probe(&self.deps, events);
        run.start_fetch(&self.deps, &self.config.retry, events);
        if self.config.mode == AdMode::Manifest {
            if let Some(push) = &self.deps.push {
                run.start_push(Arc::clone(push), self.config.reconnect_delay, events);
            }
        }
        run.arm_rotation(&self.config.timings);

        metrics::set_kiosk_active(true);
        metrics::record_view_transition(DisplayView::Queue.label());
        info!(session = run.id, mode = %self.config.mode, "Kiosk mode entered");
        self.state = SessionState::Running(run);
    }

    fn exit(&mut self) {
        let SessionState::Running(mut run) = std::mem::replace(&mut self.state, SessionState::Idle)
        else {
            return;
        };
        run.teardown();
        self.fullscreen.withdraw();
        metrics::set_kiosk_active(false);
        info!(session = run.id, "Kiosk mode exited");

        let fullscreen = self.fullscreen.clone();
        tokio::spawn(async move { fullscreen.exit_fullscreen().await });
    }

    fn show_queue(&mut self) {
        let SessionState::Running(run) = &mut self.state else {
            debug!("Queue view requested outside kiosk mode");
            return;
        };
        let was_queue = run.rotation.current_view().is_queue();

        run.rotation_timer.cancel();
        run.rotation.show_queue();
        run.idle.pause(&mut run.rotation, idle_fired);

        if !was_queue {
            metrics::record_view_transition(DisplayView::Queue.label());
        }
        info!(
            session = run.id,
            cursor = run.rotation.cursor(),
            "Queue view shown, rotation paused"
        );
        self.check_timers();
    }

    fn user_interaction(&mut self) {
        let SessionState::Running(run) = &mut self.state else {
            return;
        };

        if !self.fullscreen.is_fullscreen() {
            let fullscreen = self.fullscreen.clone();
            let epoch = fullscreen.epoch();
            let cancel = run.cancel.clone();
            tokio::spawn(async move {
                if cancel.is_cancelled() {
                    return;
                }
                fullscreen.on_interaction_for(true, epoch).await;
            });
        }

        if !run.rotation.in_rotation() {
            run.idle.pause(&mut run.rotation, idle_fired);
        }
    }

    fn ads_updated(&mut self, session: Option<u64>) {
        let SessionState::Running(run) = &mut self.state else {
            return;
        };
        if session.is_some_and(|id| id != run.id) {
            debug!(?session, current = run.id, "Push update for an ended session dropped");
            return;
        }
        if matches!(run.slots, SlotSet::Manifest(_)) {
            info!(session = run.id, "Ads updated, refetching manifest");
            run.start_fetch(&self.deps, &self.config.retry, &self.internal_tx);
        }
    }

    fn on_rotation_timer(&mut self, generation: u64) {
        let SessionState::Running(run) = &mut self.state else {
            return;
        };
        if !run.rotation_timer.take_fired(generation) {
            return;
        }

        match run.rotation.tick(run.slots.source()) {
            Transition::ShowAd { index, skipped } => {
                if skipped > 0 {
                    metrics::record_slots_skipped(skipped);
                }
                metrics::record_view_transition(run.rotation.current_view().label());
                info!(
                    session = run.id,
                    view = %run.rotation.current_view(),
                    index,
                    skipped,
                    "Showing ad"
                );
            }
            Transition::ReturnToQueue { cursor } => {
                metrics::record_view_transition(DisplayView::Queue.label());
                info!(session = run.id, cursor, "Back to queue");
            }
            Transition::StayOnQueue => {
                debug!(session = run.id, cursor = run.rotation.cursor(), "No ad available");
            }
            Transition::Paused => {}
        }

        if run.rotation.in_rotation() {
            run.arm_rotation(&self.config.timings);
        }
        self.check_timers();
    }

    fn on_idle_timer(&mut self, generation: u64) {
        let SessionState::Running(run) = &mut self.state else {
            return;
        };
        if run.idle.on_timer(generation, &mut run.rotation) {
            run.arm_rotation(&self.config.timings);
            info!(
                session = run.id,
                cursor = run.rotation.cursor(),
                "Idle period elapsed, rotation resumed"
            );
        }
        self.check_timers();
    }

    fn apply_manifest(&mut self, session: u64, fetch_gen: u64, manifest: AdManifest) {
        let timings = self.config.timings;
        let Some(run) = self.current(session) else {
            return;
        };
        if fetch_gen != run.fetch_gen {
            debug!(fetch_gen, current = run.fetch_gen, "Stale manifest dropped");
            return;
        }
        let SlotSet::Manifest(slots) = &mut run.slots else {
            return;
        };

        run.rotation_timer.cancel();
        let ads = manifest.len();
        slots.replace(manifest);

        if run.rotation.reconcile(run.slots.source()) {
            metrics::record_view_transition(run.rotation.current_view().label());
        }
        if run.rotation.in_rotation() {
            run.arm_rotation(&timings);
        }
        info!(
            session = run.id,
            ads,
            view = %run.rotation.current_view(),
            "Manifest replaced"
        );
        self.check_timers();
    }

    /// Verify the timer invariant, repairing it if it ever breaks
    fn check_timers(&mut self) {
        let SessionState::Running(run) = &mut self.state else {
            return;
        };
        if run.timers_consistent() {
            return;
        }

        let violation = SchedulerError::invariant(format!(
            "{} rotation and {} idle timers pending",
            run.rotation_timer.pending(),
            run.idle.pending()
        ));
        debug_assert!(false, "{violation}");
        warn!(
            error = %violation,
            session = run.id,
            rotation = run.rotation_timer.pending(),
            idle = run.idle.pending(),
            "Timer invariant violated, re-arming a single timer"
        );
        run.rotation_timer.cancel();
        run.idle.cancel();
        if run.rotation.in_rotation() {
            run.arm_rotation(&self.config.timings);
        } else {
            run.idle.pause(&mut run.rotation, idle_fired);
        }
    }

    fn publish(&self) {
        let next = match &self.state {
            SessionState::Idle => KioskSnapshot {
                kiosk_active: false,
                view: DisplayView::Queue,
                in_rotation: false,
                cursor: 0,
                fullscreen: self.fullscreen.is_fullscreen(),
                pending_rotation_timers: 0,
                pending_idle_timers: 0,
                manifest_len: 0,
                changed_at: Utc::now(),
            },
            SessionState::Running(run) => KioskSnapshot {
                kiosk_active: true,
                view: run.rotation.current_view().clone(),
                in_rotation: run.rotation.in_rotation(),
                cursor: run.rotation.cursor(),
                fullscreen: self.fullscreen.is_fullscreen(),
                pending_rotation_timers: run.rotation_timer.pending(),
                pending_idle_timers: run.idle.pending(),
                manifest_len: run.slots.manifest_len(),
                changed_at: Utc::now(),
            },
        };

        self.snapshot.send_if_modified(|current| {
            if current.same_state(&next) {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fullscreen::HeadlessDisplay;
    use crate::models::AdAvailability;
    use crate::utils::error::{FetchError, PushError};

    struct AllAvailable;

    #[async_trait]
    impl AssetProbe for AllAvailable {
        async fn is_available(&self, _url: &str) -> bool {
            true
        }
    }

    struct NoManifest;

    #[async_trait]
    impl ManifestSource for NoManifest {
        async fn fetch_manifest(&self) -> Result<AdManifest, FetchError> {
            Err(FetchError::ServerError(503))
        }
    }

    struct SilentPush;

    #[async_trait]
    impl PushSource for SilentPush {
        async fn listen(&self, _sink: &dyn UpdateSink) -> Result<(), PushError> {
            std::future::pending().await
        }
    }

    fn deps() -> KioskDeps {
        KioskDeps {
            probe: Arc::new(AllAvailable),
            manifest: Arc::new(NoManifest),
            push: Some(Arc::new(SilentPush)),
            fullscreen: Arc::new(HeadlessDisplay::new()),
        }
    }

    fn static_config() -> KioskConfig {
        KioskConfig {
            static_slots: vec!["/ads/ad1.png".into(), "/ads/ad2.png".into()],
            ..KioskConfig::default()
        }
    }

    #[test]
    fn test_snapshot_equality_ignores_timestamp() {
        let a = KioskSnapshot::default();
        let mut b = a.clone();
        b.changed_at = a.changed_at + chrono::Duration::seconds(5);
        assert!(a.same_state(&b));

        b.cursor = 1;
        assert!(!a.same_state(&b));
    }

    #[test]
    fn test_slot_set_by_mode() {
        let urls = vec!["/ads/ad1.png".to_string()];
        assert_eq!(SlotSet::for_mode(AdMode::Static, &urls).source().len(), 1);
        assert_eq!(SlotSet::for_mode(AdMode::Manifest, &urls).source().len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enter_and_exit() {
        let handle = KioskSession::spawn(static_config(), deps());
        let mut rx = handle.subscribe();

        handle.enter_kiosk_mode().await.unwrap();
        rx.wait_for(|s| s.kiosk_active).await.unwrap();
        let snapshot = handle.snapshot();
        assert!(snapshot.in_rotation);
        assert_eq!(snapshot.pending_rotation_timers, 1);

        handle.exit_kiosk_mode().await.unwrap();
        rx.wait_for(|s| !s.kiosk_active).await.unwrap();
        assert_eq!(handle.snapshot().pending_rotation_timers, 0);

        handle.shutdown().await.unwrap();
        assert!(handle.enter_kiosk_mode().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_result_enables_ads() {
        let handle = KioskSession::spawn(static_config(), deps());
        let mut rx = handle.subscribe();
        handle.enter_kiosk_mode().await.unwrap();

        let snapshot = rx.wait_for(|s| !s.view.is_queue()).await.unwrap().clone();
        assert_eq!(snapshot.view.ordinal(), Some(1));
        handle.shutdown().await.unwrap();
    }

    /// Inject a probe result the way a background probe task would
    async fn send_probe(handle: &KioskHandle, session: u64, probe_gen: u64) {
        handle
            .commands
            .send(KioskEvent::ProbeCompleted {
                session,
                probe_gen,
                availability: AdAvailability::new(),
            })
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_probe_result_is_ignored() {
        let handle = KioskSession::spawn(static_config(), deps());
        let mut rx = handle.subscribe();
        handle.enter_kiosk_mode().await.unwrap();

        // let the real probe (generation 1) land
        tokio::time::sleep(Duration::from_millis(1)).await;

        // "nothing available" from an older generation and from another session
        send_probe(&handle, 1, 0).await;
        send_probe(&handle, 99, 1).await;

        let snapshot = tokio::time::timeout(
            Duration::from_secs(60),
            rx.wait_for(|s| !s.view.is_queue()),
        )
        .await
        .expect("stale probe result disabled the slots")
        .unwrap()
        .clone();
        assert_eq!(snapshot.view.ordinal(), Some(1));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_probe_after_reentry_is_ignored() {
        let handle = KioskSession::spawn(static_config(), deps());
        let mut rx = handle.subscribe();

        handle.enter_kiosk_mode().await.unwrap();
        handle.enter_kiosk_mode().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;

        // generation 1 resolves after generation 2
        send_probe(&handle, 1, 1).await;

        let snapshot = tokio::time::timeout(
            Duration::from_secs(60),
            rx.wait_for(|s| !s.view.is_queue()),
        )
        .await
        .expect("older probe result overrode the newer one")
        .unwrap()
        .clone();
        assert_eq!(snapshot.view.ordinal(), Some(1));

        handle.shutdown().await.unwrap();
    }
}
