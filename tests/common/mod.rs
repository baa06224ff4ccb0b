//! Common test utilities: fake collaborators and a view recorder

#![allow(dead_code)]

use async_trait::async_trait;
use filakiosk::fullscreen::{FullscreenError, FullscreenPlatform, HeadlessDisplay};
use filakiosk::manifest::{ManifestSource, PushSource, UpdateSink};
use filakiosk::models::{AdEntry, AdManifest, MediaType};
use filakiosk::probe::AssetProbe;
use filakiosk::session::{KioskDeps, KioskSnapshot};
use filakiosk::utils::error::{FetchError, PushError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

/// Static slot URLs `/ads/ad1.png` .. `/ads/adN.png`
pub fn static_urls(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("/ads/ad{n}.png")).collect()
}

pub fn entry(id: &str, position: u32, version: u32) -> AdEntry {
    AdEntry {
        id: id.to_string(),
        position,
        media_type: MediaType::Image,
        url: format!("/uploads/{id}.png"),
        version,
    }
}

// ============================================================================
// Probe
// ============================================================================

/// Probe answering from a fixed set of reachable URLs
pub struct FakeProbe {
    reachable: HashSet<String>,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    /// Every URL except the 1-based `unavailable` ordinals is reachable
    pub fn with_unavailable(urls: &[String], unavailable: &[usize]) -> Self {
        let reachable = urls
            .iter()
            .enumerate()
            .filter(|(index, _)| !unavailable.contains(&(index + 1)))
            .map(|(_, url)| url.clone())
            .collect();
        Self {
            reachable,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetProbe for FakeProbe {
    async fn is_available(&self, url: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reachable.contains(url)
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Manifest source serving whatever the test last stored
pub struct FakeManifest {
    current: Mutex<Result<AdManifest, u16>>,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl FakeManifest {
    pub fn serving(manifest: AdManifest) -> Self {
        Self {
            current: Mutex::new(Ok(manifest)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every fetch fails with `status`
    pub fn failing(status: u16) -> Self {
        Self {
            current: Mutex::new(Err(status)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set(&self, manifest: AdManifest) {
        *self.current.lock().unwrap() = Ok(manifest);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManifestSource for FakeManifest {
    async fn fetch_manifest(&self) -> Result<AdManifest, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.current
            .lock()
            .unwrap()
            .clone()
            .map_err(FetchError::ServerError)
    }
}

// ============================================================================
// Push
// ============================================================================

/// Push source that forwards one update per `trigger()`
#[derive(Default)]
pub struct FakePush {
    updates: Notify,
    pub connects: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
}

struct CloseGuard(Arc<AtomicUsize>);

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl FakePush {
    pub fn trigger(&self) {
        self.updates.notify_one();
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushSource for FakePush {
    async fn listen(&self, sink: &dyn UpdateSink) -> Result<(), PushError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let _guard = CloseGuard(Arc::clone(&self.closed));
        loop {
            self.updates.notified().await;
            sink.ads_updated().await;
        }
    }
}

// ============================================================================
// Slow display
// ============================================================================

/// Display that grants full screen only after `delay`
pub struct SlowDisplay {
    state: watch::Sender<bool>,
    delay: Duration,
    requests: AtomicUsize,
}

impl SlowDisplay {
    pub fn new(delay: Duration) -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state,
            delay,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn is_fullscreen(&self) -> bool {
        *self.state.borrow()
    }
}

#[async_trait]
impl FullscreenPlatform for SlowDisplay {
    async fn request_fullscreen(&self) -> Result<(), FullscreenError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
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

// ============================================================================
// Deps bundle
// ============================================================================

pub struct Fakes {
    pub probe: Arc<FakeProbe>,
    pub manifest: Arc<FakeManifest>,
    pub push: Arc<FakePush>,
    pub display: Arc<HeadlessDisplay>,
}

impl Fakes {
    pub fn new(probe: FakeProbe, manifest: FakeManifest) -> Self {
        Self {
            probe: Arc::new(probe),
            manifest: Arc::new(manifest),
            push: Arc::new(FakePush::default()),
            display: Arc::new(HeadlessDisplay::new()),
        }
    }

    pub fn deps(&self) -> KioskDeps {
        KioskDeps {
            probe: self.probe.clone(),
            manifest: self.manifest.clone(),
            push: Some(self.push.clone() as Arc<dyn PushSource>),
            fullscreen: self.display.clone(),
        }
    }
}

// ============================================================================
// Recorder
// ============================================================================

/// One observed view change
#[derive(Debug, Clone, PartialEq)]
pub struct Seen {
    pub at_secs: u64,
    pub label: String,
}

/// Records every view change of a session, plus the worst timer count seen
pub struct Recorder {
    seen: Arc<Mutex<Vec<Seen>>>,
    max_timers: Arc<AtomicUsize>,
}

fn label(snapshot: &KioskSnapshot) -> String {
    if snapshot.kiosk_active {
        snapshot.view.to_string()
    } else {
        String::from("Off")
    }
}

impl Recorder {
    pub fn start(mut rx: watch::Receiver<KioskSnapshot>) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let max_timers = Arc::new(AtomicUsize::new(0));
        let started = Instant::now();

        let task_seen = Arc::clone(&seen);
        let task_max = Arc::clone(&max_timers);
        let mut last = label(&rx.borrow_and_update());
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                let timers = snapshot.pending_rotation_timers + snapshot.pending_idle_timers;
                task_max.fetch_max(timers, Ordering::SeqCst);

                let current = label(&snapshot);
                if current != last {
                    task_seen.lock().unwrap().push(Seen {
                        at_secs: started.elapsed().as_secs(),
                        label: current.clone(),
                    });
                    last = current;
                }
            }
        });

        Self { seen, max_timers }
    }

    pub fn labels(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|s| s.label.clone()).collect()
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn max_timers(&self) -> usize {
        self.max_timers.load(Ordering::SeqCst)
    }
}

/// Sleep until `secs` after `start`
pub async fn at(start: Instant, secs: u64) {
    tokio::time::sleep_until(start + Duration::from_secs(secs)).await;
}
