//! Prometheus metrics for the kiosk
//!
//! This module provides metrics tracking for:
//! - Rotation: view transitions, skipped slots, kiosk mode state
//! - Ads delivery: manifest fetch failures and duration, push reconnects
//! - Display: refused full-screen requests
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all kiosk metrics
struct KioskMetrics {
    view_transitions: CounterVec,
    slots_skipped: Counter,
    manifest_fetch_failures: Counter,
    manifest_fetch_duration: Histogram,
    push_reconnects: Counter,
    fullscreen_denied: Counter,
    kiosk_active: Gauge,
}

/// Global storage for kiosk metrics
static KIOSK_METRICS: OnceLock<KioskMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, subsequent metric operations become
/// no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = filakiosk::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = KioskMetrics {
        view_transitions: register_counter_vec!(
            "filakiosk_view_transitions_total",
            "Total display transitions by target view",
            &["view"]
        )?,
        slots_skipped: register_counter!(
            "filakiosk_slots_skipped_total",
            "Total unavailable ad slots passed over during selection"
        )?,
        manifest_fetch_failures: register_counter!(
            "filakiosk_manifest_fetch_failures_total",
            "Total manifest fetches that exhausted their retries"
        )?,
        manifest_fetch_duration: register_histogram!(
            "filakiosk_manifest_fetch_duration_seconds",
            "Manifest fetch duration including retries, in seconds",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
        push_reconnects: register_counter!(
            "filakiosk_push_reconnects_total",
            "Total push channel reconnect attempts"
        )?,
        fullscreen_denied: register_counter!(
            "filakiosk_fullscreen_denied_total",
            "Total full-screen requests refused by the platform"
        )?,
        kiosk_active: register_gauge!(
            "filakiosk_kiosk_active",
            "Whether kiosk mode is active (1 = yes, 0 = no)"
        )?,
    };

    KIOSK_METRICS
        .set(metrics)
        .map_err(|_| "Kiosk metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    KIOSK_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn gather_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a display transition to `view` (`queue` or `ad`)
pub fn record_view_transition(view: &str) {
    if let Some(m) = KIOSK_METRICS.get() {
        m.view_transitions.with_label_values(&[view]).inc();
    }
}

/// Record slots passed over because their asset was unavailable
pub fn record_slots_skipped(count: usize) {
    if let Some(m) = KIOSK_METRICS.get() {
        m.slots_skipped.inc_by(count as f64);
    }
}

pub fn record_manifest_fetch_failure() {
    if let Some(m) = KIOSK_METRICS.get() {
        m.manifest_fetch_failures.inc();
    }
}

pub fn record_push_reconnect() {
    if let Some(m) = KIOSK_METRICS.get() {
        m.push_reconnects.inc();
    }
}

pub fn record_fullscreen_denied() {
    if let Some(m) = KIOSK_METRICS.get() {
        m.fullscreen_denied.inc();
    }
}

/// Update the kiosk mode gauge
pub fn set_kiosk_active(active: bool) {
    if let Some(m) = KIOSK_METRICS.get() {
        m.kiosk_active.set(if active { 1.0 } else { 0.0 });
    }
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start timing a manifest fetch (recorded when the guard drops)
pub fn start_manifest_fetch_timer() -> MetricsTimer {
    match KIOSK_METRICS.get() {
        Some(m) => MetricsTimer::new(m.manifest_fetch_duration.start_timer()),
        None => MetricsTimer::noop(),
    }
}

// ============================================================================
// Tests
// ============================================================================
