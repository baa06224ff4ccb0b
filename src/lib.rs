//! filakiosk - kiosk display driver for a barbershop virtual queue
//!
//! The kiosk alternates between the live queue and advertisements. Ads come
//! either from fixed numbered slots, checked for reachability before they are
//! shown, or from a server manifest kept fresh by push notifications.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`scheduler`] - Rotation state machine, timers and idle guard
//! - [`session`] - Kiosk session actor tying everything together
//! - [`probe`] - Asset availability probing
//! - [`manifest`] - Ads manifest client and push channel
//! - [`fullscreen`] - Full-screen request coordination
//! - [`metrics`] - Prometheus metrics
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use filakiosk::config::Config;
//! use filakiosk::fullscreen::HeadlessDisplay;
//! use filakiosk::manifest::HttpManifestClient;
//! use filakiosk::probe::HttpAssetProbe;
//! use filakiosk::session::{KioskDeps, KioskSession};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let timeout = config.request_timeout();
//!     let deps = KioskDeps {
//!         probe: Arc::new(HttpAssetProbe::with_base_url(config.asset_base_url(), timeout)?),
//!         manifest: Arc::new(HttpManifestClient::new(
//!             &config.api.base_url,
//!             &config.api.shop_slug,
//!             timeout,
//!         )?),
//!         push: None,
//!         fullscreen: Arc::new(HeadlessDisplay::new()),
//!     };
//!
//!     let kiosk = KioskSession::spawn(config.session_config(), deps);
//!     kiosk.enter_kiosk_mode().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fullscreen;
pub mod manifest;
pub mod metrics;
pub mod models;
pub mod probe;
pub mod scheduler;
pub mod session;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, KioskErrorTrait, Result};
    pub use crate::models::{AdEntry, AdManifest, AdMode, AdSlot, DisplayView, MediaType};
    pub use crate::scheduler::{RotationState, RotationTimings, SlotSource, Transition};
    pub use crate::session::{Key, KioskConfig, KioskDeps, KioskHandle, KioskSession, KioskSnapshot};
}

// Direct re-exports for convenience
pub use models::{AdManifest, AdMode, DisplayView};
pub use session::{KioskHandle, KioskSession};
