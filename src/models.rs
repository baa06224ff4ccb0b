// Core data structures for the kiosk display

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::utils::versioned_url;

/// Media type of an advertisement asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the kiosk takes its ads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdMode {
    /// Fixed numbered slots, gated by probing
    #[default]
    Static,
    /// Server manifest, refreshed by push notifications
    Manifest,
}

impl AdMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Manifest => "manifest",
        }
    }
}

impl fmt::Display for AdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "manifest" => Ok(Self::Manifest),
            other => Err(format!("unknown ad mode: {other}")),
        }
    }
}

/// A single server-provided advertisement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdEntry {
    pub id: String,
    pub position: u32,
    pub media_type: MediaType,
    pub url: String,
    pub version: u32,
}

impl AdEntry {
    /// URL with the version appended so cached renders are invalidated
    pub fn render_url(&self) -> String {
        versioned_url(&self.url, self.version)
    }
}

/// Ordered, versioned list of ads fetched from the shop API
///
/// A manifest is never edited in place. Updates build a new value and the
/// session swaps it in whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdManifest {
    #[serde(default)]
    pub ads: Vec<AdEntry>,
}

impl AdManifest {
    /// Build a manifest, ordering entries by display position
    pub fn new(mut ads: Vec<AdEntry>) -> Self {
        ads.sort_by_key(|ad| ad.position);
        Self { ads }
    }

    /// Manifest with no ads (queue-only rotation)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ads.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&AdEntry> {
        self.ads.get(index)
    }

    /// Find an entry's index by its stable id
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.ads.iter().position(|ad| ad.id == id)
    }
}

/// A static (legacy) numbered ad slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticSlot {
    /// 1-based slot number
    pub ordinal: usize,
    pub url: String,
}

/// One ad position in rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AdSlot {
    /// Fixed ordinal slot backed by a static asset path
    Static(StaticSlot),
    /// Entry of the server manifest, with its index in that manifest
    Manifest { index: usize, entry: AdEntry },
}

impl AdSlot {
    /// 0-based index of this slot in its slot set
    pub fn index(&self) -> usize {
        match self {
            Self::Static(slot) => slot.ordinal.saturating_sub(1),
            Self::Manifest { index, .. } => *index,
        }
    }

    /// URL the renderer should load
    pub fn render_url(&self) -> String {
        match self {
            Self::Static(slot) => slot.url.clone(),
            Self::Manifest { entry, .. } => entry.render_url(),
        }
    }

    /// Static slot ordinal, if this is a static slot
    pub fn ordinal(&self) -> Option<usize> {
        match self {
            Self::Static(slot) => Some(slot.ordinal),
            Self::Manifest { .. } => None,
        }
    }

    /// Manifest entry id, if this is a manifest slot
    pub fn entry_id(&self) -> Option<&str> {
        match self {
            Self::Static(_) => None,
            Self::Manifest { entry, .. } => Some(entry.id.as_str()),
        }
    }
}

/// What the kiosk display is currently showing
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum DisplayView {
    #[default]
    Queue,
    Ad(AdSlot),
}

impl DisplayView {
    pub fn is_queue(&self) -> bool {
        matches!(self, Self::Queue)
    }

    pub fn ad(&self) -> Option<&AdSlot> {
        match self {
            Self::Queue => None,
            Self::Ad(slot) => Some(slot),
        }
    }

    /// Static ordinal being shown, if any
    pub fn ordinal(&self) -> Option<usize> {
        self.ad().and_then(AdSlot::ordinal)
    }

    /// Metric/log label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Queue => "queue",
            Self::Ad(_) => "ad",
        }
    }
}

impl fmt::Display for DisplayView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue => f.write_str("Queue"),
            Self::Ad(AdSlot::Static(slot)) => write!(f, "Ad({})", slot.ordinal),
            Self::Ad(AdSlot::Manifest { entry, .. }) => write!(f, "Ad({})", entry.id),
        }
    }
}

/// Reachability of each static slot, keyed by ordinal
///
/// Slots absent from the map have not been probed yet and are treated as
/// unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdAvailability {
    slots: BTreeMap<usize, bool>,
}

impl AdAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Availability where every ordinal in `1..=count` is reachable
    pub fn all_available(count: usize) -> Self {
        (1..=count).map(|ordinal| (ordinal, true)).collect()
    }

    pub fn set(&mut self, ordinal: usize, available: bool) {
        self.slots.insert(ordinal, available);
    }

    pub fn is_available(&self, ordinal: usize) -> bool {
        self.slots.get(&ordinal).copied().unwrap_or(false)
    }

    /// Number of slots known to be reachable
    pub fn available_count(&self) -> usize {
        self.slots.values().filter(|available| **available).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.slots.iter().map(|(ordinal, available)| (*ordinal, *available))
    }
}

impl FromIterator<(usize, bool)> for AdAvailability {
    fn from_iter<I: IntoIterator<Item = (usize, bool)>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, position: u32) -> AdEntry {
        AdEntry {
            id: id.to_string(),
            position,
            media_type: MediaType::Image,
            url: format!("https://cdn.example.com/{id}.png"),
            version: 3,
        }
    }

    #[test]
    fn test_ad_mode_parse() {
        assert_eq!("Manifest".parse::<AdMode>().unwrap(), AdMode::Manifest);
        assert_eq!(" static ".parse::<AdMode>().unwrap(), AdMode::Static);
        assert!("carousel".parse::<AdMode>().is_err());
    }

    #[test]
    fn test_manifest_orders_by_position() {
        let manifest = AdManifest::new(vec![entry("b", 2), entry("a", 1), entry("c", 3)]);
        let ids: Vec<_> = manifest.ads.iter().map(|ad| ad.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(manifest.index_of("c"), Some(2));
        assert_eq!(manifest.index_of("zzz"), None);
    }

    #[test]
    fn test_manifest_deserialize_camel_case() {
        let json = r#"{"ads":[{"id":"42","position":1,"mediaType":"video","url":"/ads/42.mp4","version":7}]}"#;
        let manifest: AdManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.ads[0].media_type, MediaType::Video);
        assert_eq!(manifest.ads[0].version, 7);
    }

    #[test]
    fn test_manifest_missing_ads_is_empty() {
        let manifest: AdManifest = serde_json::from_str("{}").unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_render_url_carries_version() {
        let ad = entry("a", 1);
        assert_eq!(ad.render_url(), "https://cdn.example.com/a.png?v=3");
    }

    #[test]
    fn test_unprobed_slot_is_unavailable() {
        let mut availability = AdAvailability::new();
        availability.set(1, true);
        availability.set(2, false);

        assert!(availability.is_available(1));
        assert!(!availability.is_available(2));
        assert!(!availability.is_available(3));
        assert_eq!(availability.available_count(), 1);
    }

    #[test]
    fn test_display_view_formatting() {
        let view = DisplayView::Ad(AdSlot::Static(StaticSlot {
            ordinal: 2,
            url: "/ads/2.png".to_string(),
        }));
        assert_eq!(view.to_string(), "Ad(2)");
        assert_eq!(view.ordinal(), Some(2));
        assert_eq!(DisplayView::Queue.to_string(), "Queue");
        assert!(DisplayView::default().is_queue());
    }
}
