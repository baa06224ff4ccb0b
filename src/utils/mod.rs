//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use url::Url;

/// Query parameter that puts a page into kiosk mode on load
pub const KIOSK_QUERY_FLAG: &str = "kiosk";

/// Check whether a page URL requests kiosk mode (`?kiosk=true`)
///
/// Unparseable URLs never request kiosk mode.
pub fn kiosk_flag_from_url(page_url: &str) -> bool {
    let Ok(parsed) = Url::parse(page_url) else {
        return false;
    };

    parsed
        .query_pairs()
        .any(|(key, value)| key == KIOSK_QUERY_FLAG && value.eq_ignore_ascii_case("true"))
}

/// Append `v=<version>` to an asset URL
///
/// Works for absolute and root-relative URLs; an existing `v` parameter is
/// replaced.
pub fn versioned_url(asset_url: &str, version: u32) -> String {
    if let Ok(mut parsed) = Url::parse(asset_url) {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| key != "v")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        parsed
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("v", &version.to_string());
        return parsed.to_string();
    }

    let separator = if asset_url.contains('?') { '&' } else { '?' };
    format!("{asset_url}{separator}v={version}")
}

/// Join an API base URL and a path without doubling slashes
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
