//! Defines [`Track`], the normalized record a resolved media reference is
//! carried around as, plus the normalization helpers applied at creation.

use serde::{Deserialize, Serialize};
use url::Url;

/// Display titles are cut to this many characters when a track is built.
pub const MAX_TITLE_LEN: usize = 25;

/// A resolved reference to one piece of media.
///
/// Built exclusively by the resolver, treated as immutable afterwards, and
/// consumed by the downloader (`id`/`video`) and the presentation layer. Not
/// persisted anywhere; it lives for a single request/response cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Provider-assigned identifier; also names the download target file.
    pub id: String,
    /// Display title, truncated to [`MAX_TITLE_LEN`] characters.
    pub title: String,
    /// Uploader/channel name; empty when the listing carries none.
    pub channel_name: String,
    /// Provider-formatted duration, e.g. `"3:45"`.
    pub duration: String,
    /// Seconds parsed from `duration`; always re-derivable from it.
    pub duration_sec: u64,
    /// Cover image URL with query parameters stripped.
    pub thumbnail: String,
    /// Canonical playable URL (playlist-membership parameters stripped).
    pub url: String,
    /// Short-form view count, e.g. `"1.2M views"`; empty when unavailable.
    pub view_count: String,
    /// Selects audio+video acquisition instead of audio-only.
    pub video: bool,
    /// Correlation id of the message that triggered resolution, if any.
    pub message_id: Option<i64>,
    /// Requesting user, when resolution came from a playlist command.
    pub user: Option<String>,
}

/// Truncates a raw title to the display limit, on a character boundary.
pub fn display_title(raw: &str) -> String {
    raw.chars().take(MAX_TITLE_LEN).collect()
}

/// Drops the query string (everything from `?` on) from a URL.
///
/// Thumbnail URLs in particular arrive with signing parameters attached that
/// the presentation layer must not see. Falls back to a plain split when the
/// input does not parse as a URL.
pub fn strip_query(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.to_string()
        }
        Err(_) => raw.split('?').next().unwrap_or_default().to_string(),
    }
}
