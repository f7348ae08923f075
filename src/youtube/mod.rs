//! Provider-specific core: URL classification, cookie pool, search/playlist
//! resolution, and download orchestration against the upstream service.

/// Submodule holding the rotating cookie pool and its refresh path.
pub mod cookies;
/// Submodule orchestrating the external download tool and validating output.
pub mod downloader;
/// Submodule classifying and extracting provider URLs from message text.
pub mod matcher;
/// Submodule resolving search queries and playlist URLs into tracks.
pub mod resolver;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::Settings;
use crate::Track;
use self::cookies::CookiePool;
use self::downloader::Downloader;
use self::matcher::ChatMessage;
use self::resolver::Resolver;

/// Base of the canonical watch URL a video id is appended to.
pub const WATCH_BASE: &str = "https://www.youtube.com/watch?v=";

/// Errors raised by upstream interactions and the external download tool.
///
/// Steady-state request paths (classification, resolution, acquisition) never
/// surface these to callers; they log and return an absent result instead.
/// Only the administrative cookie refresh propagates them.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Error during HTTP request communication.
    #[error("HTTP failure: {0}")]
    Http(#[from] reqwest::Error),

    /// Error reading or writing local files.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing the tool's JSON output.
    #[error("Unable to parse metadata: {0}")]
    Json(#[from] serde_json::Error),

    /// The external download tool exited unsuccessfully.
    #[error("Download tool failure: {0}")]
    Tool(String),

    /// Tool output parsed, but a required field was missing or empty.
    #[error("Incomplete metadata: {0}")]
    Metadata(String),
}

/// Result type for upstream operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Single handle over the whole pipeline, wiring the cookie pool, the
/// resolver, and the downloader over one set of [`Settings`].
pub struct YouTube {
    cookies: Arc<CookiePool>,
    resolver: Resolver,
    downloader: Downloader,
}

impl YouTube {
    pub fn new(settings: Settings) -> Self {
        let cookies = Arc::new(CookiePool::new(settings.cookie_dir.clone()));
        let resolver = Resolver::new(settings.clone());
        let downloader = Downloader::new(settings, Arc::clone(&cookies));
        Self {
            cookies,
            resolver,
            downloader,
        }
    }

    /// True iff `text` matches one of the provider's known URL shapes.
    pub fn valid(&self, text: &str) -> bool {
        matcher::valid(text)
    }

    /// Pulls a canonical media URL out of a message (and its reply, if any).
    pub fn extract(&self, message: &ChatMessage, reply: Option<&ChatMessage>) -> Option<String> {
        matcher::extract(message, reply)
    }

    /// Resolves a free-text query into at most one track.
    pub async fn search(&self, query: &str, message_id: i64, video: bool) -> Option<Track> {
        self.resolver.search(query, message_id, video).await
    }

    /// Resolves a playlist URL into up to `limit` tracks, in upstream order.
    pub async fn playlist(&self, limit: usize, user: &str, url: &str, video: bool) -> Vec<Track> {
        self.resolver.playlist(limit, user, url, video).await
    }

    /// Downloads the media for `video_id`, returning the local file path.
    pub async fn download(&self, video_id: &str, video: bool) -> Option<PathBuf> {
        self.downloader.download(video_id, video).await
    }

    /// Fetches fresh cookie files from the given remote URLs.
    ///
    /// Operator action; unlike the request paths, failures propagate.
    pub async fn refresh_cookies(&self, urls: &[String]) -> SourceResult<()> {
        self.cookies.refresh(urls).await
    }
}
