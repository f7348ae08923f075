//! Resolution and acquisition pipeline for user-supplied media references.
//!
//! Turns free-text queries, video links, and playlist links into normalized
//! [`Track`] records, and fetches the underlying payload to local storage
//! through the `yt-dlp` tool, rotating through a pool of cookie files to
//! survive a rate-limiting, authentication-sensitive upstream.
//!
//! The chat layer consuming this crate is expected to:
//! 1. run incoming message text through [`youtube::matcher`] to find a link,
//! 2. fall back to [`YouTube::search`] / [`YouTube::playlist`] otherwise,
//! 3. later hand the resolved track id to [`YouTube::download`].

use std::sync::LazyLock;

pub mod config;
pub mod track;
pub mod utils;
pub mod youtube;

pub use config::Settings;
pub use track::Track;
pub use youtube::{SourceError, SourceResult, YouTube};

/// Shared HTTP client reused across all outbound requests.
pub static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(reqwest::Client::new);
