//! Orchestrates the external download tool and validates what it leaves on
//! disk.
//!
//! The tool is a black box: given a watch URL and a structured configuration
//! it either produces a file under the download directory or fails. The file
//! extension is negotiated by the tool, so completion is verified by scanning
//! for `<id>.<ext>` candidates and taking the first non-empty one.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tokio::task;
use tracing::{error, info};

use crate::Settings;

use super::cookies::CookiePool;
use super::{SourceError, SourceResult, WATCH_BASE};

/// Stream selection mode for an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    /// Best audio-only stream.
    Audio,
    /// Best combined audio+video streams.
    Video,
}

impl FormatMode {
    pub fn from_video_flag(video: bool) -> Self {
        if video { Self::Video } else { Self::Audio }
    }

    /// The tool's format selector expression.
    pub fn selector(self) -> &'static str {
        match self {
            Self::Audio => "bestaudio/best",
            Self::Video => "bestvideo+bestaudio/best",
        }
    }
}

/// Structured configuration for one invocation of the download tool,
/// built once per call.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Canonical watch URL to fetch.
    pub url: String,
    /// Stream selection mode.
    pub format: FormatMode,
    /// Output template; the tool substitutes id and negotiated extension.
    pub output_template: String,
    /// Cookie file to authenticate with; `None` runs unauthenticated.
    pub cookie_file: Option<PathBuf>,
    /// Transient-error retry cap inside the tool.
    pub retries: u32,
    /// Never follow into a playlist, even for playlist-shaped URLs.
    pub no_playlist: bool,
    /// Bypass geographic restriction.
    pub geo_bypass: bool,
    /// Skip certificate verification.
    pub no_check_certificate: bool,
    /// Resume partially downloaded files.
    pub continue_partial: bool,
    /// Container to merge separate audio/video streams into.
    pub merge_format: String,
    /// ffmpeg location, needed for the merge.
    pub ffmpeg_path: PathBuf,
}

impl DownloadOptions {
    pub fn new(
        url: String,
        format: FormatMode,
        output_template: String,
        cookie_file: Option<PathBuf>,
        ffmpeg_path: PathBuf,
    ) -> Self {
        Self {
            url,
            format,
            output_template,
            cookie_file,
            retries: 5,
            no_playlist: true,
            geo_bypass: true,
            no_check_certificate: true,
            continue_partial: true,
            merge_format: "mp4".to_string(),
            ffmpeg_path,
        }
    }

    /// Renders the tool's argument vector.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--no-overwrites".to_string(),
        ];
        if self.no_playlist {
            args.push("--no-playlist".to_string());
        }
        if self.geo_bypass {
            args.push("--geo-bypass".to_string());
        }
        if self.no_check_certificate {
            args.push("--no-check-certificates".to_string());
        }
        if self.continue_partial {
            args.push("--continue".to_string());
        }
        args.push("--retries".to_string());
        args.push(self.retries.to_string());
        args.push("--format".to_string());
        args.push(self.format.selector().to_string());
        args.push("--output".to_string());
        args.push(self.output_template.clone());
        args.push("--merge-output-format".to_string());
        args.push(self.merge_format.clone());
        args.push("--ffmpeg-location".to_string());
        args.push(self.ffmpeg_path.display().to_string());
        if let Some(cookie) = &self.cookie_file {
            args.push("--cookies".to_string());
            args.push(cookie.display().to_string());
        }
        args.push(self.url.clone());
        args
    }
}

/// Acquires media payloads through the external download tool.
pub struct Downloader {
    settings: Settings,
    cookies: Arc<CookiePool>,
}

impl Downloader {
    pub fn new(settings: Settings, cookies: Arc<CookiePool>) -> Self {
        Self { settings, cookies }
    }

    /// Downloads the media for `video_id` and returns the local file path,
    /// or `None` when the payload is unavailable right now.
    ///
    /// A missing cookie degrades the success rate but is not an error. The
    /// blocking tool run happens on a worker thread so concurrent requests
    /// keep flowing. Every failure on this path (tool error, no output file,
    /// only empty output files) is logged and collapses into `None`; retrying
    /// is the caller's decision across fresh calls. There is no per-id
    /// locking: two concurrent calls for the same id share the output
    /// template and race, last-writer-wins.
    pub async fn download(&self, video_id: &str, video: bool) -> Option<PathBuf> {
        let url = format!("{}{}", WATCH_BASE, video_id);
        let cookie = self.cookies.select();
        info!(
            "Downloading {} ({}, cookie: {})",
            video_id,
            if video { "audio+video" } else { "audio" },
            cookie.is_some()
        );

        let options = DownloadOptions::new(
            url,
            FormatMode::from_video_flag(video),
            format!("{}/%(id)s.%(ext)s", self.settings.download_dir.display()),
            cookie,
            self.settings.ffmpeg_path.clone(),
        );

        let bin = self.settings.ytdlp_path.clone();
        let dir = self.settings.download_dir.clone();
        let id = video_id.to_string();
        let result = task::spawn_blocking(move || -> SourceResult<Option<PathBuf>> {
            fs::create_dir_all(&dir)?;

            let output = Command::new(bin).args(options.to_args()).output()?;
            if !output.status.success() {
                return Err(SourceError::Tool(
                    String::from_utf8_lossy(&output.stderr).trim().to_string(),
                ));
            }

            find_output(&dir, &id)
        })
        .await;

        match result {
            Ok(Ok(Some(path))) => Some(path),
            Ok(Ok(None)) => None,
            Ok(Err(e)) => {
                error!("Download failed for {}: {}", video_id, e);
                None
            }
            Err(e) => {
                error!("Download task failed for {}: {}", video_id, e);
                None
            }
        }
    }
}

/// Scans the download directory for `<id>.<ext>` candidates, in enumeration
/// order, and returns the first with strictly positive size.
///
/// The extension is unknown ahead of time (the tool negotiates the format),
/// hence the prefix scan. Candidates whose metadata cannot be read are
/// skipped.
fn find_output(dir: &Path, id: &str) -> SourceResult<Option<PathBuf>> {
    let prefix = format!("{}.", id);
    let mut candidates = false;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().starts_with(&prefix) {
            continue;
        }
        candidates = true;
        match entry.metadata() {
            Ok(meta) if meta.len() > 0 => return Ok(Some(entry.path())),
            _ => continue,
        }
    }

    if candidates {
        error!("All output files for {} are empty", id);
    } else {
        error!("No output file found for {} after download", id);
    }
    Ok(None)
}
