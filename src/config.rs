//! Runtime settings for the pipeline: where cookies live, where downloads
//! land, and which external binaries to invoke. Every field can be overridden
//! through the environment; the defaults match a conventional deployment.

use std::env;
use std::path::PathBuf;

/// Filesystem locations and tool paths used by the resolver and downloader.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory scanned for `*.txt` cookie files.
    pub cookie_dir: PathBuf,
    /// Directory the download tool writes finished files into.
    pub download_dir: PathBuf,
    /// Path (or bare name, resolved via `PATH`) of the `yt-dlp` binary.
    pub ytdlp_path: PathBuf,
    /// Location of `ffmpeg`, needed for stream merging.
    pub ffmpeg_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cookie_dir: PathBuf::from("cookies"),
            download_dir: PathBuf::from("downloads"),
            ytdlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_path: PathBuf::from("/usr/bin/ffmpeg"),
        }
    }
}

impl Settings {
    /// Builds settings from the environment, falling back to the defaults
    /// for anything unset. Loads a `.env` file first if one is present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        Self {
            cookie_dir: env_path("COOKIE_DIR", defaults.cookie_dir),
            download_dir: env_path("DOWNLOAD_DIR", defaults.download_dir),
            ytdlp_path: env_path("YTDLP_PATH", defaults.ytdlp_path),
            ffmpeg_path: env_path("FFMPEG_PATH", defaults.ffmpeg_path),
        }
    }
}

fn env_path(key: &str, fallback: PathBuf) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or(fallback)
}
