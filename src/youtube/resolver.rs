//! Resolves free-text queries and playlist URLs into [`Track`] records.
//!
//! The upstream is queried through the `yt-dlp` JSON interface: a single
//! `ytsearch1:` probe for text queries, a flat playlist listing for playlist
//! URLs. The subprocess runs on a blocking worker so resolution never stalls
//! sibling requests; parsing is split into plain functions over the tool's
//! output.

use std::process::Command;

use serde_json::Value;
use tokio::task;
use tracing::{error, info};

use crate::track::{self, Track};
use crate::utils;
use crate::Settings;

use super::{SourceError, SourceResult, WATCH_BASE};

/// Resolves search queries and playlist listings into tracks.
pub struct Resolver {
    settings: Settings,
}

impl Resolver {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Issues a single-result upstream text search.
    ///
    /// Returns `None` for an empty query, zero upstream results, a tool
    /// failure, or unparseable output; never a track with a missing id.
    pub async fn search(&self, query: &str, message_id: i64, video: bool) -> Option<Track> {
        if query.trim().is_empty() {
            return None;
        }
        info!("Searching upstream for: {}", query);

        let bin = self.settings.ytdlp_path.clone();
        let probe = format!("ytsearch1:{}", query);
        let output = task::spawn_blocking(move || {
            Command::new(bin)
                .args(["-j", "--no-playlist", "--skip-download", &probe])
                .output()
        })
        .await;

        let output = match output {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("Failed to run search tool: {}", e);
                return None;
            }
            Err(e) => {
                error!("Search task failed: {}", e);
                return None;
            }
        };

        if !output.status.success() {
            error!(
                "Search tool exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        track_from_search(&output.stdout, message_id, video)
    }

    /// Fetches a playlist listing and maps up to `limit` entries to tracks,
    /// preserving upstream order.
    ///
    /// Partial success is part of the contract: the first entry that fails to
    /// map logs the cause and ends the loop, and every track built before the
    /// failure point is returned. A listing-level failure yields an empty
    /// vec. Nothing on this path is raised to the caller.
    pub async fn playlist(&self, limit: usize, user: &str, url: &str, video: bool) -> Vec<Track> {
        info!("Resolving playlist ({} entries max): {}", limit, url);

        let bin = self.settings.ytdlp_path.clone();
        let url = url.to_string();
        let end = limit.to_string();
        let output = task::spawn_blocking(move || {
            Command::new(bin)
                .args(["-j", "--flat-playlist", "--playlist-end", &end, &url])
                .output()
        })
        .await;

        let output = match output {
            Ok(Ok(output)) if output.status.success() => output,
            Ok(Ok(output)) => {
                error!(
                    "Playlist listing exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                return Vec::new();
            }
            Ok(Err(e)) => {
                error!("Failed to run playlist listing: {}", e);
                return Vec::new();
            }
            Err(e) => {
                error!("Playlist task failed: {}", e);
                return Vec::new();
            }
        };

        collect_playlist(&String::from_utf8_lossy(&output.stdout), limit, user, video)
    }
}

/// Builds a track from the search probe's JSON output. The tool prints
/// nothing for a query with zero results, which surfaces here as `None`.
fn track_from_search(stdout: &[u8], message_id: i64, video: bool) -> Option<Track> {
    if stdout.is_empty() {
        return None;
    }

    let data: Value = match serde_json::from_slice(stdout) {
        Ok(data) => data,
        Err(e) => {
            error!("Unable to parse search result: {}", e);
            return None;
        }
    };

    let id = data["id"].as_str().filter(|id| !id.is_empty())?.to_string();
    let duration = duration_field(&data);

    Some(Track {
        url: data["webpage_url"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", WATCH_BASE, id)),
        title: track::display_title(data["title"].as_str().unwrap_or("Unknown Title")),
        channel_name: channel_field(&data),
        duration_sec: utils::to_seconds(&duration),
        duration,
        thumbnail: track::strip_query(data["thumbnail"].as_str().unwrap_or_default()),
        view_count: data["view_count"]
            .as_u64()
            .map(utils::short_views)
            .unwrap_or_default(),
        video,
        message_id: Some(message_id),
        user: None,
        id,
    })
}

/// Maps flat-listing lines to tracks, stopping at the first failure and
/// returning the prefix built so far.
fn collect_playlist(stdout: &str, limit: usize, user: &str, video: bool) -> Vec<Track> {
    let mut tracks = Vec::new();

    for line in stdout.lines().filter(|line| !line.trim().is_empty()).take(limit) {
        match playlist_entry(line, user, video) {
            Ok(track) => tracks.push(track),
            Err(e) => {
                error!("Playlist error: {}", e);
                break;
            }
        }
    }

    tracks
}

/// Builds one track from a flat playlist entry.
///
/// Playlist context quirks: no message id, the view count is always empty
/// (the flat listing does not carry one), and the entry URL has its
/// `&list=...` membership suffix stripped.
fn playlist_entry(line: &str, user: &str, video: bool) -> SourceResult<Track> {
    let data: Value = serde_json::from_str(line)?;

    let id = data["id"]
        .as_str()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SourceError::Metadata("playlist entry is missing an id".to_string()))?
        .to_string();

    // The flat listing reports numeric seconds; format then re-parse so the
    // duration/duration_sec pair stays consistent.
    let duration = utils::duration_label(data["duration"].as_f64().unwrap_or(0.0) as u64);

    let url = data["url"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}{}", WATCH_BASE, id));
    let url = url
        .split("&list=")
        .next()
        .unwrap_or(&url)
        .to_string();

    Ok(Track {
        title: track::display_title(data["title"].as_str().unwrap_or("Unknown Title")),
        channel_name: channel_field(&data),
        duration_sec: utils::to_seconds(&duration),
        duration,
        thumbnail: last_thumbnail(&data),
        url,
        view_count: String::new(),
        video,
        message_id: None,
        user: Some(user.to_string()),
        id,
    })
}

/// Display duration, preferring the tool's pre-rendered string and falling
/// back to formatting the numeric seconds.
fn duration_field(data: &Value) -> String {
    data["duration_string"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| utils::duration_label(data["duration"].as_f64().unwrap_or(0.0) as u64))
}

/// Channel display name, under whichever key the tool used; empty if absent.
fn channel_field(data: &Value) -> String {
    data["channel"]
        .as_str()
        .or_else(|| data["uploader"].as_str())
        .unwrap_or_default()
        .to_string()
}

/// Highest-resolution thumbnail (the listing orders them ascending), query
/// stripped; empty when the entry carries none.
fn last_thumbnail(data: &Value) -> String {
    data["thumbnails"]
        .as_array()
        .and_then(|thumbnails| thumbnails.last())
        .and_then(|thumbnail| thumbnail["url"].as_str())
        .map(track::strip_query)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn search_json() -> Vec<u8> {
        json!({
            "id": "dQw4w9WgXcQ",
            "title": "Rick Astley - Never Gonna Give You Up (Official Video)",
            "channel": "Rick Astley",
            "duration": 213,
            "duration_string": "3:33",
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq720.jpg?sqp=abc&rs=x",
            "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "view_count": 1_500_000_000u64,
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_search_result_mapping() {
        let track = track_from_search(&search_json(), 42, false).unwrap();

        assert_eq!(track.id, "dQw4w9WgXcQ");
        assert_eq!(track.title, "Rick Astley - Never Gonna");
        assert!(track.title.chars().count() <= track::MAX_TITLE_LEN);
        assert_eq!(track.channel_name, "Rick Astley");
        assert_eq!(track.duration, "3:33");
        assert_eq!(track.duration_sec, 213);
        assert_eq!(
            track.thumbnail,
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq720.jpg"
        );
        assert_eq!(track.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(track.view_count, "1.5B views");
        assert_eq!(track.message_id, Some(42));
        assert_eq!(track.user, None);
        assert!(!track.video);
    }

    #[test]
    fn test_search_empty_output_is_none() {
        assert_eq!(track_from_search(b"", 1, false), None);
    }

    #[test]
    fn test_search_missing_id_is_none() {
        let out = json!({"title": "no id here"}).to_string().into_bytes();
        assert_eq!(track_from_search(&out, 1, false), None);

        let out = json!({"id": "", "title": "blank id"}).to_string().into_bytes();
        assert_eq!(track_from_search(&out, 1, false), None);
    }

    #[test]
    fn test_search_malformed_output_is_none() {
        assert_eq!(track_from_search(b"not json at all", 1, false), None);
    }

    #[test]
    fn test_search_duration_falls_back_to_numeric() {
        let out = json!({"id": "abcdefghijk", "title": "t", "duration": 225})
            .to_string()
            .into_bytes();
        let track = track_from_search(&out, 1, true).unwrap();
        assert_eq!(track.duration, "3:45");
        assert_eq!(track.duration_sec, 225);
        assert!(track.video);
    }

    fn playlist_line(id: &str, index: usize) -> String {
        json!({
            "id": id,
            "title": format!("Entry number {}", index),
            "channel": "Some Channel",
            "duration": 200 + index,
            "url": format!("https://www.youtube.com/watch?v={}&list=PLxyz", id),
            "thumbnails": [
                {"url": "https://i.ytimg.com/vi/low.jpg?x=1"},
                {"url": format!("https://i.ytimg.com/vi/{}/hq720.jpg?sqp=s", id)},
            ],
        })
        .to_string()
    }

    #[test]
    fn test_playlist_entry_mapping() {
        let track = playlist_entry(&playlist_line("aaaaaaaaaaa", 1), "tester", false).unwrap();

        assert_eq!(track.id, "aaaaaaaaaaa");
        assert_eq!(track.url, "https://www.youtube.com/watch?v=aaaaaaaaaaa");
        assert_eq!(track.duration, "3:21");
        assert_eq!(track.duration_sec, 201);
        assert_eq!(
            track.thumbnail,
            "https://i.ytimg.com/vi/aaaaaaaaaaa/hq720.jpg"
        );
        assert_eq!(track.view_count, "");
        assert_eq!(track.message_id, None);
        assert_eq!(track.user, Some("tester".to_string()));
    }

    #[test]
    fn test_playlist_respects_limit_and_order() {
        let ids = ["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc", "ddddddddddd"];
        let stdout: String = ids
            .iter()
            .enumerate()
            .map(|(i, id)| playlist_line(id, i) + "\n")
            .collect();

        let tracks = collect_playlist(&stdout, 3, "tester", false);
        assert_eq!(tracks.len(), 3);
        let got: Vec<&str> = tracks.iter().map(|track| track.id.as_str()).collect();
        assert_eq!(got, ["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"]);
    }

    #[test]
    fn test_playlist_partial_failure_returns_prefix() {
        let stdout = format!(
            "{}\n{}\nthis line is not json\n{}\n",
            playlist_line("aaaaaaaaaaa", 0),
            playlist_line("bbbbbbbbbbb", 1),
            playlist_line("ddddddddddd", 3),
        );

        // The malformed third entry ends the loop; the prefix survives and
        // the entry after the failure is not resurrected.
        let tracks = collect_playlist(&stdout, 10, "tester", false);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, "aaaaaaaaaaa");
        assert_eq!(tracks[1].id, "bbbbbbbbbbb");
    }

    #[test]
    fn test_playlist_entry_without_id_fails() {
        let line = json!({"title": "idless"}).to_string();
        assert!(playlist_entry(&line, "tester", false).is_err());
    }

    #[test]
    fn test_playlist_empty_listing_is_empty() {
        assert!(collect_playlist("", 5, "tester", false).is_empty());
        assert!(collect_playlist("\n\n", 5, "tester", false).is_empty());
    }

    #[test]
    fn test_search_blank_query_short_circuits() {
        tokio_test::block_on(async {
            let resolver = Resolver::new(Settings::default());
            assert_eq!(resolver.search("", 1, false).await, None);
            assert_eq!(resolver.search("   ", 1, false).await, None);
        });
    }
}
