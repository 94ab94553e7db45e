use crate::catalog::types::{Playlist, Track};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;

static ISO_DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"PT(\d+H)?(\d+M)?(\d+S)?").unwrap());

/// Parse an ISO-8601 style duration (`PT#H#M#S`) into whole seconds.
///
/// Missing components count as zero; input that does not match at all is 0.
pub fn parse_duration(raw: &str) -> u32 {
    let Some(cap) = ISO_DURATION_RE.captures(raw) else {
        return 0;
    };
    let component = |idx: usize| -> u64 {
        cap.get(idx)
            .and_then(|m| m.as_str()[..m.as_str().len() - 1].parse::<u64>().ok())
            .unwrap_or(0)
    };
    let total = component(1)
        .saturating_mul(3600)
        .saturating_add(component(2).saturating_mul(60))
        .saturating_add(component(3));
    u32::try_from(total).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Catalog response shapes (YouTube Data API v3)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
pub struct PlaylistItemsResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub resource_id: ResourceId,
    #[serde(default)]
    pub thumbnails: HashMap<String, Thumbnail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub video_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct VideosResponse {
    #[serde(default)]
    pub items: Vec<VideoDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub id: String,
    pub content_details: Option<ContentDetails>,
    pub statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
pub struct ContentDetails {
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub view_count: Option<String>,
}

const THUMBNAIL_PREFERENCE: [&str; 5] = ["maxres", "standard", "high", "medium", "default"];

fn best_thumbnail(thumbnails: &HashMap<String, Thumbnail>) -> String {
    THUMBNAIL_PREFERENCE
        .iter()
        .find_map(|key| thumbnails.get(*key))
        .map(|t| t.url.clone())
        .unwrap_or_default()
}

/// Join playlist entries with their duration/statistics lookup, keeping the
/// playlist order. Entries without details get a zero duration and view count.
pub fn assemble_playlist(
    items: PlaylistItemsResponse,
    details: VideosResponse,
    thumbnail_override: Option<&str>,
) -> Playlist {
    let by_id: HashMap<&str, &VideoDetails> =
        details.items.iter().map(|d| (d.id.as_str(), d)).collect();

    items
        .items
        .into_iter()
        .map(|item| {
            let snippet = item.snippet;
            let info = by_id.get(snippet.resource_id.video_id.as_str());
            let duration = info
                .and_then(|d| d.content_details.as_ref())
                .map(|c| parse_duration(&c.duration))
                .unwrap_or(0);
            let views = info
                .and_then(|d| d.statistics.as_ref())
                .and_then(|s| s.view_count.as_deref())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            let thumbnail = match thumbnail_override {
                Some(url) => url.to_string(),
                None => best_thumbnail(&snippet.thumbnails),
            };
            Track {
                id: snippet.resource_id.video_id,
                title: snippet.title,
                thumbnail,
                published_at: snippet.published_at.unwrap_or_default(),
                duration,
                views,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_durations() {
        assert_eq!(parse_duration("PT1H2M3S"), 3723);
        assert_eq!(parse_duration("PT45S"), 45);
        assert_eq!(parse_duration("PT5M"), 300);
        assert_eq!(parse_duration("PT0S"), 0);
        assert_eq!(parse_duration("PT"), 0);
        assert_eq!(parse_duration("garbage"), 0);
        assert_eq!(parse_duration("PT2H"), 7200);
        assert_eq!(parse_duration("PT9999999999999999H"), u32::MAX);
        assert_eq!(parse_duration("PT99999999999999999999S"), 0);
    }

    #[test]
    fn assembles_tracks_in_playlist_order() {
        let items: PlaylistItemsResponse = serde_json::from_str(
            r#"{"items": [
                {"snippet": {"title": "Second upload", "publishedAt": "2024-03-01T10:00:00Z",
                    "resourceId": {"videoId": "bbb"},
                    "thumbnails": {"default": {"url": "d.jpg"}, "high": {"url": "h.jpg"}}}},
                {"snippet": {"title": "First upload", "publishedAt": "2023-01-01T00:00:00Z",
                    "resourceId": {"videoId": "aaa"}}}
            ]}"#,
        )
        .expect("items");
        let details: VideosResponse = serde_json::from_str(
            r#"{"items": [
                {"id": "aaa", "contentDetails": {"duration": "PT3M20S"}, "statistics": {"viewCount": "1500"}},
                {"id": "bbb", "contentDetails": {"duration": "PT1H"}, "statistics": {"viewCount": "n/a"}}
            ]}"#,
        )
        .expect("details");

        let playlist = assemble_playlist(items, details, None);
        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist[0].id, "bbb");
        assert_eq!(playlist[0].duration, 3600);
        assert_eq!(playlist[0].views, 0);
        assert_eq!(playlist[0].thumbnail, "h.jpg");
        assert_eq!(playlist[1].id, "aaa");
        assert_eq!(playlist[1].duration, 200);
        assert_eq!(playlist[1].views, 1500);
        assert_eq!(playlist[1].thumbnail, "");
    }

    #[test]
    fn missing_details_default_to_zero_and_override_thumbnail() {
        let items: PlaylistItemsResponse = serde_json::from_str(
            r#"{"items": [{"snippet": {"title": "Lonely", "resourceId": {"videoId": "zzz"}}}]}"#,
        )
        .expect("items");
        let playlist = assemble_playlist(items, VideosResponse::default(), Some("albumart.webp"));
        assert_eq!(playlist[0].duration, 0);
        assert_eq!(playlist[0].views, 0);
        assert_eq!(playlist[0].thumbnail, "albumart.webp");
    }
}
