use crate::catalog::CatalogSource;
use crate::catalog::parse::{PlaylistItemsResponse, VideosResponse, assemble_playlist};
use crate::catalog::types::{CatalogError, Playlist, http_client};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Playlist lookup against the YouTube Data API v3.
///
/// Two sequential calls: `playlistItems` for ids/titles/publish times, then
/// `videos` for durations and view counts of those ids.
#[derive(Debug, Clone)]
pub struct YouTubeCatalog {
    pub api_key: String,
    pub playlist_id: String,
    pub max_results: u32,
    /// Artwork used for every track instead of the per-video thumbnail.
    pub thumbnail_override: Option<String>,
}

impl YouTubeCatalog {
    pub fn new(api_key: impl Into<String>, playlist_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            playlist_id: playlist_id.into(),
            max_results: 12,
            thumbnail_override: None,
        }
    }

    async fn list_items(&self) -> Result<PlaylistItemsResponse, CatalogError> {
        let url = build_playlist_items_url(&self.api_key, &self.playlist_id, self.max_results);
        let resp = http_client().get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(CatalogError::Api(format!(
                "playlistItems: HTTP {}",
                resp.status().as_u16()
            )));
        }
        let items: PlaylistItemsResponse = resp.json().await?;
        if items.items.is_empty() {
            return Err(CatalogError::EmptyPlaylist);
        }
        Ok(items)
    }

    async fn video_details(&self, ids: &[&str]) -> Result<VideosResponse, CatalogError> {
        let url = build_videos_url(&self.api_key, ids);
        let resp = http_client().get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(CatalogError::Api(format!(
                "videos: HTTP {}",
                resp.status().as_u16()
            )));
        }
        Ok(resp.json().await?)
    }
}

impl CatalogSource for YouTubeCatalog {
    async fn fetch_playlist(&self) -> Result<Playlist, CatalogError> {
        let items = self.list_items().await?;
        let ids: Vec<&str> = items
            .items
            .iter()
            .map(|item| item.snippet.resource_id.video_id.as_str())
            .collect();
        let details = self.video_details(&ids).await?;
        tracing::debug!(
            playlist_id = %self.playlist_id,
            items = ids.len(),
            details = details.items.len(),
            "Fetched playlist from catalog"
        );
        Ok(assemble_playlist(
            items,
            details,
            self.thumbnail_override.as_deref(),
        ))
    }
}

fn build_playlist_items_url(api_key: &str, playlist_id: &str, max_results: u32) -> String {
    let params = [
        format!("key={}", urlencoding::encode(api_key)),
        format!("playlistId={}", urlencoding::encode(playlist_id)),
        String::from("part=snippet"),
        format!("maxResults={max_results}"),
    ];
    format!("{API_BASE}/playlistItems?{}", params.join("&"))
}

fn build_videos_url(api_key: &str, ids: &[&str]) -> String {
    let params = [
        format!("key={}", urlencoding::encode(api_key)),
        format!("id={}", urlencoding::encode(&ids.join(","))),
        String::from("part=contentDetails,statistics"),
    ];
    format!("{API_BASE}/videos?{}", params.join("&"))
}
