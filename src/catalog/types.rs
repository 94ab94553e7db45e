use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Shared HTTP client with reasonable defaults for timeouts
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent("PlaylistPlayer/1.0")
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client")
});

/// One playable entry of the playlist. Immutable once fetched; identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Opaque video identifier understood by the widget.
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub published_at: DateTime<Utc>,
    /// Length in whole seconds (0 when the catalog had no duration).
    pub duration: u32,
    pub views: u64,
}

impl Track {
    /// Canonical public page for the track, used for external opening and sharing.
    pub fn watch_url(&self) -> String {
        watch_url(&self.id)
    }
}

pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Ordered tracks, fixed for the session once loaded.
pub type Playlist = Vec<Track>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("No music releases found in playlist")]
    EmptyPlaylist,
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

// Re-export HTTP client for sources within the catalog module
pub(crate) fn http_client() -> &'static Client {
    &HTTP_CLIENT
}
