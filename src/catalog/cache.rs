//! Playlist cache on top of the key-value store.
//!
//! Keeps the last successfully fetched playlist together with its creation
//! time so repeat visits skip the two catalog calls.
//!
//! # Storage Layout
//!
//! - `youtube_playlist_cache`: playlist serialized as JSON
//! - `youtube_playlist_cache_timestamp`: creation time, Unix milliseconds
//!
//! # Lookup
//!
//! ```text
//! ┌─────────────────┐
//! │ read()          │── age <= TTL ──▶ Playlist
//! └────────┬────────┘
//!          │ expired / missing
//!          ▼
//! ┌─────────────────┐
//! │ catalog fetch   │── ok ──▶ write() ──▶ Playlist
//! └────────┬────────┘
//!          │ error
//!          ▼
//! ┌─────────────────┐
//! │ read_stale()    │── present ──▶ Playlist (any age)
//! └─────────────────┘
//! ```
//!
//! Every operation fails soft: storage and parse errors are logged and
//! surface as a cache miss or a no-op.

use crate::catalog::types::Playlist;
use crate::store::SharedStore;
use chrono::Utc;
use serde::Serialize;

pub const CACHE_KEY: &str = "youtube_playlist_cache";
pub const CACHE_TIMESTAMP_KEY: &str = "youtube_playlist_cache_timestamp";

/// Maximum age for normal reads: 24 hours.
pub const CACHE_TTL_MS: i64 = 1000 * 60 * 60 * 24;

const MS_PER_HOUR: f64 = 1000.0 * 60.0 * 60.0;

/// Cache status reported by the debug surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub cached: bool,
    pub age_ms: i64,
    pub age_hours: f64,
    pub expires_in_hours: f64,
    pub valid: bool,
}

impl CacheInfo {
    fn absent() -> Self {
        Self {
            cached: false,
            age_ms: 0,
            age_hours: 0.0,
            expires_in_hours: 0.0,
            valid: false,
        }
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Clone)]
pub struct CatalogCache {
    store: SharedStore,
    ttl_ms: i64,
}

impl CatalogCache {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            ttl_ms: CACHE_TTL_MS,
        }
    }

    /// Fresh playlist, or `None` when missing, unreadable or older than the TTL.
    pub fn read(&self) -> Option<Playlist> {
        self.read_at(now_millis())
    }

    pub fn read_at(&self, now_ms: i64) -> Option<Playlist> {
        let timestamp = self.timestamp()?;
        if now_ms - timestamp > self.ttl_ms {
            tracing::info!(age_ms = now_ms - timestamp, "Cache expired, will fetch fresh data");
            return None;
        }
        let playlist = self.read_stale()?;
        tracing::debug!(tracks = playlist.len(), "Using cached playlist data");
        Some(playlist)
    }

    /// Cached playlist regardless of age; the last-resort fallback.
    pub fn read_stale(&self) -> Option<Playlist> {
        let raw = match self.store.get(CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Error reading cache");
                return None;
            }
        };
        match serde_json::from_str::<Playlist>(&raw) {
            Ok(playlist) => Some(playlist),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse cached playlist");
                None
            }
        }
    }

    pub fn write(&self, playlist: &Playlist) {
        self.write_at(playlist, now_millis());
    }

    pub fn write_at(&self, playlist: &Playlist, now_ms: i64) {
        let json = match serde_json::to_string(playlist) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Error serializing playlist for cache");
                return;
            }
        };
        let result = self
            .store
            .set(CACHE_KEY, &json)
            .and_then(|_| self.store.set(CACHE_TIMESTAMP_KEY, &now_ms.to_string()));
        match result {
            Ok(()) => tracing::debug!(tracks = playlist.len(), "Playlist cached successfully"),
            Err(e) => tracing::warn!(error = %e, "Error caching playlist"),
        }
    }

    /// Removes both entries; a failure on one key does not skip the other.
    pub fn clear(&self) {
        for key in [CACHE_KEY, CACHE_TIMESTAMP_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "Error clearing cache entry");
            }
        }
        tracing::info!("Cache cleared");
    }

    pub fn info(&self) -> CacheInfo {
        self.info_at(now_millis())
    }

    pub fn info_at(&self, now_ms: i64) -> CacheInfo {
        let Some(timestamp) = self.timestamp() else {
            return CacheInfo::absent();
        };
        let age_ms = now_ms - timestamp;
        let expires_in = self.ttl_ms - age_ms;
        CacheInfo {
            cached: true,
            age_ms,
            age_hours: round2(age_ms as f64 / MS_PER_HOUR),
            expires_in_hours: round2(expires_in as f64 / MS_PER_HOUR),
            valid: expires_in > 0,
        }
    }

    fn timestamp(&self) -> Option<i64> {
        match self.store.get(CACHE_TIMESTAMP_KEY) {
            Ok(Some(raw)) => match raw.trim().parse::<i64>() {
                Ok(ts) => Some(ts),
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid cache timestamp");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Error reading cache timestamp");
                None
            }
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
