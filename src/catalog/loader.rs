use crate::catalog::CatalogSource;
use crate::catalog::cache::CatalogCache;
use crate::catalog::types::{CatalogError, Playlist};
use crate::telemetry::Telemetry;
use thiserror::Error;

/// Where a loaded playlist came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Cache,
    Catalog,
    /// Expired cache used because the live fetch failed.
    StaleCache,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub playlist: Playlist,
    pub source: LoadSource,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{0}")]
    Catalog(#[from] CatalogError),
}

/// Cache-first playlist loading with a stale-cache last resort.
pub struct PlaylistLoader<S> {
    source: S,
    cache: CatalogCache,
    telemetry: Telemetry,
}

impl<S: CatalogSource> PlaylistLoader<S> {
    pub fn new(source: S, cache: CatalogCache, telemetry: Telemetry) -> Self {
        Self {
            source,
            cache,
            telemetry,
        }
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    pub async fn load(&self) -> Result<Loaded, LoadError> {
        if let Some(playlist) = self.cache.read().filter(|p| !p.is_empty()) {
            self.telemetry.playlist_load(true);
            return Ok(Loaded {
                playlist,
                source: LoadSource::Cache,
            });
        }

        tracing::info!("Fetching fresh playlist from catalog");
        let err = match self.source.fetch_playlist().await {
            Ok(playlist) if !playlist.is_empty() => {
                self.cache.write(&playlist);
                self.telemetry.playlist_load(false);
                return Ok(Loaded {
                    playlist,
                    source: LoadSource::Catalog,
                });
            }
            Ok(_) => CatalogError::EmptyPlaylist,
            Err(e) => e,
        };

        tracing::warn!(error = %err, "Error fetching tracks");
        self.telemetry.playlist_error(&err.to_string());

        if let Some(playlist) = self.cache.read_stale().filter(|p| !p.is_empty()) {
            tracing::info!(tracks = playlist.len(), "Using stale cache as fallback");
            return Ok(Loaded {
                playlist,
                source: LoadSource::StaleCache,
            });
        }
        Err(LoadError::Catalog(err))
    }

    /// Debug surface: drop the cache and load again.
    pub async fn refresh(&self) -> Result<Loaded, LoadError> {
        self.cache.clear();
        self.load().await
    }
}
