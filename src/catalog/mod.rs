// catalog/mod.rs - playlist lookup, caching and loading
pub mod cache;
pub mod loader;
pub mod parse;
pub mod types;
pub mod youtube;

use std::future::Future;

pub use cache::{CacheInfo, CatalogCache};
pub use loader::{LoadError, LoadSource, Loaded, PlaylistLoader};
pub use types::{CatalogError, Playlist, Track};
pub use youtube::YouTubeCatalog;

/// Remote collaborator returning playlist metadata.
pub trait CatalogSource {
    fn fetch_playlist(&self) -> impl Future<Output = Result<Playlist, CatalogError>> + Send;
}
