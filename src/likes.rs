// likes.rs: Liked track ids persisted as a JSON array

use crate::store::SharedStore;
use std::collections::BTreeSet;

pub const LIKED_TRACKS_KEY: &str = "likedTracks";

#[derive(Debug, Default, Clone)]
pub struct LikedSet {
    ids: BTreeSet<String>,
}

impl LikedSet {
    /// Reads the persisted set; a missing or unreadable entry yields an empty set.
    pub fn load(store: &SharedStore) -> Self {
        let raw = match store.get(LIKED_TRACKS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read liked tracks");
                return Self::default();
            }
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => Self { ids: ids.into_iter().collect() },
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed liked tracks");
                Self::default()
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Flips membership of `id`, persists the set and returns whether the
    /// track is now liked.
    pub fn toggle(&mut self, id: &str, store: &SharedStore) -> bool {
        let liked = if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        };
        self.save(store);
        liked
    }

    fn save(&self, store: &SharedStore) {
        let ids: Vec<&String> = self.ids.iter().collect();
        let result = serde_json::to_string(&ids)
            .map_err(crate::store::StorageError::from)
            .and_then(|json| store.set(LIKED_TRACKS_KEY, &json));
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to persist liked tracks");
        }
    }
}
