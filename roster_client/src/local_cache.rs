//! Write-through local champion cache
//!
//! The whole roster lives in memory in insertion order and is rewritten to
//! its storage backend after every mutation, before the call returns.

use crate::error::{ClientError, ClientResult};
use crate::storage::CacheStorage;
use roster_common::{
    new_champion_id, ChampionClass, ChampionPatch, ChampionRecord, NewChampion, StarRating,
};
use serde::{Deserialize, Serialize};

/// Fixed key the roster is persisted under
pub const COLLECTION_KEY: &str = "champions-storage";

/// Blob layout version
const BLOB_VERSION: u32 = 0;

/// Persisted blob: `{"state":{"champions":[...]},"version":0}`
#[derive(Deserialize)]
struct PersistedBlob {
    state: PersistedState,
    version: u32,
}

#[derive(Deserialize)]
struct PersistedState {
    champions: Vec<ChampionRecord>,
}

#[derive(Serialize)]
struct PersistedBlobRef<'a> {
    state: PersistedStateRef<'a>,
    version: u32,
}

#[derive(Serialize)]
struct PersistedStateRef<'a> {
    champions: &'a [ChampionRecord],
}

/// Per-class champion counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassSummary {
    pub class: ChampionClass,
    pub six_star: usize,
    pub seven_star: usize,
}

/// Client-side roster with injected persistence
pub struct LocalCache<S: CacheStorage> {
    storage: S,
    champions: Vec<ChampionRecord>,
}

impl<S: CacheStorage> LocalCache<S> {
    /// Load the roster from storage, or start empty if nothing was saved
    ///
    /// A blob that cannot be parsed is an error, never silently discarded.
    pub fn open(storage: S) -> ClientResult<Self> {
        let champions = match storage.load(COLLECTION_KEY)? {
            Some(blob) => {
                let persisted: PersistedBlob = serde_json::from_str(&blob)?;
                if persisted.version != BLOB_VERSION {
                    return Err(ClientError::Corrupt(format!(
                        "unsupported cache version {}",
                        persisted.version
                    )));
                }
                log::info!(
                    "Loaded champion cache with {} entries",
                    persisted.state.champions.len()
                );
                persisted.state.champions
            }
            None => {
                log::info!("Starting with empty champion cache");
                Vec::new()
            }
        };

        Ok(Self { storage, champions })
    }

    /// Save cache to storage
    fn persist(&mut self) -> ClientResult<()> {
        let blob = serde_json::to_string(&PersistedBlobRef {
            state: PersistedStateRef {
                champions: &self.champions,
            },
            version: BLOB_VERSION,
        })?;
        self.storage.save(COLLECTION_KEY, &blob)?;
        log::debug!("Persisted champion cache with {} entries", self.champions.len());
        Ok(())
    }

    /// Add a champion under a fresh id and return the id
    pub fn add(&mut self, input: NewChampion) -> ClientResult<String> {
        let id = new_champion_id();
        self.champions.push(input.with_id(id.clone()));
        self.persist()?;
        log::info!("Added champion {} to local cache", id);
        Ok(id)
    }

    /// Merge `patch` into the champion with `id`
    ///
    /// Returns `false` without touching storage when the id is unknown.
    pub fn update(&mut self, id: &str, patch: &ChampionPatch) -> ClientResult<bool> {
        let Some(record) = self.champions.iter_mut().find(|c| c.id == id) else {
            log::debug!("Update for unknown champion {} ignored", id);
            return Ok(false);
        };
        patch.apply_to(record);
        self.persist()?;
        Ok(true)
    }

    /// Remove the champion with `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> ClientResult<bool> {
        let before = self.champions.len();
        self.champions.retain(|c| c.id != id);
        if self.champions.len() == before {
            return Ok(false);
        }
        self.persist()?;
        log::info!("Removed champion {} from local cache", id);
        Ok(true)
    }

    /// Champions of one class and rating, in insertion order
    pub fn query_by_class_and_rating(
        &self,
        class: ChampionClass,
        rating: StarRating,
    ) -> Vec<&ChampionRecord> {
        self.champions
            .iter()
            .filter(|c| c.class == class && c.star_rating == rating)
            .collect()
    }

    /// Counts per class for both ratings, classes in display order
    pub fn class_summary(&self) -> Vec<ClassSummary> {
        ChampionClass::ALL
            .into_iter()
            .map(|class| ClassSummary {
                class,
                six_star: self.query_by_class_and_rating(class, StarRating::Six).len(),
                seven_star: self.query_by_class_and_rating(class, StarRating::Seven).len(),
            })
            .collect()
    }

    /// Replace the whole roster, e.g. with the server's listing
    pub fn replace_all(&mut self, records: Vec<ChampionRecord>) -> ClientResult<()> {
        self.champions = records;
        self.persist()
    }

    pub fn get(&self, id: &str) -> Option<&ChampionRecord> {
        self.champions.iter().find(|c| c.id == id)
    }

    pub fn records(&self) -> &[ChampionRecord] {
        &self.champions
    }

    pub fn len(&self) -> usize {
        self.champions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.champions.is_empty()
    }

    /// Give back the storage backend
    pub fn into_storage(self) -> S {
        self.storage
    }
}

#[cfg(test)]
#[path = "local_cache_tests.rs"]
mod tests;
