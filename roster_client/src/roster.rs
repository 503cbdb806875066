//! Optimistic roster: local cache first, then the gateway
//!
//! Every write lands in the [`LocalCache`] before the gateway is contacted.
//! If the gateway then fails, the local change stays and the caller gets
//! [`ClientError::NotSynced`]. [`SyncedRoster::push`] re-sends a cached
//! record; [`SyncedRoster::refresh`] pulls the gateway's list without dropping
//! records only the cache has.

use crate::bulk::parse_bulk_names;
use crate::error::{ClientError, ClientResult};
use crate::local_cache::LocalCache;
use crate::storage::CacheStorage;
use crate::sync::SyncClient;
use roster_common::{ChampionClass, ChampionPatch, NewChampion, RosterError, StarRating};
use std::collections::HashSet;

/// Result of adding one name from a bulk list
#[derive(Debug)]
pub struct BulkOutcome {
    pub name: String,
    /// The new id, or why this name failed
    pub result: ClientResult<String>,
}

/// What a refresh changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// Records the gateway returned
    pub fetched: usize,
    /// Ids kept from the cache because the gateway does not have them
    pub unsynced: Vec<String>,
}

pub struct SyncedRoster<S: CacheStorage> {
    cache: LocalCache<S>,
    client: SyncClient,
}

impl<S: CacheStorage> SyncedRoster<S> {
    pub fn new(cache: LocalCache<S>, client: SyncClient) -> Self {
        Self { cache, client }
    }

    /// Validate, store locally, then send to the gateway under the same id
    pub async fn add(&mut self, input: NewChampion) -> ClientResult<String> {
        input.validate()?;
        let id = self.cache.add(input)?;
        let Some(record) = self.cache.get(&id).cloned() else {
            return Err(RosterError::NotFound(id).into());
        };

        match self.client.add_champion(&record).await {
            Ok(_) => {
                log::info!("Champion {} ({}) synced", record.name, id);
                Ok(id)
            }
            Err(source) => {
                log::warn!("Champion {} kept locally, sync failed: {}", id, source);
                Err(ClientError::NotSynced { id, source })
            }
        }
    }

    /// Merge locally, then send the same patch to the gateway
    ///
    /// An id the cache does not know is reported as `NotFound` without a
    /// request being made.
    pub async fn update(&mut self, id: &str, patch: &ChampionPatch) -> ClientResult<()> {
        let Some(current) = self.cache.get(id) else {
            return Err(RosterError::NotFound(id.to_string()).into());
        };
        patch.validate_against(current)?;
        self.cache.update(id, patch)?;

        self.client
            .update_champion(id, patch)
            .await
            .map_err(|source| {
                log::warn!("Update of {} kept locally, sync failed: {}", id, source);
                ClientError::NotSynced {
                    id: id.to_string(),
                    source,
                }
            })
    }

    /// Remove from the local cache only. Removing an absent id is fine.
    pub fn remove(&mut self, id: &str) -> ClientResult<()> {
        self.cache.remove(id)?;
        Ok(())
    }

    /// Re-send a cached record to the gateway
    ///
    /// An id the gateway already knows is sent as a full update instead.
    pub async fn push(&self, id: &str) -> ClientResult<()> {
        let Some(record) = self.cache.get(id).cloned() else {
            return Err(RosterError::NotFound(id.to_string()).into());
        };

        let result = match self.client.add_champion(&record).await {
            Err(RosterError::DuplicateId(_)) => {
                log::debug!("Champion {} already on gateway, sending full update", id);
                self.client
                    .update_champion(id, &ChampionPatch::from(record))
                    .await
            }
            other => other.map(|_| ()),
        };

        result.map_err(|source| {
            log::warn!("Push of champion {} failed: {}", id, source);
            ClientError::NotSynced {
                id: id.to_string(),
                source,
            }
        })?;
        log::info!("Champion {} pushed", id);
        Ok(())
    }

    /// Take the gateway's list as the roster
    ///
    /// Cached records the gateway does not have (adds that never synced) are
    /// kept after the gateway's records and reported back for [`Self::push`].
    pub async fn refresh(&mut self) -> ClientResult<RefreshReport> {
        let mut champions = self.client.list_champions().await?;
        let fetched = champions.len();

        let remote_ids: HashSet<&str> = champions.iter().map(|c| c.id.as_str()).collect();
        let local_only: Vec<_> = self
            .cache
            .records()
            .iter()
            .filter(|c| !remote_ids.contains(c.id.as_str()))
            .cloned()
            .collect();
        let unsynced: Vec<String> = local_only.iter().map(|c| c.id.clone()).collect();

        champions.extend(local_only);
        self.cache.replace_all(champions)?;

        if unsynced.is_empty() {
            log::info!("Refreshed local cache with {} champions", fetched);
        } else {
            log::warn!(
                "Refreshed local cache with {} champions, {} not on gateway",
                fetched,
                unsynced.len()
            );
        }
        Ok(RefreshReport { fetched, unsynced })
    }

    /// Add every name in a comma-separated list with shared attributes
    pub async fn add_bulk(
        &mut self,
        text: &str,
        class: ChampionClass,
        rating: StarRating,
        rank_options: &[&str],
    ) -> Vec<BulkOutcome> {
        let names = parse_bulk_names(text);
        log::info!("Bulk adding {} {} champions", names.len(), class);

        let mut outcomes = Vec::with_capacity(names.len());
        for name in names {
            let result = self
                .add(NewChampion::new(name.clone(), class, rating, rank_options))
                .await;
            outcomes.push(BulkOutcome { name, result });
        }
        outcomes
    }

    pub fn cache(&self) -> &LocalCache<S> {
        &self.cache
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }
}
