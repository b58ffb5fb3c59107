//! In-memory object cache for video rows and query results.
//! Uses moka for TTL-based caching with LRU eviction.
//!
//! Entries live in named groups. Query results are stored with the "incremented"
//! pattern: the key embeds the group's current generation, so bumping the
//! generation retires every cached query of that group at once while the stale
//! entries simply age out of the cache.

use crate::app_config::CacheConfig;
use crate::orm::videos;
use dashmap::DashMap;
use moka::sync::Cache;
use std::time::Duration;

/// Values the video repository keeps in the object cache.
#[derive(Clone, Debug, PartialEq)]
pub enum CachedValue {
    Ids(Vec<i32>),
    Count(i64),
    Video(videos::Model),
}

/// Partitioned keyed cache with per-group generation counters.
pub struct ObjectCache {
    entries: Cache<String, CachedValue>,
    generations: DashMap<String, u64>,
}

impl ObjectCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(Duration::from_secs(config.ttl_seconds))
                .max_capacity(config.max_capacity)
                .build(),
            generations: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str, group: &str) -> Option<CachedValue> {
        self.entries.get(&entry_key(group, key))
    }

    pub fn set(&self, key: &str, group: &str, value: CachedValue) {
        self.entries.insert(entry_key(group, key), value);
    }

    pub fn delete(&self, key: &str, group: &str) {
        self.entries.invalidate(&entry_key(group, key));
    }

    /// Current generation of a group. Groups start at zero.
    pub fn generation(&self, group: &str) -> u64 {
        self.generations.get(group).map(|g| *g).unwrap_or(0)
    }

    /// Look up a cached query result. `query` is usually the literal SQL text.
    pub fn get_incremented(&self, query: &str, group: &str) -> Option<CachedValue> {
        self.entries
            .get(&incremented_key(group, query, self.generation(group)))
    }

    pub fn set_incremented(&self, query: &str, group: &str, value: CachedValue) {
        let key = incremented_key(group, query, self.generation(group));
        self.entries.insert(key, value);
    }

    /// Retire every incremented entry of `group`.
    pub fn invalidate_group(&self, group: &str) {
        let mut generation = self.generations.entry(group.to_string()).or_insert(0);
        *generation += 1;
        log::debug!("cache group {} moved to generation {}", group, *generation);
    }

    /// Ids from `ids` that have no per-record entry in `group`.
    pub fn non_cached_ids(&self, ids: &[i32], group: &str) -> Vec<i32> {
        ids.iter()
            .copied()
            .filter(|id| self.get(&id.to_string(), group).is_none())
            .collect()
    }
}

fn entry_key(group: &str, key: &str) -> String {
    format!("{}:{}", group, key)
}

fn incremented_key(group: &str, query: &str, generation: u64) -> String {
    format!(
        "{}:q{}:{}",
        group,
        generation,
        blake3::hash(query.as_bytes()).to_hex()
    )
}
