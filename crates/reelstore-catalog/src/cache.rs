//! Two-tier (memory + SQLite) response cache with a fixed TTL.
//!
//! Every key type is bound to exactly one value type through [`CacheKey`],
//! so a `movie_details` entry can never be read back as a page.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use reelstore_api::tmdb::{MovieSort, TmdbMovieDetails};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::movie::MoviePage;

/// Prefix shared by every key this crate persists.
pub const CACHE_KEY_PREFIX: &str = "tmdb_cache_";

/// How long an entry stays fresh.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Type tag embedded in the storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheNamespace {
    /// Full movie details with release dates.
    MovieDetails,
    /// Basic discover page.
    DiscoverPage,
    /// Basic search page.
    SearchPage,
}

impl CacheNamespace {
    /// Returns the tag used in storage keys.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::MovieDetails => "movie_details",
            Self::DiscoverPage => "discover_page",
            Self::SearchPage => "search_page",
        }
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A typed cache key.
pub trait CacheKey {
    /// Value stored under this kind of key.
    type Value: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Namespace every key of this type lives in.
    const NAMESPACE: CacheNamespace;

    /// Distinguishes keys within the namespace.
    fn discriminator(&self) -> String;

    /// Full storage key: prefix, tag, `_`, discriminator.
    fn storage_key(&self) -> String {
        format!(
            "{CACHE_KEY_PREFIX}{}_{}",
            Self::NAMESPACE.tag(),
            self.discriminator()
        )
    }
}

/// Key for a movie's details, by TMDB ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MovieDetailsKey(pub u64);

impl CacheKey for MovieDetailsKey {
    type Value = TmdbMovieDetails;
    const NAMESPACE: CacheNamespace = CacheNamespace::MovieDetails;

    fn discriminator(&self) -> String {
        self.0.to_string()
    }
}

/// Key for a basic discover page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscoverPageKey {
    /// Page number.
    pub page: u32,
    /// Genre filter.
    pub genre: Option<u32>,
    /// Sort order.
    pub sort: MovieSort,
}

impl CacheKey for DiscoverPageKey {
    type Value = MoviePage;
    const NAMESPACE: CacheNamespace = CacheNamespace::DiscoverPage;

    fn discriminator(&self) -> String {
        let genre = self
            .genre
            .map_or_else(|| String::from("all"), |g| g.to_string());
        format!("{}_{genre}_{}", self.page, self.sort)
    }
}

/// Key for a basic search page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchPageKey {
    /// Search query as entered.
    pub query: String,
    /// Page number.
    pub page: u32,
}

impl CacheKey for SearchPageKey {
    type Value = MoviePage;
    const NAMESPACE: CacheNamespace = CacheNamespace::SearchPage;

    fn discriminator(&self) -> String {
        format!("{}_{}", self.query, self.page)
    }
}

/// A cached value and the Unix epoch milliseconds it was stored at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Cached value.
    pub data: T,
    /// Store time in Unix epoch milliseconds.
    pub timestamp: i64,
}

impl<T> CacheEntry<T> {
    /// Returns whether the entry is younger than [`CACHE_TTL`] at `now_ms`.
    #[must_use]
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) < ttl_millis()
    }
}

type StoredValue = Arc<dyn Any + Send + Sync>;

/// Memory-first cache with an optional SQLite tier.
///
/// Persistent-tier failures never surface from reads or writes; they are
/// logged at `debug` and treated as misses.
pub struct CacheStore {
    memory: Mutex<HashMap<String, CacheEntry<StoredValue>>>,
    persistent: Option<Mutex<Connection>>,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("persistent", &self.persistent.is_some())
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Creates a cache that lives only for the current process.
    #[must_use]
    pub fn memory_only() -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            persistent: None,
        }
    }

    /// Creates a cache backed by a migrated SQLite connection.
    #[must_use]
    pub fn with_connection(conn: Connection) -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            persistent: Some(Mutex::new(conn)),
        }
    }

    /// Returns whether a persistent tier is attached.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.persistent.is_some()
    }

    /// Looks up a fresh value.
    ///
    /// Fresh persistent hits are promoted to memory with their original
    /// timestamp; stale persistent hits are deleted.
    pub fn get<K: CacheKey>(&self, key: &K) -> Option<K::Value> {
        let storage_key = key.storage_key();
        let now = now_millis();

        if let Some(value) = self.memory_get::<K::Value>(&storage_key, now) {
            tracing::debug!(key = %storage_key, "cache hit (memory)");
            return Some(value);
        }

        let Some(entry) = self.persistent_get::<K::Value>(&storage_key, now) else {
            tracing::debug!(key = %storage_key, "cache miss");
            return None;
        };

        tracing::debug!(key = %storage_key, "cache hit (persistent)");
        self.memory_insert(storage_key, entry.data.clone(), entry.timestamp);
        Some(entry.data)
    }

    /// Returns whether a fresh value exists for `key`.
    pub fn contains<K: CacheKey>(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Stores `value` under `key` with the current time.
    pub fn set<K: CacheKey>(&self, key: &K, value: K::Value) {
        self.insert_entry(key, value, now_millis());
    }

    /// Drops every in-memory entry and every persisted `tmdb_cache_` key.
    ///
    /// Returns the number of persisted rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted rows cannot be deleted.
    pub fn clear(&self) -> Result<usize> {
        self.lock_memory().clear();

        let Some(persistent) = &self.persistent else {
            return Ok(0);
        };
        let conn = persistent.lock().unwrap_or_else(PoisonError::into_inner);
        let removed = reelstore_db::delete_entries_with_prefix(&conn, CACHE_KEY_PREFIX)
            .context("failed to clear persisted cache entries")?;
        tracing::debug!(removed, "cache cleared");
        Ok(removed)
    }

    fn insert_entry<K: CacheKey>(&self, key: &K, value: K::Value, timestamp: i64) {
        let storage_key = key.storage_key();
        self.persistent_set(&storage_key, &value, timestamp);
        self.memory_insert(storage_key, value, timestamp);
    }

    fn lock_memory(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry<StoredValue>>> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn memory_get<V: Clone + 'static>(&self, storage_key: &str, now: i64) -> Option<V> {
        let mut memory = self.lock_memory();
        if let Some(entry) = memory.get(storage_key)
            && entry.is_fresh(now)
        {
            return entry.data.downcast_ref::<V>().cloned();
        }
        memory.remove(storage_key);
        None
    }

    fn memory_insert<V: Send + Sync + 'static>(&self, storage_key: String, value: V, timestamp: i64) {
        let entry = CacheEntry {
            data: Arc::new(value) as StoredValue,
            timestamp,
        };
        self.lock_memory().insert(storage_key, entry);
    }

    fn persistent_get<V: DeserializeOwned>(
        &self,
        storage_key: &str,
        now: i64,
    ) -> Option<CacheEntry<V>> {
        let conn = self
            .persistent
            .as_ref()?
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let payload = match reelstore_db::load_entry(&conn, storage_key) {
            Ok(payload) => payload?,
            Err(e) => {
                tracing::debug!(key = %storage_key, error = %e, "persistent cache read failed");
                return None;
            }
        };

        let entry: CacheEntry<V> = match serde_json::from_str(&payload) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(key = %storage_key, error = %e, "discarding corrupt cache payload");
                return None;
            }
        };

        if entry.is_fresh(now) {
            return Some(entry);
        }

        if let Err(e) = reelstore_db::delete_entry(&conn, storage_key) {
            tracing::debug!(key = %storage_key, error = %e, "failed to evict stale cache entry");
        }
        None
    }

    fn persistent_set<V: Serialize>(&self, storage_key: &str, value: &V, timestamp: i64) {
        let Some(persistent) = &self.persistent else {
            return;
        };

        let payload = match serde_json::to_string(&CacheEntry {
            data: value,
            timestamp,
        }) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(key = %storage_key, error = %e, "failed to encode cache payload");
                return;
            }
        };

        let conn = persistent.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = reelstore_db::save_entry(&conn, storage_key, &payload) {
            tracing::debug!(key = %storage_key, error = %e, "persistent cache write failed");
        }
    }
}

fn ttl_millis() -> i64 {
    i64::try_from(CACHE_TTL.as_millis()).unwrap_or(i64::MAX)
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
