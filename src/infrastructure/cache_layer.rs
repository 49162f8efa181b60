// Query cache - the client-side store of remote reads, keyed by entity kind
// and scope. Entries hold semantic JSON so snapshots restore exactly.

use lru::LruCache;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::error::{AppError, AppResult};
use crate::models::EntityKind;

/// Canonical cache key. Every reader and writer must build keys through
/// this type so invalidation and rollback reach all affected views.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    List { kind: EntityKind, scope: String },
    Detail { kind: EntityKind, id: Uuid },
}

impl QueryKey {
    pub fn list(kind: EntityKind, scope: impl Into<String>) -> Self {
        QueryKey::List {
            kind,
            scope: scope.into(),
        }
    }

    pub fn detail(kind: EntityKind, id: Uuid) -> Self {
        QueryKey::Detail { kind, id }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            QueryKey::List { kind, .. } | QueryKey::Detail { kind, .. } => *kind,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::List { kind, scope } => write!(f, "{}:list:{}", kind, scope),
            QueryKey::Detail { kind, id } => write!(f, "{}:detail:{}", kind, id),
        }
    }
}

/// Cached value with its freshness state.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Value,
    pub updated_at: Instant,
    pub invalidated: bool,
}

impl CacheEntry {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            updated_at: Instant::now(),
            invalidated: false,
        }
    }

    pub fn is_stale(&self, window: Duration) -> bool {
        self.invalidated || self.updated_at.elapsed() >= window
    }
}

struct CacheState {
    entries: LruCache<QueryKey, CacheEntry>,
    // Bumped to supersede reads that are still in flight.
    generations: HashMap<QueryKey, u64>,
}

impl CacheState {
    fn generation(&self, key: &QueryKey) -> u64 {
        self.generations.get(key).copied().unwrap_or(0)
    }
}

pub struct QueryCache {
    state: Mutex<CacheState>,
    config: CacheConfig,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.config)
            .finish()
    }
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                generations: HashMap::new(),
            }),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn window(&self, key: &QueryKey) -> Duration {
        self.config.stale_ms.for_kind(key.kind())
    }

    /// Serves a fresh entry, otherwise runs `fetcher` and stores its result.
    ///
    /// A `Transient` failure is retried once after the configured delay. If
    /// the key was cancelled while the fetch was suspended the result is not
    /// written, and whatever the cache holds now is returned instead.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn fetch_query<F, Fut>(&self, key: QueryKey, fetcher: F) -> AppResult<Value>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = AppResult<Value>>,
    {
        let window = self.window(&key);
        let generation = {
            let mut state = self.state.lock().await;
            if let Some(entry) = state.entries.get(&key) {
                if !entry.is_stale(window) {
                    debug!("cache hit");
                    return Ok(entry.data.clone());
                }
            }
            state.generation(&key)
        };

        let data = match fetcher().await {
            Err(AppError::Transient(msg)) => {
                warn!("transient read failure, retrying once: {}", msg);
                tokio::time::sleep(self.config.read_retry_delay()).await;
                fetcher().await?
            }
            other => other?,
        };

        let mut state = self.state.lock().await;
        if state.generation(&key) != generation {
            debug!("fetch superseded, discarding result");
            let current = state.entries.peek(&key).map(|entry| entry.data.clone());
            return Ok(current.unwrap_or(data));
        }
        state.entries.put(key, CacheEntry::new(data.clone()));
        Ok(data)
    }

    /// Supersedes any in-flight fetch for `key`.
    pub async fn cancel_queries(&self, key: &QueryKey) {
        let mut state = self.state.lock().await;
        *state.generations.entry(key.clone()).or_insert(0) += 1;
        debug!("cancelled in-flight reads for {}", key);
    }

    pub async fn get_query_data(&self, key: &QueryKey) -> Option<Value> {
        let state = self.state.lock().await;
        state.entries.peek(key).map(|entry| entry.data.clone())
    }

    pub async fn set_query_data(&self, key: QueryKey, data: Value) {
        let mut state = self.state.lock().await;
        state.entries.put(key, CacheEntry::new(data));
    }

    /// Applies `update` to an existing entry. Returns false when the key is
    /// not cached.
    ///
    /// The patched entry is fresh again, so reads issued while a write is in
    /// flight are served the patched data instead of refetching it away.
    pub async fn update_query_data<F>(&self, key: &QueryKey, update: F) -> AppResult<bool>
    where
        F: FnOnce(&mut Value) -> AppResult<()>,
    {
        let mut state = self.state.lock().await;
        match state.entries.get_mut(key) {
            Some(entry) => {
                let mut data = entry.data.clone();
                update(&mut data)?;
                entry.data = data;
                entry.updated_at = Instant::now();
                entry.invalidated = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Full entry, including freshness state, for snapshot and restore.
    pub async fn snapshot(&self, key: &QueryKey) -> Option<CacheEntry> {
        let state = self.state.lock().await;
        state.entries.peek(key).cloned()
    }

    pub async fn restore(&self, key: QueryKey, entry: CacheEntry) {
        let mut state = self.state.lock().await;
        state.entries.put(key, entry);
    }

    /// Marks an entry stale so the next read refetches. Reads already in
    /// flight for the key are superseded so they cannot store pre-write data.
    pub async fn invalidate(&self, key: &QueryKey) {
        let mut state = self.state.lock().await;
        *state.generations.entry(key.clone()).or_insert(0) += 1;
        if let Some(entry) = state.entries.peek_mut(key) {
            entry.invalidated = true;
            debug!("invalidated {}", key);
        }
    }

    pub async fn invalidate_kind(&self, kind: EntityKind) -> usize {
        let mut state = self.state.lock().await;
        let mut touched = Vec::new();
        for (key, entry) in state.entries.iter_mut() {
            if key.kind() == kind {
                entry.invalidated = true;
                touched.push(key.clone());
            }
        }
        let count = touched.len();
        for key in touched {
            *state.generations.entry(key).or_insert(0) += 1;
        }
        debug!("invalidated {} entries of {}", count, kind);
        count
    }

    pub async fn is_stale(&self, key: &QueryKey) -> bool {
        let state = self.state.lock().await;
        state
            .entries
            .peek(key)
            .map_or(true, |entry| entry.is_stale(self.window(key)))
    }

    pub async fn remove(&self, key: &QueryKey) -> Option<Value> {
        let mut state = self.state.lock().await;
        state.entries.pop(key).map(|entry| entry.data)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Session teardown. Reads still in flight are superseded.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        let keys: Vec<QueryKey> = state.entries.iter().map(|(key, _)| key.clone()).collect();
        for key in keys {
            state.generations.entry(key).or_insert(0);
        }
        for generation in state.generations.values_mut() {
            *generation += 1;
        }
        state.entries.clear();
        info!("query cache cleared");
    }
}
