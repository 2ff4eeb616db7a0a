//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::storage::{CacheStorage, CachedEntry};
use super::traits::{CacheResult, Invalidation, QueryKey};

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the application and the network client. Reads are
/// served from storage until the entry is invalidated or expires; every
/// invalidation bumps an epoch that views watch to know when to refetch.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  /// How long before cached data is considered expired
  stale_time: Duration,
  /// Per-key locks making reads of the same key single-flight
  in_flight: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
  epoch: Arc<watch::Sender<u64>>,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    let (epoch, _) = watch::channel(0);
    Self {
      storage: Arc::new(storage),
      stale_time: Duration::minutes(5),
      in_flight: Arc::new(Mutex::new(HashMap::new())),
      epoch: Arc::new(epoch),
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Current invalidation epoch.
  pub fn epoch(&self) -> u64 {
    *self.epoch.borrow()
  }

  /// Receiver that changes whenever anything is invalidated or cleared.
  pub fn subscribe(&self) -> watch::Receiver<u64> {
    self.epoch.subscribe()
  }

  fn is_expired(&self, entry: &CachedEntry) -> bool {
    Utc::now() - entry.cached_at > self.stale_time
  }

  fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
    match self.in_flight.lock() {
      Ok(mut locks) => locks.entry(key.to_string()).or_default().clone(),
      // A poisoned map only loses deduplication
      Err(_) => Arc::new(tokio::sync::Mutex::new(())),
    }
  }

  fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Option<(T, CachedEntry)> {
    let entry = match self.storage.get(key) {
      Ok(entry) => entry?,
      Err(e) => {
        warn!(key, error = %e, "cache read failed");
        return None;
      }
    };
    match serde_json::from_slice(&entry.data) {
      Ok(data) => Some((data, entry)),
      Err(e) => {
        // Shape changed between versions; treat as a miss
        debug!(key, error = %e, "discarding undecodable cache entry");
        None
      }
    }
  }

  fn write_entry<T: Serialize>(&self, key: &str, description: &str, data: &T) {
    let result = serde_json::to_vec(data)
      .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize {}: {}", description, e))
      .and_then(|bytes| self.storage.put(key, description, &bytes));
    if let Err(e) = result {
      warn!(key, error = %e, "cache write failed");
    }
  }

  /// Read through the cache.
  ///
  /// 1. Valid entry (not invalidated, not expired) - return it
  /// 2. Otherwise fetch from network and store the result
  /// 3. On network failure, return an expired entry (offline mode); an
  ///    invalidated entry is never served
  ///
  /// A result fetched while an invalidation happened is stored already
  /// stale, so the next read goes back to the network.
  pub async fn fetch<T, E, F, Fut>(&self, key: &impl QueryKey, fetcher: F) -> Result<CacheResult<T>, E>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let cache_key = key.cache_key();
    let lock = self.key_lock(&cache_key);
    let _guard = lock.lock().await;

    let cached = match self.read_entry::<T>(&cache_key) {
      Some((data, entry)) if !entry.invalidated && !self.is_expired(&entry) => {
        return Ok(CacheResult::from_cache(data, entry.cached_at));
      }
      other => other,
    };

    let epoch_before = self.epoch();
    match fetcher().await {
      Ok(data) => {
        self.write_entry(&cache_key, &key.description(), &data);
        if self.epoch() != epoch_before {
          debug!(key = %cache_key, "invalidated while fetching, storing as stale");
          if let Err(e) = self.storage.invalidate(&Invalidation::Key(cache_key.clone())) {
            warn!(key = %cache_key, error = %e, "cache invalidation failed");
          }
        }
        Ok(CacheResult::from_network(data))
      }
      Err(e) => match cached {
        Some((data, entry)) if !entry.invalidated => {
          warn!(key = %cache_key, "network unavailable, serving expired cache entry");
          Ok(CacheResult::offline(data, entry.cached_at))
        }
        _ => Err(e),
      },
    }
  }

  /// Mark entries stale so the next read of each goes to the network.
  pub fn invalidate(&self, scopes: &[Invalidation]) {
    for scope in scopes {
      match self.storage.invalidate(scope) {
        Ok(touched) => debug!(?scope, touched, "invalidated cache entries"),
        Err(e) => warn!(?scope, error = %e, "cache invalidation failed"),
      }
    }
    self.epoch.send_modify(|epoch| *epoch += 1);
  }

  /// Drop everything, e.g. when the session ends.
  pub fn clear(&self) {
    if let Err(e) = self.storage.clear() {
      warn!(error = %e, "failed to clear cache");
    }
    self.epoch.send_modify(|epoch| *epoch += 1);
  }

  /// Whether a valid entry exists for `key`.
  pub fn is_cached(&self, key: &impl QueryKey) -> bool {
    match self.storage.get(&key.cache_key()) {
      Ok(Some(entry)) => !entry.invalidated && !self.is_expired(&entry),
      _ => false,
    }
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      stale_time: self.stale_time,
      in_flight: Arc::clone(&self.in_flight),
      epoch: Arc::clone(&self.epoch),
    }
  }
}
