//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};

/// A read that can be cached.
pub trait QueryKey {
  /// Stable key for this read, e.g. `/api/assets/42/details`
  fn cache_key(&self) -> String;

  /// Short description for logs (e.g. "asset 42 details")
  fn description(&self) -> String;
}

/// Which cached entries an invalidation marks stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Invalidation {
  /// Exactly this key
  Key(String),
  /// Every key starting with this prefix
  Prefix(String),
}

impl Invalidation {
  pub fn key(key: &impl QueryKey) -> Self {
    Invalidation::Key(key.cache_key())
  }

  pub fn matches(&self, key: &str) -> bool {
    match self {
      Invalidation::Key(k) => k == key,
      Invalidation::Prefix(p) => key.starts_with(p.as_str()),
    }
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }

  /// Network unavailable, serving an expired entry.
  pub fn offline(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Valid cached entry
  Cache,
  /// Network unavailable, serving an expired entry
  Offline,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_invalidation_matching() {
    let exact = Invalidation::Key("/api/assets".to_string());
    assert!(exact.matches("/api/assets"));
    assert!(!exact.matches("/api/assets/42/details"));

    let prefix = Invalidation::Prefix("/api/assets/".to_string());
    assert!(prefix.matches("/api/assets/42/details"));
    assert!(!prefix.matches("/api/assets"));
  }
}
