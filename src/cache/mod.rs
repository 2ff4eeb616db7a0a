//! Generic caching layer for API reads.
//!
//! This module knows nothing about the maintenance API. It provides:
//! - Entries addressed by a stable key derived from the resource path
//! - Explicit invalidation by exact key or key prefix
//! - Single-flight reads, so concurrent readers of a key share one fetch
//! - Basic offline mode (serve time-expired entries when the network fails)

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, MemoryStorage, SqliteStorage};
pub use traits::{CacheResult, CacheSource, Invalidation, QueryKey};
