//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use color_eyre::Result;

use crate::net::{RequestKey, ResponseSnapshot};

/// A response read back from a partition.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  pub response: ResponseSnapshot,
  /// When the snapshot was stored
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Implementations must serialize concurrent access to the same key;
/// callers never lock around a store.
pub trait CacheStore: Send + Sync {
  /// Names of every partition in the store, including ones this manager does not own.
  fn partitions(&self) -> Result<Vec<String>>;

  /// Create the partition if it does not exist yet.
  fn open_partition(&self, name: &str) -> Result<()>;

  /// Delete a partition and all its entries. Returns false if it did not exist.
  fn delete_partition(&self, name: &str) -> Result<bool>;

  /// Look up a request in one partition.
  fn get(&self, partition: &str, key: &RequestKey) -> Result<Option<CachedResponse>>;

  /// Store (or replace) a single snapshot. Opens the partition if needed.
  fn put(&self, partition: &str, key: &RequestKey, response: &ResponseSnapshot) -> Result<()>;

  /// Store a batch of snapshots. Either every entry becomes visible or none does.
  fn put_all(&self, partition: &str, entries: &[(RequestKey, ResponseSnapshot)]) -> Result<()>;
}

/// A response handed back to the consumer, with where it came from.
#[derive(Debug, Clone)]
pub struct Served {
  /// The actual response
  pub response: ResponseSnapshot,
  /// Where the response came from
  pub source: ServedFrom,
  /// When the response was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl Served {
  /// Fresh data from the network.
  pub fn from_network(response: ResponseSnapshot) -> Self {
    Self {
      response,
      source: ServedFrom::Network,
      cached_at: None,
    }
  }

  /// A stored snapshot. `offline` marks a network-first fallback.
  pub fn from_cache(cached: CachedResponse, offline: bool) -> Self {
    Self {
      response: cached.response,
      source: if offline {
        ServedFrom::Offline
      } else {
        ServedFrom::Cache
      },
      cached_at: Some(cached.cached_at),
    }
  }

  /// The offline fallback document.
  pub fn fallback_page(cached: CachedResponse) -> Self {
    Self {
      response: cached.response,
      source: ServedFrom::FallbackPage,
      cached_at: Some(cached.cached_at),
    }
  }

  /// A response made up locally (408 network error, 404 image).
  pub fn synthetic(response: ResponseSnapshot) -> Self {
    Self {
      response,
      source: ServedFrom::Synthetic,
      cached_at: None,
    }
  }
}

/// Indicates where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
  /// Fresh data from network
  Network,
  /// Cache hit on a cache-first route
  Cache,
  /// Network unavailable, serving the last stored snapshot
  Offline,
  /// Network unavailable and nothing cached, serving the offline document
  FallbackPage,
  /// Locally generated error response
  Synthetic,
}
