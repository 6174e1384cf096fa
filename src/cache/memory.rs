//! In-process `CacheStore`, used by tests.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::traits::{CacheStore, CachedResponse};
use crate::net::{RequestKey, ResponseSnapshot};

type Partition = BTreeMap<String, CachedResponse>;

#[derive(Default)]
pub struct MemoryStore {
  partitions: Mutex<BTreeMap<String, Partition>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of entries in a partition (0 if it does not exist).
  pub fn entry_count(&self, partition: &str) -> usize {
    self
      .partitions
      .lock()
      .map(|p| p.get(partition).map_or(0, BTreeMap::len))
      .unwrap_or(0)
  }

  fn with<R>(&self, f: impl FnOnce(&mut BTreeMap<String, Partition>) -> R) -> Result<R> {
    let mut partitions = self
      .partitions
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(f(&mut partitions))
  }
}

impl CacheStore for MemoryStore {
  fn partitions(&self) -> Result<Vec<String>> {
    self.with(|p| p.keys().cloned().collect())
  }

  fn open_partition(&self, name: &str) -> Result<()> {
    self.with(|p| {
      p.entry(name.to_string()).or_default();
    })
  }

  fn delete_partition(&self, name: &str) -> Result<bool> {
    self.with(|p| p.remove(name).is_some())
  }

  fn get(&self, partition: &str, key: &RequestKey) -> Result<Option<CachedResponse>> {
    self.with(|p| {
      p.get(partition)
        .and_then(|entries| entries.get(key.hash()))
        .cloned()
    })
  }

  fn put(&self, partition: &str, key: &RequestKey, response: &ResponseSnapshot) -> Result<()> {
    self.put_all(partition, &[(key.clone(), response.clone())])
  }

  fn put_all(&self, partition: &str, entries: &[(RequestKey, ResponseSnapshot)]) -> Result<()> {
    // Everything happens under one lock, so the batch is atomic.
    self.with(|p| {
      let target = p.entry(partition.to_string()).or_default();
      let cached_at = Utc::now();
      for (key, response) in entries {
        target.insert(
          key.hash().to_string(),
          CachedResponse {
            response: response.clone(),
            cached_at,
          },
        );
      }
    })
  }
}
