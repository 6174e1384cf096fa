//! SQLite and no-op implementations of `CacheStore`.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};

use super::traits::{CacheStore, CachedResponse};
use crate::db::{parse_datetime, Database};
use crate::net::{RequestKey, ResponseSnapshot};

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStore;

impl CacheStore for NoopStore {
  fn partitions(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }

  fn open_partition(&self, _name: &str) -> Result<()> {
    Ok(())
  }

  fn delete_partition(&self, _name: &str) -> Result<bool> {
    Ok(false)
  }

  fn get(&self, _partition: &str, _key: &RequestKey) -> Result<Option<CachedResponse>> {
    Ok(None) // Always miss
  }

  fn put(&self, _partition: &str, _key: &RequestKey, _response: &ResponseSnapshot) -> Result<()> {
    Ok(()) // Discard
  }

  fn put_all(&self, _partition: &str, _entries: &[(RequestKey, ResponseSnapshot)]) -> Result<()> {
    Ok(()) // Discard
  }
}

impl CacheStore for Database {
  fn partitions(&self) -> Result<Vec<String>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare("SELECT name FROM partitions ORDER BY created_at, name")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get::<_, String>(0))
      .map_err(|e| eyre!("Failed to list partitions: {}", e))?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read partition name: {}", e))?;

    Ok(names)
  }

  fn open_partition(&self, name: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute(
        "INSERT OR IGNORE INTO partitions (name) VALUES (?)",
        params![name],
      )
      .map_err(|e| eyre!("Failed to open partition {}: {}", name, e))?;
    Ok(())
  }

  fn delete_partition(&self, name: &str) -> Result<bool> {
    let mut conn = self.lock()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute("DELETE FROM entries WHERE partition = ?", params![name])
      .map_err(|e| eyre!("Failed to delete entries of {}: {}", name, e))?;
    let removed = tx
      .execute("DELETE FROM partitions WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete partition {}: {}", name, e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(removed > 0)
  }

  fn get(&self, partition: &str, key: &RequestKey) -> Result<Option<CachedResponse>> {
    let conn = self.lock()?;

    let row: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT data, cached_at FROM entries WHERE partition = ? AND request_key = ?",
        params![partition, key.hash()],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query {}: {}", key.identity(), e))?;

    match row {
      Some((data, cached_at_str)) => {
        let response: ResponseSnapshot = serde_json::from_slice(&data)
          .map_err(|e| eyre!("Failed to deserialize response: {}", e))?;
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(CachedResponse {
          response,
          cached_at,
        }))
      }
      None => Ok(None),
    }
  }

  fn put(&self, partition: &str, key: &RequestKey, response: &ResponseSnapshot) -> Result<()> {
    self.put_all(partition, &[(key.clone(), response.clone())])
  }

  fn put_all(&self, partition: &str, entries: &[(RequestKey, ResponseSnapshot)]) -> Result<()> {
    let mut conn = self.lock()?;

    // Dropping the transaction without commit rolls back, so a failed
    // entry leaves the partition exactly as it was.
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "INSERT OR IGNORE INTO partitions (name) VALUES (?)",
      params![partition],
    )
    .map_err(|e| eyre!("Failed to open partition {}: {}", partition, e))?;

    for (key, response) in entries {
      let data =
        serde_json::to_vec(response).map_err(|e| eyre!("Failed to serialize response: {}", e))?;

      tx.execute(
        "INSERT OR REPLACE INTO entries (partition, request_key, identity, data, cached_at)
         VALUES (?, ?, ?, ?, datetime('now'))",
        params![partition, key.hash(), key.identity(), data],
      )
      .map_err(|e| eyre!("Failed to store {}: {}", key.identity(), e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }
}
