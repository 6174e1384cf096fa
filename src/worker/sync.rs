//! Background sync: replay writes queued while offline.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::messages::Broadcast;
use super::OfflineWorker;
use crate::cache::CacheStore;
use crate::db::Database;
use crate::net::{Fetcher, Request};

const SYNC_COMPLETE_MESSAGE: &str = "Bookings synced successfully";

/// A mutation that has not been acknowledged by the server yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
  /// Locally generated; the server can use it to dedupe replays
  pub id: String,
  pub payload: serde_json::Value,
  pub queued_at: DateTime<Utc>,
}

impl PendingWrite {
  pub fn new(payload: serde_json::Value) -> Self {
    Self {
      id: local_id(),
      payload,
      queued_at: Utc::now(),
    }
  }
}

fn local_id() -> String {
  static SEQ: AtomicU64 = AtomicU64::new(0);
  format!(
    "pw-{}-{}",
    Utc::now().timestamp_millis(),
    SEQ.fetch_add(1, Ordering::SeqCst)
  )
}

/// Queue of pending writes, in the order they were made.
pub trait PendingStore: Send + Sync {
  fn list_pending(&self) -> Result<Vec<PendingWrite>>;

  fn remove(&self, id: &str) -> Result<()>;

  /// Queue a new write and return it with its generated id.
  fn enqueue(&self, payload: serde_json::Value) -> Result<PendingWrite>;
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
  pub attempted: usize,
  pub delivered: usize,
  /// Still queued for the next sync opportunity
  pub remaining: usize,
}

#[derive(Default)]
pub struct MemoryPendingStore {
  queue: Mutex<VecDeque<PendingWrite>>,
}

impl MemoryPendingStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl PendingStore for MemoryPendingStore {
  fn list_pending(&self) -> Result<Vec<PendingWrite>> {
    let queue = self
      .queue
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(queue.iter().cloned().collect())
  }

  fn remove(&self, id: &str) -> Result<()> {
    let mut queue = self
      .queue
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    queue.retain(|write| write.id != id);
    Ok(())
  }

  fn enqueue(&self, payload: serde_json::Value) -> Result<PendingWrite> {
    let write = PendingWrite::new(payload);
    let mut queue = self
      .queue
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    queue.push_back(write.clone());
    Ok(write)
  }
}

impl PendingStore for Database {
  fn list_pending(&self) -> Result<Vec<PendingWrite>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare("SELECT id, payload, queued_at FROM pending_writes ORDER BY seq")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let rows = stmt
      .query_map([], |row| {
        Ok((
          row.get::<_, String>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, String>(2)?,
        ))
      })
      .map_err(|e| eyre!("Failed to query pending writes: {}", e))?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read pending write: {}", e))?;

    rows
      .into_iter()
      .map(|(id, payload, queued_at)| {
        let payload = serde_json::from_str(&payload)
          .map_err(|e| eyre!("Failed to deserialize pending write {}: {}", id, e))?;
        let queued_at = DateTime::parse_from_rfc3339(&queued_at)
          .map_err(|e| eyre!("Failed to parse queued_at of {}: {}", id, e))?
          .with_timezone(&Utc);
        Ok(PendingWrite {
          id,
          payload,
          queued_at,
        })
      })
      .collect()
  }

  fn remove(&self, id: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute("DELETE FROM pending_writes WHERE id = ?", params![id])
      .map_err(|e| eyre!("Failed to remove pending write {}: {}", id, e))?;
    Ok(())
  }

  fn enqueue(&self, payload: serde_json::Value) -> Result<PendingWrite> {
    let write = PendingWrite::new(payload);
    let payload = serde_json::to_string(&write.payload)
      .map_err(|e| eyre!("Failed to serialize pending write: {}", e))?;

    let conn = self.lock()?;
    conn
      .execute(
        "INSERT INTO pending_writes (id, payload, queued_at) VALUES (?, ?, ?)",
        params![write.id, payload, write.queued_at.to_rfc3339()],
      )
      .map_err(|e| eyre!("Failed to queue pending write: {}", e))?;

    Ok(write)
  }
}

impl<S: CacheStore, F: Fetcher> OfflineWorker<S, F> {
  /// Handle a sync event. Only the configured tag triggers a replay.
  pub async fn handle_sync(&self, tag: &str) -> Result<Option<SyncReport>> {
    info!(tag, "Background sync");
    if tag != self.settings.sync_tag {
      debug!(tag, "Ignoring unknown sync tag");
      return Ok(None);
    }
    self.sync_pending_writes().await.map(Some)
  }

  /// Replay every queued write in order.
  ///
  /// Delivery is at-least-once: an acknowledged write that fails to leave
  /// the queue is replayed on the next pass. Failures stay queued. A
  /// completion broadcast goes out after any non-empty pass.
  pub async fn sync_pending_writes(&self) -> Result<SyncReport> {
    let pending = self.pending.list_pending().map_err(|e| {
      error!("Sync failed: {}", e);
      e
    })?;

    if pending.is_empty() {
      debug!("Nothing to sync");
      return Ok(SyncReport::default());
    }

    let mut report = SyncReport {
      attempted: pending.len(),
      ..SyncReport::default()
    };

    for write in &pending {
      let request = Request::post_json(self.settings.sync_endpoint.clone(), &write.payload)?;
      match self.fetcher.fetch(&request).await {
        Ok(response) if response.is_ok() => {
          if let Err(e) = self.pending.remove(&write.id) {
            warn!(id = %write.id, "Delivered but could not dequeue: {}", e);
          }
          report.delivered += 1;
        }
        Ok(response) => {
          warn!(id = %write.id, status = response.status, "Server rejected pending write");
          report.remaining += 1;
        }
        Err(e) => {
          warn!(id = %write.id, "Pending write not delivered: {}", e);
          report.remaining += 1;
        }
      }
    }

    let notified = self.broadcast(Broadcast::SyncComplete {
      message: SYNC_COMPLETE_MESSAGE.to_string(),
    });
    info!(
      delivered = report.delivered,
      remaining = report.remaining,
      notified,
      "Sync complete"
    );

    Ok(report)
  }
}
