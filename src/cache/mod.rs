//! Versioned cache partitions for offline support.
//!
//! This module provides the storage side of the offline cache manager:
//! - Named partitions (static, dynamic, images) suffixed with a generation token
//! - Response snapshots keyed by request identity (method + URL)
//! - All-or-nothing batch writes for install-time manifests
//! - Backends: SQLite, in-memory, and a no-op store when caching is disabled

mod memory;
mod partition;
mod storage;
mod traits;

pub use memory::MemoryStore;
pub use partition::{Generation, PartitionKind};
pub use storage::NoopStore;
pub use traits::{CacheStore, CachedResponse, Served, ServedFrom};
