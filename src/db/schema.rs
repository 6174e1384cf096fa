/// Schema for the cache partitions and the pending-write queue.
pub const SCHEMA: &str = r#"
-- Named cache partitions, e.g. "freightflow-v1.0.0-static"
CREATE TABLE IF NOT EXISTS partitions (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Response snapshots keyed by request identity hash
CREATE TABLE IF NOT EXISTS entries (
    partition TEXT NOT NULL,
    request_key TEXT NOT NULL,
    identity TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (partition, request_key)
);

CREATE INDEX IF NOT EXISTS idx_entries_key ON entries(request_key);

-- Writes made while offline, replayed in insertion order
CREATE TABLE IF NOT EXISTS pending_writes (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    payload TEXT NOT NULL,
    queued_at TEXT NOT NULL
);
"#;
