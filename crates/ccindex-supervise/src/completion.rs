//! Completion detection (C10): observable, not trust-the-exit-code. A
//! collection counts as done when its ingest ledger row count reaches the
//! number of CDXJ shards found on disk, or a recent progress snapshot says
//! the same thing.

use std::path::Path;

use ccindex_core::{read_snapshot, Paths};
use duckdb::{AccessMode, Connection};

/// Number of `cdx-*.gz` files under the collection's source directory.
pub fn expected_shard_count(paths: &Paths, collection: &str) -> usize {
    let pattern = paths.collection_source_dir(collection).join("*.gz");
    glob::glob(&pattern.to_string_lossy()).map(|entries| entries.filter_map(|e| e.ok()).count()).unwrap_or(0)
}

fn open_readonly(path: &Path) -> Option<Connection> {
    let config = duckdb::Config::default().access_mode(AccessMode::ReadOnly).ok()?;
    Connection::open_with_flags(path, config).ok()
}

/// Number of shards the ingest ledger has recorded for this collection, or
/// `None` if the per-collection DB doesn't exist yet or can't be opened
/// (e.g. the ingest child hasn't created it, or is mid-write and holds a
/// conflicting lock).
fn ledger_shard_count(collection_db_path: &Path) -> Option<i64> {
    if !collection_db_path.exists() {
        return None;
    }
    let conn = open_readonly(collection_db_path)?;
    conn.query_row("SELECT COUNT(*) FROM ingest_ledger", [], |row| row.get(0)).ok()
}

/// True iff `collection` looks done: the ledger or a recent journal snapshot
/// reports at least `expected` shards ingested.
pub fn is_completed(paths: &Paths, collection: &str) -> bool {
    let expected = expected_shard_count(paths, collection);
    if expected == 0 {
        return false;
    }

    if let Some(count) = ledger_shard_count(&paths.collection_db(collection)) {
        if count as usize >= expected {
            return true;
        }
    }

    if let Some(snapshot) = read_snapshot(paths, collection) {
        if snapshot.ingested_files >= expected && snapshot.last_event == "ingested" {
            return true;
        }
    }

    false
}
