//! C4: the ingest ledger, a single table colocated with the per-collection
//! pointer DB (the same DuckDB file C6/C7 later write their row-group index
//! into). Two operations: check whether a shard was already ingested at its
//! current size/mtime, and record a completed ingest. `record` is only ever
//! called after the shard's data has been durably committed — that's what
//! makes crash-during-ingest safe: an unfinished shard is simply absent from
//! the ledger and gets retried on the next run.

use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use duckdb::{params, Connection};

fn create_table() -> &'static str {
    "CREATE TABLE IF NOT EXISTS ingest_ledger (
       shard_path VARCHAR PRIMARY KEY,
       size_bytes BIGINT NOT NULL,
       mtime_ns BIGINT NOT NULL,
       ingested_at VARCHAR NOT NULL,
       rows BIGINT NOT NULL
     )"
}

/// A shard's size and modification time, as recorded in (or compared
/// against) the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardStat {
    pub size_bytes: i64,
    pub mtime_ns: i64,
}

impl ShardStat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
        let mtime_ns = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0);
        Ok(ShardStat {
            size_bytes: meta.len() as i64,
            mtime_ns,
        })
    }
}

pub struct IngestLedger {
    conn: Connection,
}

impl IngestLedger {
    /// Open (creating if absent) the ledger table inside the per-collection
    /// DuckDB file at `collection_db_path`.
    pub fn open(collection_db_path: &Path) -> Result<Self> {
        if let Some(parent) = collection_db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let conn = Connection::open(collection_db_path)
            .with_context(|| format!("opening {}", collection_db_path.display()))?;
        conn.execute_batch(create_table()).context("creating ingest_ledger table")?;
        Ok(Self { conn })
    }

    /// True iff `shard_path` was previously recorded with this exact
    /// size/mtime — an unchanged shard is skipped on resume.
    pub fn already_ingested(&self, shard_path: &str, stat: ShardStat) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM ingest_ledger WHERE shard_path = ? AND size_bytes = ? AND mtime_ns = ?",
            params![shard_path, stat.size_bytes, stat.mtime_ns],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Record a completed ingest. Idempotent: replaces any prior row for the
    /// same `shard_path` via delete-then-insert in one transaction.
    pub fn record(&self, shard_path: &str, stat: ShardStat, rows: i64) -> Result<()> {
        self.conn.execute_batch("BEGIN TRANSACTION;")?;
        self.conn.execute("DELETE FROM ingest_ledger WHERE shard_path = ?", params![shard_path])?;
        self.conn.execute(
            "INSERT INTO ingest_ledger (shard_path, size_bytes, mtime_ns, ingested_at, rows)
             VALUES (?, ?, ?, ?, ?)",
            params![shard_path, stat.size_bytes, stat.mtime_ns, chrono::Utc::now().to_rfc3339(), rows],
        )?;
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn unrecorded_shard_is_not_ingested() {
        let dir = TempDir::new().unwrap();
        let ledger = IngestLedger::open(&dir.path().join("c.duckdb")).unwrap();
        let stat = ShardStat { size_bytes: 100, mtime_ns: 1 };
        assert!(!ledger.already_ingested("cdx-0.gz", stat).unwrap());
    }

    #[test]
    fn recorded_shard_with_matching_stat_is_ingested() {
        let dir = TempDir::new().unwrap();
        let ledger = IngestLedger::open(&dir.path().join("c.duckdb")).unwrap();
        let stat = ShardStat { size_bytes: 100, mtime_ns: 1 };
        ledger.record("cdx-0.gz", stat, 42).unwrap();
        assert!(ledger.already_ingested("cdx-0.gz", stat).unwrap());
    }

    #[test]
    fn changed_stat_is_treated_as_not_ingested() {
        let dir = TempDir::new().unwrap();
        let ledger = IngestLedger::open(&dir.path().join("c.duckdb")).unwrap();
        ledger.record("cdx-0.gz", ShardStat { size_bytes: 100, mtime_ns: 1 }, 42).unwrap();
        let changed = ShardStat { size_bytes: 200, mtime_ns: 1 };
        assert!(!ledger.already_ingested("cdx-0.gz", changed).unwrap());
    }

    #[test]
    fn record_is_idempotent_on_rerun() {
        let dir = TempDir::new().unwrap();
        let ledger = IngestLedger::open(&dir.path().join("c.duckdb")).unwrap();
        let stat = ShardStat { size_bytes: 100, mtime_ns: 1 };
        ledger.record("cdx-0.gz", stat, 10).unwrap();
        ledger.record("cdx-0.gz", stat, 10).unwrap();
        let count: i64 = ledger
            .conn
            .query_row("SELECT COUNT(*) FROM ingest_ledger WHERE shard_path = ?", params!["cdx-0.gz"], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
