//! C11: the progress journal. One file per shard key, atomic temp-file +
//! rename, best-effort only — a failure to write a snapshot never fails the
//! caller's run. Readers tolerate a missing or truncated file and re-check
//! on the next tick; no reader ever locks it.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::paths::Paths;

/// Default throttle: a fast ingest loop does not thrash the filesystem with
/// one fsync-adjacent rename per shard.
pub const DEFAULT_PROGRESS_INTERVAL_SECONDS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressSnapshot {
    pub shard_key: String,
    pub ingested_files: usize,
    pub last_event: String,
    pub updated_at: String,
}

impl ProgressSnapshot {
    pub fn new(shard_key: impl Into<String>, ingested_files: usize, last_event: impl Into<String>) -> Self {
        Self {
            shard_key: shard_key.into(),
            ingested_files,
            last_event: last_event.into(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Write a snapshot to `<progress_dir>/progress_<shard_key>.json` via
/// temp-file + rename. Errors are the caller's to ignore or log — writing a
/// snapshot must never fail the ingest itself.
pub fn write_snapshot(paths: &Paths, shard_key: &str, snapshot: &ProgressSnapshot) -> std::io::Result<()> {
    let path = paths.progress_snapshot(shard_key);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

/// Read a snapshot, tolerating a missing or unparsable file by returning
/// `None` rather than an error.
pub fn read_snapshot(paths: &Paths, shard_key: &str) -> Option<ProgressSnapshot> {
    read_snapshot_at(&paths.progress_snapshot(shard_key))
}

fn read_snapshot_at(path: &Path) -> Option<ProgressSnapshot> {
    let bytes = std::fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Throttles snapshot writes to at most once per `interval`, so a caller can
/// call [`ProgressJournal::maybe_write`] after every shard without thrashing
/// the filesystem.
pub struct ProgressJournal {
    interval: Duration,
    last_written: Mutex<Option<Instant>>,
}

impl ProgressJournal {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_written: Mutex::new(None),
        }
    }

    pub fn with_default_interval() -> Self {
        Self::new(Duration::from_secs(DEFAULT_PROGRESS_INTERVAL_SECONDS))
    }

    /// Write `snapshot` iff the interval has elapsed since the last write, or
    /// `force` is set (used for the final snapshot on completion/interrupt,
    /// which must always land regardless of throttling).
    pub fn maybe_write(&self, paths: &Paths, shard_key: &str, snapshot: &ProgressSnapshot, force: bool) {
        let mut last = self.last_written.lock().expect("progress journal lock poisoned");
        let due = force || last.map(|t| t.elapsed() >= self.interval).unwrap_or(true);
        if !due {
            return;
        }
        if let Err(e) = write_snapshot(paths, shard_key, snapshot) {
            log::warn!("progress journal: failed to write snapshot for {shard_key}: {e}");
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths(dir: &TempDir) -> Paths {
        Paths::new(dir.path().join("ccindex"), dir.path().join("parquet"), dir.path().join("duckdb"))
    }

    #[test]
    fn missing_snapshot_reads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_snapshot(&paths(&dir), "CC-MAIN-2024-10").is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        let snap = ProgressSnapshot::new("CC-MAIN-2024-10", 42, "ingested");
        write_snapshot(&paths, "CC-MAIN-2024-10", &snap).unwrap();
        assert_eq!(read_snapshot(&paths, "CC-MAIN-2024-10"), Some(snap));
    }

    #[test]
    fn truncated_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        let path = paths.progress_snapshot("CC-MAIN-2024-10");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();
        assert!(read_snapshot(&paths, "CC-MAIN-2024-10").is_none());
    }

    #[test]
    fn journal_throttles_unless_forced() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        let journal = ProgressJournal::new(Duration::from_secs(3600));

        journal.maybe_write(&paths, "c", &ProgressSnapshot::new("c", 1, "ingested"), false);
        assert_eq!(read_snapshot(&paths, "c").unwrap().ingested_files, 1);

        journal.maybe_write(&paths, "c", &ProgressSnapshot::new("c", 2, "ingested"), false);
        assert_eq!(read_snapshot(&paths, "c").unwrap().ingested_files, 1, "throttled write must not land");

        journal.maybe_write(&paths, "c", &ProgressSnapshot::new("c", 3, "ingested"), true);
        assert_eq!(read_snapshot(&paths, "c").unwrap().ingested_files, 3, "forced write must always land");
    }
}
