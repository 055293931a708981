//! Canonical on-disk layout, encoded as a first-class type rather than
//! string concatenation scattered through call sites.
//!
//! ```text
//! <ccindex_root>/<collection>/cdx-NNNNN.gz
//! <parquet_root>/cc_pointers_by_collection/<year>/<collection>/cdx-NNNNN.gz.parquet
//! <parquet_root>/cc_pointers_by_collection/<year>/<collection>/cdx-NNNNN.gz.sorted.parquet
//! <duckdb_root>/cc_pointers_by_collection/<collection>.duckdb
//! <duckdb_root>/cc_pointers_by_year/<year>.duckdb
//! <duckdb_root>/cc_pointers_master/cc_master_index.duckdb
//! <progress_dir>/progress_<shard_key>.json
//! <state_dir>/queue_state.json
//! <state_dir>/build_worker_<i>.{pid,log}
//! ```

use std::path::{Path, PathBuf};

/// The three independently-configurable roots this pipeline reads from and
/// writes to, plus progress/state directories used by the supervisor and
/// progress journal.
#[derive(Debug, Clone)]
pub struct Paths {
    pub ccindex_root: PathBuf,
    pub parquet_root: PathBuf,
    pub duckdb_root: PathBuf,
    pub progress_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl Paths {
    pub fn new(ccindex_root: impl Into<PathBuf>, parquet_root: impl Into<PathBuf>, duckdb_root: impl Into<PathBuf>) -> Self {
        let parquet_root = parquet_root.into();
        let duckdb_root = duckdb_root.into();
        Paths {
            ccindex_root: ccindex_root.into(),
            progress_dir: duckdb_root.join("progress"),
            state_dir: duckdb_root.join("state"),
            parquet_root,
            duckdb_root,
        }
    }

    /// `<ccindex_root>/<collection>/`
    pub fn collection_source_dir(&self, collection: &str) -> PathBuf {
        self.ccindex_root.join(collection)
    }

    /// `<ccindex_root>/<collection>/cdx-NNNNN.gz`
    pub fn source_shard(&self, collection: &str, shard_file: &str) -> PathBuf {
        self.collection_source_dir(collection).join(shard_file)
    }

    /// `<parquet_root>/cc_pointers_by_collection/<year>/<collection>/`
    pub fn collection_pointer_dir(&self, year: &str, collection: &str) -> PathBuf {
        self.parquet_root
            .join("cc_pointers_by_collection")
            .join(year)
            .join(collection)
    }

    /// `.../cdx-NNNNN.gz.parquet`, the unsorted columnar shard.
    pub fn unsorted_shard(&self, year: &str, collection: &str, shard_file: &str) -> PathBuf {
        self.collection_pointer_dir(year, collection)
            .join(format!("{shard_file}.parquet"))
    }

    /// `.../cdx-NNNNN.gz.sorted.parquet`, the sorted columnar shard.
    pub fn sorted_shard(&self, year: &str, collection: &str, shard_file: &str) -> PathBuf {
        self.collection_pointer_dir(year, collection)
            .join(format!("{shard_file}.sorted.parquet"))
    }

    /// Sidecar marking a shard confirmed empty: `<shard>.parquet.empty`.
    pub fn empty_marker(unsorted_shard_path: &Path) -> PathBuf {
        let mut s = unsorted_shard_path.as_os_str().to_os_string();
        s.push(".empty");
        PathBuf::from(s)
    }

    /// Sidecar marking a per-collection DB as sorted: `<collection>.duckdb.sorted`.
    pub fn sorted_marker(collection_db_path: &Path) -> PathBuf {
        let mut s = collection_db_path.as_os_str().to_os_string();
        s.push(".sorted");
        PathBuf::from(s)
    }

    /// `<duckdb_root>/cc_pointers_by_collection/<collection>.duckdb`
    pub fn collection_db(&self, collection: &str) -> PathBuf {
        self.duckdb_root
            .join("cc_pointers_by_collection")
            .join(format!("{collection}.duckdb"))
    }

    /// `<duckdb_root>/cc_pointers_by_year/<year>.duckdb`
    pub fn year_db(&self, year: &str) -> PathBuf {
        self.duckdb_root
            .join("cc_pointers_by_year")
            .join(format!("{year}.duckdb"))
    }

    /// `<duckdb_root>/cc_pointers_master/cc_master_index.duckdb`
    pub fn master_db(&self) -> PathBuf {
        self.duckdb_root
            .join("cc_pointers_master")
            .join("cc_master_index.duckdb")
    }

    /// `<progress_dir>/progress_<shard_key>.json`
    pub fn progress_snapshot(&self, shard_key: &str) -> PathBuf {
        self.progress_dir.join(format!("progress_{shard_key}.json"))
    }

    /// `<state_dir>/queue_state.json`
    pub fn queue_state(&self) -> PathBuf {
        self.state_dir.join("queue_state.json")
    }

    /// `<state_dir>/build_worker_<i>.log`
    pub fn worker_log(&self, worker_index: usize) -> PathBuf {
        self.state_dir.join(format!("build_worker_{worker_index}.log"))
    }

    /// `<state_dir>/build_worker_<i>.pid`
    pub fn worker_pid_file(&self, worker_index: usize) -> PathBuf {
        self.state_dir.join(format!("build_worker_{worker_index}.pid"))
    }

    /// Resolve the directory a collection's shards actually live in, trying
    /// the canonical `cc_pointers_by_collection/<year>/<collection>` layout
    /// first, then `<parquet_root>/<year>/<collection>`, then
    /// `<parquet_root>/<collection>`. Returns the first one that exists, or
    /// the canonical path if none do (so callers get a sensible error on
    /// open rather than a silent no-op).
    pub fn resolve_collection_parquet_dir(&self, year: &str, collection: &str) -> PathBuf {
        let canonical = self.collection_pointer_dir(year, collection);
        if canonical.is_dir() {
            return canonical;
        }
        let year_then_collection = self.parquet_root.join(year).join(collection);
        if year_then_collection.is_dir() {
            return year_then_collection;
        }
        let collection_only = self.parquet_root.join(collection);
        if collection_only.is_dir() {
            return collection_only;
        }
        canonical
    }
}
