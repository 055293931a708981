//! Configuration for the row-group indexer (C6), the meta-index builder
//! (C7), and the resolver (C8).

use std::path::PathBuf;

/// Inputs for (re)building one collection's row-group index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub collection: String,
    /// Directory holding the collection's sorted shards (`*.sorted.parquet`).
    pub shards_dir: PathBuf,
    /// Root every `file_relpath` stored in the index is relative to.
    pub parquet_root: PathBuf,
    pub collection_db_path: PathBuf,
    /// Restrict indexing to these shard file names (`--only SHARD`,
    /// repeatable). `None` indexes every `*.sorted.parquet` under
    /// `shards_dir`.
    pub only: Option<Vec<String>>,
}

/// One upstream collection index to fold into a year index.
#[derive(Debug, Clone)]
pub struct CollectionRef {
    pub collection: String,
    pub collection_db_path: PathBuf,
}

/// Inputs for (re)building one year's meta-index.
#[derive(Debug, Clone)]
pub struct YearIndexConfig {
    pub year: String,
    pub year_db_path: PathBuf,
    pub collections: Vec<CollectionRef>,
}

/// One upstream year index to fold into the master index.
#[derive(Debug, Clone)]
pub struct YearRef {
    pub year: String,
    pub year_db_path: PathBuf,
}

/// Inputs for (re)building the master index.
#[derive(Debug, Clone)]
pub struct MasterIndexConfig {
    pub master_db_path: PathBuf,
    pub years: Vec<YearRef>,
}

/// Where the resolver starts walking the meta chain. Starting lower in the
/// chain (a specific collection) skips opening the levels above it, useful
/// when the caller already knows which collection to query.
#[derive(Debug, Clone)]
pub enum ResolveLevel {
    Master { master_db_path: PathBuf },
    Year { year_db_path: PathBuf },
    Collection { collection: String, collection_db_path: PathBuf },
}

/// Inputs for a single domain resolution (C8).
#[derive(Debug, Clone)]
pub struct ResolveConfig {
    pub domain: String,
    pub parquet_root: PathBuf,
    pub level: ResolveLevel,
    /// Restrict traversal to this year when starting from `Master`.
    pub year_filter: Option<String>,
    pub max_parquet_files: usize,
    pub max_matches: usize,
    pub per_shard_cap: usize,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        ResolveConfig {
            domain: String::new(),
            parquet_root: PathBuf::new(),
            level: ResolveLevel::Collection {
                collection: String::new(),
                collection_db_path: PathBuf::new(),
            },
            year_filter: None,
            max_parquet_files: usize::MAX,
            max_matches: usize::MAX,
            per_shard_cap: usize::MAX,
        }
    }
}
