//! Sort stage configuration and collection discovery. Duplicated, rather
//! than shared, with the ingest stage's own version — stage crates stay
//! independent of one another; only the CLI/supervisor wire them together.

use anyhow::{Context, Result};
use ccindex_core::{ParquetCompression, Paths, DEFAULT_ROW_GROUP_SIZE};

/// Runtime configuration for one `sort` invocation, covering C5 for every
/// selected collection.
#[derive(Debug, Clone)]
pub struct SortConfig {
    pub paths: Paths,
    pub collections: Vec<String>,
    pub workers: usize,
    /// Upper bound on in-memory rows per spilled chunk.
    pub chunk_rows: usize,
    pub row_group_size: usize,
    pub parquet_compression: ParquetCompression,
}

impl SortConfig {
    pub fn new(paths: Paths, collections: Vec<String>) -> Self {
        Self {
            paths,
            collections,
            workers: 1,
            chunk_rows: 500_000,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            parquet_compression: ParquetCompression::default(),
        }
    }
}

/// Resolve the set of collections to sort from `ccindex_root`'s
/// subdirectories, or an explicit allowlist when given.
pub fn discover_collections(ccindex_root: &std::path::Path, explicit: Option<&[String]>) -> Result<Vec<String>> {
    if let Some(explicit) = explicit {
        return Ok(explicit.to_vec());
    }
    let mut collections: Vec<String> = std::fs::read_dir(ccindex_root)
        .with_context(|| format!("reading {}", ccindex_root.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    collections.sort();
    Ok(collections)
}

/// Derive a collection's year for the canonical layout (see `ccindex-ingest`
/// for the same derivation).
pub fn year_from_collection(collection: &str) -> String {
    collection
        .split('-')
        .find(|tok| tok.len() == 4 && tok.bytes().all(|b| b.is_ascii_digit()))
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}
