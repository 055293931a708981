//! Ingest stage configuration and collection discovery.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ccindex_core::{ParquetCompression, Paths};

/// Runtime configuration for one `ingest` invocation, covering C2/C3/C4 for
/// every selected collection.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub paths: Paths,
    /// Collections to ingest, already resolved (see [`discover_collections`]).
    pub collections: Vec<String>,
    pub workers: usize,
    pub batch_rows: usize,
    pub parquet_compression: ParquetCompression,
    /// `--progress-interval-seconds`: minimum gap between progress journal
    /// writes for a given collection.
    pub progress_interval_seconds: u64,
}

impl IngestConfig {
    pub fn new(paths: Paths, collections: Vec<String>) -> Self {
        Self {
            paths,
            collections,
            workers: 1,
            batch_rows: 200_000,
            parquet_compression: ParquetCompression::default(),
            progress_interval_seconds: ccindex_core::journal::DEFAULT_PROGRESS_INTERVAL_SECONDS,
        }
    }
}

/// Resolve the set of collections to ingest from `ccindex_root`'s
/// subdirectories, each of which is one collection's CDXJ shards.
///
/// `--collections C...` (an explicit allowlist) takes precedence; otherwise
/// `--filter` is matched against directory names as a glob pattern (the
/// corpus carries no regex crate, so a glob is the closest idiomatic
/// equivalent — see DESIGN.md). With neither, every subdirectory is ingested.
pub fn discover_collections(
    ccindex_root: &std::path::Path,
    explicit: Option<&[String]>,
    filter_glob: Option<&str>,
) -> Result<Vec<String>> {
    if let Some(explicit) = explicit {
        return Ok(explicit.to_vec());
    }

    let pattern = filter_glob.map(glob::Pattern::new).transpose().context("invalid --filter glob")?;

    let mut collections: Vec<String> = std::fs::read_dir(ccindex_root)
        .with_context(|| format!("reading {}", ccindex_root.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| pattern.as_ref().map_or(true, |p| p.matches(name)))
        .collect();
    collections.sort();
    Ok(collections)
}

/// Derive a collection's year for the canonical layout, e.g.
/// `CC-MAIN-2024-10` → `2024`: the first 4-digit, all-numeric `-`-delimited
/// token. Falls back to `"unknown"` for collection names that carry none
/// (keeps output paths well-formed rather than panicking on an odd name).
pub fn year_from_collection(collection: &str) -> String {
    collection
        .split('-')
        .find(|tok| tok.len() == 4 && tok.bytes().all(|b| b.is_ascii_digit()))
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// A shard source/output path pair, derived from the canonical layout.
#[derive(Debug, Clone)]
pub struct ShardPaths {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
}

impl IngestConfig {
    pub fn shard_paths(&self, collection: &str, shard_file: &str) -> ShardPaths {
        let year = year_from_collection(collection);
        ShardPaths {
            source_path: self.paths.source_shard(collection, shard_file),
            output_path: self.paths.unsorted_shard(&year, collection, shard_file),
        }
    }
}
