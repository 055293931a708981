//! `ccindex ingest` - C2/C3/C4: parse CDXJ shards into columnar pointer
//! records for one or more collections.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ccindex_core::{ParquetCompression, Paths};
use ccindex_ingest::{discover_collections, IngestConfig};
use clap::{Args, ValueEnum};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Compression {
    Zstd,
    Snappy,
    Gzip,
}

impl From<Compression> for ParquetCompression {
    fn from(c: Compression) -> Self {
        match c {
            Compression::Zstd => ParquetCompression::Zstd(3),
            Compression::Snappy => ParquetCompression::Snappy,
            Compression::Gzip => ParquetCompression::Gzip(6),
        }
    }
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[arg(long)]
    pub ccindex_root: PathBuf,
    #[arg(long)]
    pub parquet_root: PathBuf,
    #[arg(long)]
    pub duckdb_root: PathBuf,

    /// Explicit collection allowlist (repeatable/comma-separated); takes
    /// precedence over `--filter`.
    #[arg(long, value_delimiter = ',')]
    pub collections: Option<Vec<String>>,
    /// Glob over collection directory names, e.g. `CC-MAIN-2024-*`.
    #[arg(long)]
    pub filter: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub workers: usize,
    /// Accepted for compatibility with the combined launcher's flag
    /// surface; `ingest` itself never spawns a sort stage, `supervise` does.
    #[arg(long)]
    pub sort_workers: Option<usize>,
    #[arg(long)]
    pub sort_memory_per_worker_gb: Option<f64>,

    #[arg(long, default_value_t = 200_000)]
    pub batch_rows: usize,
    #[arg(long, value_enum, default_value_t = Compression::Zstd)]
    pub parquet_compression: Compression,
    #[arg(long)]
    pub progress_dir: Option<PathBuf>,
}

pub fn run(args: IngestArgs) -> Result<i32> {
    let mut paths = Paths::new(args.ccindex_root.clone(), args.parquet_root, args.duckdb_root);
    if let Some(dir) = args.progress_dir {
        paths.progress_dir = dir;
    }

    if let Some(w) = args.sort_workers {
        log::debug!("--sort-workers {w} noted; ingest does not chain into sort directly");
    }
    if let Some(m) = args.sort_memory_per_worker_gb {
        log::debug!("--sort-memory-per-worker-gb {m} noted; ingest does not chain into sort directly");
    }

    let collections = discover_collections(&args.ccindex_root, args.collections.as_deref(), args.filter.as_deref())
        .context("resolving collections")?;
    if collections.is_empty() {
        log::warn!("no collections matched under {}", args.ccindex_root.display());
        return Ok(0);
    }

    let mut config = IngestConfig::new(paths, collections);
    config.workers = args.workers;
    config.batch_rows = args.batch_rows;
    config.parquet_compression = args.parquet_compression.into();

    let summary = ccindex_ingest::run(&config)?;
    log::info!(
        "ingest: {} shards considered, {} ingested, {} skipped, {} failed, {} rows",
        summary.shards_considered,
        summary.shards_ingested,
        summary.shards_skipped,
        summary.shards_failed,
        summary.rows_ingested,
    );

    Ok(if summary.shards_failed > 0 { 1 } else { 0 })
}
