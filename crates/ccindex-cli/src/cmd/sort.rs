//! `ccindex sort` - C5: external merge sort of unsorted pointer shards by
//! `(host_rev, url, timestamp)`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ccindex_core::Paths;
use ccindex_sort::SortConfig;
use clap::Args;

#[derive(Args, Debug)]
pub struct SortArgs {
    #[arg(long)]
    pub parquet_root: PathBuf,
    /// Root for per-collection DuckDB sorted-markers and resumability
    /// bookkeeping. Defaults to `--parquet-root` when a deployment keeps
    /// every root unified (not in the upstream flag list; supplemented
    /// because the sorted-marker write needs somewhere to live).
    #[arg(long)]
    pub duckdb_root: Option<PathBuf>,
    /// Explicit collection allowlist; otherwise every collection under
    /// `cc_pointers_by_collection/<year>/<collection>` is sorted.
    #[arg(long, value_delimiter = ',')]
    pub collections: Option<Vec<String>>,

    #[arg(long, default_value_t = 1)]
    pub workers: usize,
    #[arg(long)]
    pub memory_per_worker_gb: Option<f64>,
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,
}

/// Collections live two levels under `cc_pointers_by_collection`:
/// `<year>/<collection>/`. Unlike the ingest/validate stages, which see a
/// flat `<ccindex_root>/<collection>/` tree, sort only ever sees the
/// already-partitioned-by-year parquet output.
fn discover_nested_collections(parquet_root: &Path, explicit: Option<&[String]>) -> Result<Vec<String>> {
    if let Some(explicit) = explicit {
        return Ok(explicit.to_vec());
    }
    let root = parquet_root.join("cc_pointers_by_collection");
    let mut collections = Vec::new();
    let Ok(years) = std::fs::read_dir(&root) else {
        return Ok(collections);
    };
    for year_entry in years.filter_map(|e| e.ok()).filter(|e| e.path().is_dir()) {
        for collection_entry in std::fs::read_dir(year_entry.path())
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
        {
            if let Ok(name) = collection_entry.file_name().into_string() {
                collections.push(name);
            }
        }
    }
    collections.sort();
    collections.dedup();
    Ok(collections)
}

pub fn run(args: SortArgs) -> Result<i32> {
    let duckdb_root = args.duckdb_root.unwrap_or_else(|| args.parquet_root.clone());
    let paths = Paths::new(PathBuf::new(), args.parquet_root.clone(), duckdb_root);

    let collections = discover_nested_collections(&args.parquet_root, args.collections.as_deref())
        .context("resolving collections")?;
    if collections.is_empty() {
        log::warn!("no collections found under {}", args.parquet_root.display());
        return Ok(0);
    }

    if let Some(m) = args.memory_per_worker_gb {
        log::debug!("--memory-per-worker-gb {m} noted; in-process chunk sort ignores this, the duckdb-subprocess backend (C10's OOM fallback) honors it");
    }
    if let Some(dir) = &args.temp_dir {
        log::debug!("--temp-dir {} noted; in-process chunk sort uses its own tempdir per shard", dir.display());
    }

    let mut config = SortConfig::new(paths, collections);
    config.workers = args.workers;

    let summary = ccindex_sort::run(&config)?;
    log::info!(
        "sort: {} shards considered, {} sorted, {} skipped, {} failed, {} rows",
        summary.shards_considered,
        summary.shards_sorted,
        summary.shards_skipped,
        summary.shards_failed,
        summary.rows_sorted,
    );

    Ok(if summary.shards_failed > 0 { 1 } else { 0 })
}
