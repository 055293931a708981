//! Orchestrates C5 across every shard of every selected collection,
//! resuming by sorted-file presence: a shard whose `.sorted.parquet` already
//! exists is skipped rather than re-sorted. Mirrors the ingest stage's
//! worker-pool-per-collection shape.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use ccindex_core::progress::ProgressContext;
use ccindex_core::Paths;

use crate::config::{year_from_collection, SortConfig};
use crate::sort::sort_shard;

/// Aggregate outcome of one `sort` invocation.
#[derive(Debug, Clone, Default)]
pub struct SortSummary {
    pub shards_considered: usize,
    pub shards_sorted: usize,
    pub shards_skipped: usize,
    pub shards_failed: usize,
    pub rows_sorted: usize,
}

fn sort_collection(config: &SortConfig, collection: &str, progress: &ProgressContext, rows_counter: &AtomicUsize) -> Result<(usize, usize, usize)> {
    let year = year_from_collection(collection);
    let dir = config.paths.resolve_collection_parquet_dir(&year, collection);
    let pattern = dir.join("*.parquet");
    let mut shard_paths: Vec<_> = glob::glob(&pattern.to_string_lossy())
        .context("invalid glob pattern")?
        .filter_map(|e| e.ok())
        .filter(|p| !p.to_string_lossy().ends_with(".sorted.parquet"))
        .collect();
    shard_paths.sort();

    let pb = progress.shard_bar(collection);
    let (mut sorted, mut skipped, mut failed) = (0usize, 0usize, 0usize);

    for shard_path in &shard_paths {
        let parquet_name = shard_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let shard_file = parquet_name.strip_suffix(".parquet").unwrap_or(&parquet_name);
        pb.set_message(shard_file.to_string());

        let sorted_path = config.paths.sorted_shard(&year, collection, shard_file);
        if sorted_path.exists() {
            skipped += 1;
            continue;
        }

        match sort_shard(shard_path, &sorted_path, config.chunk_rows, config.row_group_size, config.parquet_compression) {
            Ok(outcome) => {
                rows_counter.fetch_add(outcome.rows_sorted, Ordering::Relaxed);
                sorted += 1;
            }
            Err(e) => {
                log::warn!("{collection}/{shard_file}: sort failed: {e:#}");
                failed += 1;
            }
        }
    }

    pb.finish_and_clear();

    if failed == 0 && !shard_paths.is_empty() {
        let marker = Paths::sorted_marker(&config.paths.collection_db(collection));
        if let Some(parent) = marker.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&marker, b"").with_context(|| format!("writing {}", marker.display()))?;
    }

    Ok((sorted, skipped, failed))
}

/// Run sort (C5) over every collection in `config.collections`,
/// `config.workers` at a time.
pub fn run(config: &SortConfig) -> Result<SortSummary> {
    let started = Instant::now();
    let progress = ProgressContext::new();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()
        .context("building worker pool")?;

    let shards_sorted = AtomicUsize::new(0);
    let shards_skipped = AtomicUsize::new(0);
    let shards_failed = AtomicUsize::new(0);
    let rows_sorted = AtomicUsize::new(0);

    pool.install(|| {
        use rayon::prelude::*;
        config.collections.par_iter().for_each(|collection| match sort_collection(config, collection, &progress, &rows_sorted) {
            Ok((sorted, skipped, failed)) => {
                shards_sorted.fetch_add(sorted, Ordering::Relaxed);
                shards_skipped.fetch_add(skipped, Ordering::Relaxed);
                shards_failed.fetch_add(failed, Ordering::Relaxed);
            }
            Err(e) => {
                log::error!("{collection}: sort failed entirely: {e:#}");
                shards_failed.fetch_add(1, Ordering::Relaxed);
            }
        });
    });

    let summary = SortSummary {
        shards_considered: shards_sorted.load(Ordering::Relaxed) + shards_skipped.load(Ordering::Relaxed) + shards_failed.load(Ordering::Relaxed),
        shards_sorted: shards_sorted.load(Ordering::Relaxed),
        shards_skipped: shards_skipped.load(Ordering::Relaxed),
        shards_failed: shards_failed.load(Ordering::Relaxed),
        rows_sorted: rows_sorted.load(Ordering::Relaxed),
    };

    let elapsed = started.elapsed().as_secs_f64();
    let rate = if elapsed > 0.0 { summary.rows_sorted as f64 / elapsed } else { 0.0 };
    log::info!(
        "sort: {} collections, {} shards sorted, {} skipped, {} failed, {} rows ({rate:.0} rows/sec)",
        config.collections.len(),
        summary.shards_sorted,
        summary.shards_skipped,
        summary.shards_failed,
        summary.rows_sorted,
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::records_to_batch;
    use ccindex_core::{CdxjMeta, ParquetCompression, ParquetSink, PointerRecord};
    use tempfile::TempDir;

    fn write_unsorted(paths: &Paths, collection: &str, shard_file: &str, records: Vec<PointerRecord>) {
        let path = paths.unsorted_shard(&year_from_collection(collection), collection, shard_file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut sink = ParquetSink::with_default_row_group_size(path, &ccindex_core::pointer_schema(), ParquetCompression::Snappy).unwrap();
        let batch = records_to_batch(&records).unwrap();
        sink.write_batch(&batch).unwrap();
        sink.finalize().unwrap();
    }

    #[test]
    fn sorts_all_shards_and_writes_marker() {
        let ccindex_root = TempDir::new().unwrap();
        let parquet_root = TempDir::new().unwrap();
        let duckdb_root = TempDir::new().unwrap();
        let paths = Paths::new(ccindex_root.path(), parquet_root.path(), duckdb_root.path());

        write_unsorted(
            &paths,
            "CC-MAIN-2024-10",
            "cdx-00000.gz",
            vec![
                PointerRecord::new("C", "s", None, "20240101000000", "https://b.com/", CdxjMeta::Unknown),
                PointerRecord::new("C", "s", None, "20240101000000", "https://a.com/", CdxjMeta::Unknown),
            ],
        );

        let config = SortConfig::new(paths.clone(), vec!["CC-MAIN-2024-10".to_string()]);
        let summary = run(&config).unwrap();

        assert_eq!(summary.shards_sorted, 1);
        assert_eq!(summary.shards_failed, 0);
        assert_eq!(summary.rows_sorted, 2);

        let sorted_path = paths.sorted_shard("2024", "CC-MAIN-2024-10", "cdx-00000.gz");
        assert!(sorted_path.exists());
        let marker = Paths::sorted_marker(&paths.collection_db("CC-MAIN-2024-10"));
        assert!(marker.exists());
    }

    #[test]
    fn rerun_skips_already_sorted_shards() {
        let ccindex_root = TempDir::new().unwrap();
        let parquet_root = TempDir::new().unwrap();
        let duckdb_root = TempDir::new().unwrap();
        let paths = Paths::new(ccindex_root.path(), parquet_root.path(), duckdb_root.path());

        write_unsorted(
            &paths,
            "CC-MAIN-2024-10",
            "cdx-00000.gz",
            vec![PointerRecord::new("C", "s", None, "20240101000000", "https://a.com/", CdxjMeta::Unknown)],
        );

        let config = SortConfig::new(paths, vec!["CC-MAIN-2024-10".to_string()]);
        run(&config).unwrap();
        let second = run(&config).unwrap();

        assert_eq!(second.shards_sorted, 0);
        assert_eq!(second.shards_skipped, 1);
    }
}
