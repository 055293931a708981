//! Orchestrate C2/C3/C4 across every shard of every selected collection:
//! a bounded worker pool processes collections in parallel, and within a
//! collection, shards are ingested sequentially against that collection's
//! ledger (shared state, so it can't be split further without its own
//! locking — sequential per collection is simpler and the unit of
//! parallelism the rest of the pipeline already keys on).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use ccindex_core::progress::ProgressContext;
use ccindex_core::{is_shutdown_requested, ProgressJournal, ProgressSnapshot};

use crate::config::IngestConfig;
use crate::ledger::{IngestLedger, ShardStat};
use crate::writer::ingest_shard;

/// Aggregate outcome of one `ingest` invocation.
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub shards_considered: usize,
    pub shards_ingested: usize,
    pub shards_skipped: usize,
    pub shards_failed: usize,
    pub rows_ingested: usize,
}

/// Process one collection: glob its source shards, skip ones the ledger
/// already has recorded at their current size/mtime, ingest the rest.
fn ingest_collection(
    config: &IngestConfig,
    collection: &str,
    progress: &ProgressContext,
    rows_counter: &AtomicUsize,
    journal: &ProgressJournal,
) -> Result<(usize, usize, usize)> {
    let source_dir = config.paths.collection_source_dir(collection);
    let pattern = source_dir.join("*.gz");
    let mut shard_paths: Vec<_> = glob::glob(&pattern.to_string_lossy())
        .context("invalid glob pattern")?
        .filter_map(|e| e.ok())
        .collect();
    shard_paths.sort();

    let collection_db_path = config.paths.collection_db(collection);
    let ledger = IngestLedger::open(&collection_db_path)?;

    let pb = progress.shard_bar(collection);
    let (mut ingested, mut skipped, mut failed) = (0usize, 0usize, 0usize);

    for shard_path in &shard_paths {
        if is_shutdown_requested() {
            journal.maybe_write(
                &config.paths,
                collection,
                &ProgressSnapshot::new(collection, ingested, "interrupted"),
                true,
            );
            break;
        }

        let shard_file = shard_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        pb.set_message(shard_file.clone());

        let stat = match ShardStat::from_path(shard_path) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("{collection}/{shard_file}: stat failed: {e:#}");
                failed += 1;
                continue;
            }
        };
        let shard_key = shard_path.to_string_lossy().into_owned();

        if ledger.already_ingested(&shard_key, stat).unwrap_or(false) {
            skipped += 1;
            continue;
        }

        let paths = config.shard_paths(collection, &shard_file);
        match ingest_shard(
            &paths.source_path,
            &paths.output_path,
            collection,
            &shard_file,
            config.batch_rows,
            config.parquet_compression,
            &pb,
        ) {
            Ok(outcome) => {
                if let Err(e) = ledger.record(&shard_key, stat, outcome.rows_written as i64) {
                    log::error!("{collection}/{shard_file}: ledger record failed: {e:#}");
                    failed += 1;
                    continue;
                }
                rows_counter.fetch_add(outcome.rows_written, Ordering::Relaxed);
                ingested += 1;
                journal.maybe_write(
                    &config.paths,
                    collection,
                    &ProgressSnapshot::new(collection, ingested, "ingested"),
                    false,
                );
            }
            Err(e) => {
                log::warn!("{collection}/{shard_file}: ingest failed: {e:#}");
                failed += 1;
            }
        }
    }

    if !is_shutdown_requested() {
        journal.maybe_write(
            &config.paths,
            collection,
            &ProgressSnapshot::new(collection, ingested, "ingested"),
            true,
        );
    }

    pb.finish_and_clear();
    Ok((ingested, skipped, failed))
}

/// Run ingest (C2+C3+C4) over every collection in `config.collections`,
/// `config.workers` at a time.
pub fn run(config: &IngestConfig) -> Result<IngestSummary> {
    let started = Instant::now();
    let progress = ProgressContext::new();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()
        .context("building worker pool")?;

    let shards_considered = AtomicUsize::new(0);
    let shards_ingested = AtomicUsize::new(0);
    let shards_skipped = AtomicUsize::new(0);
    let shards_failed = AtomicUsize::new(0);
    let rows_ingested = AtomicUsize::new(0);
    let journal = ProgressJournal::new(std::time::Duration::from_secs(config.progress_interval_seconds));

    pool.install(|| {
        use rayon::prelude::*;
        config.collections.par_iter().for_each(|collection| match ingest_collection(config, collection, &progress, &rows_ingested, &journal) {
            Ok((ingested, skipped, failed)) => {
                shards_considered.fetch_add(ingested + skipped + failed, Ordering::Relaxed);
                shards_ingested.fetch_add(ingested, Ordering::Relaxed);
                shards_skipped.fetch_add(skipped, Ordering::Relaxed);
                shards_failed.fetch_add(failed, Ordering::Relaxed);
            }
            Err(e) => {
                log::error!("{collection}: ingest failed entirely: {e:#}");
                shards_failed.fetch_add(1, Ordering::Relaxed);
            }
        });
    });

    let summary = IngestSummary {
        shards_considered: shards_considered.load(Ordering::Relaxed),
        shards_ingested: shards_ingested.load(Ordering::Relaxed),
        shards_skipped: shards_skipped.load(Ordering::Relaxed),
        shards_failed: shards_failed.load(Ordering::Relaxed),
        rows_ingested: rows_ingested.load(Ordering::Relaxed),
    };

    let elapsed = started.elapsed().as_secs_f64();
    let rate = if elapsed > 0.0 { summary.rows_ingested as f64 / elapsed } else { 0.0 };
    log::info!(
        "ingest: {} collections, {} shards ingested, {} skipped, {} failed, {} rows ({rate:.0} rows/sec)",
        config.collections.len(),
        summary.shards_ingested,
        summary.shards_skipped,
        summary.shards_failed,
        summary.rows_ingested,
    );

    Ok(summary)
}
