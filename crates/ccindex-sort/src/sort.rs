//! Orchestrates C5 end to end: chunk-sort-then-k-way-merge, followed by the
//! mandatory post-sort verification (row-order, row-count).

use std::path::Path;

use anyhow::{Context, Result};
use ccindex_core::{record_from_batch_row, ParquetCompression};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tempfile::TempDir;

use crate::chunk::spill_sorted_chunks;
use crate::error::SortError;
use crate::key::sort_key;
use crate::merge::merge_chunks;

/// Outcome of sorting one shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOutcome {
    pub rows_sorted: usize,
}

fn count_rows(path: &Path) -> Result<usize> {
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    Ok(builder.metadata().file_metadata().num_rows() as usize)
}

/// Verify C8 invariant 2: nondecreasing key order and row-count parity with
/// the unsorted source. Run after every sort, in-process and subprocess
/// backends alike.
fn verify_sorted(output_path: &Path, expected_rows: usize) -> Result<(), SortError> {
    let file = std::fs::File::open(output_path).map_err(|e| SortError::VerificationFailed {
        path: output_path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| SortError::VerificationFailed {
        path: output_path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let reader = builder.build().map_err(|e| SortError::VerificationFailed {
        path: output_path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut prev = None;
    let mut total_rows = 0usize;
    for batch in reader {
        let batch = batch.map_err(|e| SortError::VerificationFailed {
            path: output_path.to_path_buf(),
            detail: e.to_string(),
        })?;
        for row in 0..batch.num_rows() {
            let rec = record_from_batch_row(&batch, row);
            let key = sort_key(&rec);
            if let Some(prev_key) = &prev {
                if &key < prev_key {
                    return Err(SortError::VerificationFailed {
                        path: output_path.to_path_buf(),
                        detail: format!("row {total_rows} out of order"),
                    });
                }
            }
            prev = Some(key);
            total_rows += 1;
        }
    }

    if total_rows != expected_rows {
        return Err(SortError::VerificationFailed {
            path: output_path.to_path_buf(),
            detail: format!("row count mismatch: sorted={total_rows} unsorted={expected_rows}"),
        });
    }
    Ok(())
}

/// Sort `source_path` (an unsorted pointer shard) into `output_path` (the
/// `.sorted.parquet` sibling), via disk-spilled chunk-sort-then-merge.
/// `chunk_rows` bounds in-memory rows per chunk; `row_group_size` bounds
/// the output's physical row groups.
pub fn sort_shard(
    source_path: &Path,
    output_path: &Path,
    chunk_rows: usize,
    row_group_size: usize,
    compression: ParquetCompression,
) -> Result<SortOutcome> {
    if !source_path.exists() {
        return Err(SortError::InputMissing {
            path: source_path.to_path_buf(),
        }
        .into());
    }

    let unsorted_rows = count_rows(source_path).with_context(|| format!("counting rows in {}", source_path.display()))?;

    let chunk_dir = TempDir::new().context("creating chunk spill directory")?;
    let chunk_paths = spill_sorted_chunks(source_path, chunk_dir.path(), chunk_rows).map_err(|e| SortError::ChunkFailure {
        path: source_path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let rows_written = merge_chunks(&chunk_paths, output_path, compression, row_group_size).map_err(|e| SortError::MergeFailure {
        path: output_path.to_path_buf(),
        detail: e.to_string(),
    })?;

    // chunk_dir (and its chunk files) is removed on drop here.

    verify_sorted(output_path, unsorted_rows)?;

    Ok(SortOutcome { rows_sorted: rows_written })
}
