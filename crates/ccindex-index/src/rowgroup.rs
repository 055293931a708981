//! C6: scan a sorted shard's `host_rev` column, one row group at a time,
//! and emit a [`RowGroupSegment`] per contiguous run.
//!
//! Runs never cross a row-group boundary: the previous run is always closed
//! at the end of its row group, even if the next row group starts with the
//! same `host_rev`. This keeps a resolver able to satisfy a query by opening
//! a single row group, never two.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use arrow::array::StringArray;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

/// One contiguous run of a single `host_rev` inside one row group.
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroupSegment {
    pub shard_file: String,
    pub file_relpath: String,
    pub host_rev: String,
    pub row_group_ix: i32,
    pub row_group_start_row: i64,
    pub row_group_end_row: i64,
    pub segment_start_in_rg: i32,
    pub segment_end_in_rg: i32,
    pub absolute_start_row: i64,
    pub absolute_end_row: i64,
}

/// Accumulates the current open run within one row group.
struct OpenRun {
    host_rev: String,
    start_in_rg: i32,
    end_in_rg: i32,
}

#[allow(clippy::too_many_arguments)]
fn close_run(
    run: OpenRun,
    shard_file: &str,
    file_relpath: &str,
    row_group_ix: i32,
    row_group_start_row: i64,
    row_group_end_row: i64,
) -> RowGroupSegment {
    RowGroupSegment {
        shard_file: shard_file.to_string(),
        file_relpath: file_relpath.to_string(),
        host_rev: run.host_rev,
        row_group_ix,
        row_group_start_row,
        row_group_end_row,
        segment_start_in_rg: run.start_in_rg,
        segment_end_in_rg: run.end_in_rg,
        absolute_start_row: row_group_start_row + run.start_in_rg as i64,
        absolute_end_row: row_group_start_row + run.end_in_rg as i64,
    }
}

/// Scan every row group of `shard_path`, reading only the `host_rev` column,
/// and return the segments in `(row_group_ix, segment_start_in_rg)` order.
pub fn scan_row_group_segments(
    shard_path: &Path,
    shard_file: &str,
    file_relpath: &str,
) -> Result<Vec<RowGroupSegment>> {
    let metadata_file =
        File::open(shard_path).with_context(|| format!("opening {}", shard_path.display()))?;
    let probe = ParquetRecordBatchReaderBuilder::try_new(metadata_file)
        .with_context(|| format!("reading parquet metadata: {}", shard_path.display()))?;
    let schema_descr = probe.metadata().file_metadata().schema_descr_ptr();
    let host_rev_col = schema_descr
        .columns()
        .iter()
        .position(|c| c.name() == "host_rev")
        .context("shard schema has no host_rev column")?;
    let mask = ProjectionMask::leaf(schema_descr.clone(), [host_rev_col]);

    let num_row_groups = probe.metadata().num_row_groups();
    let row_group_lens: Vec<i64> = (0..num_row_groups)
        .map(|ix| probe.metadata().row_group(ix).num_rows())
        .collect();
    drop(probe);

    let mut segments = Vec::new();
    let mut row_group_start_row: i64 = 0;

    for (rg_ix, &rg_len) in row_group_lens.iter().enumerate() {
        let row_group_end_row = row_group_start_row + rg_len - 1;

        let file = File::open(shard_path)
            .with_context(|| format!("reopening {}", shard_path.display()))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_projection(mask.clone())
            .with_row_groups(vec![rg_ix])
            .build()
            .with_context(|| format!("building row group {rg_ix} reader"))?;

        let mut open_run: Option<OpenRun> = None;
        let mut row_in_rg: i32 = 0;

        for batch in reader {
            let batch = batch.with_context(|| format!("reading row group {rg_ix}"))?;
            let col = batch
                .column(0)
                .as_any()
                .downcast_ref::<StringArray>()
                .context("host_rev column is not Utf8")?;

            for i in 0..col.len() {
                let value = if col.is_null(i) { None } else { Some(col.value(i)) };
                match (value, open_run.as_mut()) {
                    (Some(v), Some(run)) if run.host_rev == v => {
                        run.end_in_rg = row_in_rg;
                    }
                    (Some(v), _) => {
                        if let Some(run) = open_run.take() {
                            segments.push(close_run(
                                run,
                                shard_file,
                                file_relpath,
                                rg_ix as i32,
                                row_group_start_row,
                                row_group_end_row,
                            ));
                        }
                        open_run = Some(OpenRun {
                            host_rev: v.to_string(),
                            start_in_rg: row_in_rg,
                            end_in_rg: row_in_rg,
                        });
                    }
                    (None, _) => {
                        if let Some(run) = open_run.take() {
                            segments.push(close_run(
                                run,
                                shard_file,
                                file_relpath,
                                rg_ix as i32,
                                row_group_start_row,
                                row_group_end_row,
                            ));
                        }
                    }
                }
                row_in_rg += 1;
            }
        }

        if let Some(run) = open_run.take() {
            segments.push(close_run(
                run,
                shard_file,
                file_relpath,
                rg_ix as i32,
                row_group_start_row,
                row_group_end_row,
            ));
        }

        row_group_start_row += rg_len;
    }

    Ok(segments)
}
