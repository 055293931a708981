//! Stage 2 of C5: k-way merge the sorted chunk files into one output shard,
//! keyed by a min-heap over each chunk's current head row.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arrow::datatypes::Schema;
use ccindex_core::{record_from_batch_row, ParquetCompression, ParquetSink, PointerRecord};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};

use crate::batch::records_to_batch;
use crate::key::{sort_key, SortKey};

struct ChunkCursor {
    reader: ParquetRecordBatchReader,
    batch: Option<arrow::array::RecordBatch>,
    row_in_batch: usize,
}

impl ChunkCursor {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening chunk {}", path.display()))?;
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .with_context(|| format!("reading chunk metadata {}", path.display()))?
            .build()
            .with_context(|| format!("building chunk reader {}", path.display()))?;
        let batch = reader.next().transpose().with_context(|| format!("reading {}", path.display()))?;
        Ok(Self {
            reader,
            batch,
            row_in_batch: 0,
        })
    }

    fn peek(&self) -> Option<PointerRecord> {
        self.batch.as_ref().map(|b| record_from_batch_row(b, self.row_in_batch))
    }

    fn advance(&mut self) -> Result<()> {
        self.row_in_batch += 1;
        if let Some(b) = &self.batch {
            if self.row_in_batch >= b.num_rows() {
                self.batch = self.reader.next().transpose()?;
                self.row_in_batch = 0;
            }
        }
        Ok(())
    }
}

fn flush(sink: &mut Option<ParquetSink>, schema: &Schema, output_path: &Path, compression: ParquetCompression, rows: Vec<PointerRecord>) -> Result<()> {
    let batch = records_to_batch(&rows).context("building merge output batch")?;
    let s = match sink {
        Some(s) => s,
        None => sink.get_or_insert(
            ParquetSink::with_default_row_group_size(output_path.to_path_buf(), schema, compression)
                .context("opening merge output sink")?,
        ),
    };
    s.write_batch(&batch).context("writing merge output batch")?;
    Ok(())
}

/// Merge `chunk_paths` (each already sorted by [`crate::key::sort_key`]) into
/// a single sorted shard at `output_path`, grouped into row groups of at
/// most `row_group_size` rows. Returns the total row count written.
pub fn merge_chunks(
    chunk_paths: &[PathBuf],
    output_path: &Path,
    compression: ParquetCompression,
    row_group_size: usize,
) -> Result<usize> {
    let mut cursors: Vec<ChunkCursor> = chunk_paths.iter().map(|p| ChunkCursor::open(p)).collect::<Result<_>>()?;
    let mut heap: BinaryHeap<Reverse<(SortKey, usize)>> = BinaryHeap::new();
    for (i, c) in cursors.iter().enumerate() {
        if let Some(rec) = c.peek() {
            heap.push(Reverse((sort_key(&rec), i)));
        }
    }

    let schema = ccindex_core::pointer_schema();
    let mut sink: Option<ParquetSink> = None;
    let mut buffer: Vec<PointerRecord> = Vec::with_capacity(row_group_size.min(65_536));

    while let Some(Reverse((_, i))) = heap.pop() {
        let rec = cursors[i].peek().expect("heap entry implies a peekable row");
        buffer.push(rec);
        cursors[i].advance()?;
        if let Some(next) = cursors[i].peek() {
            heap.push(Reverse((sort_key(&next), i)));
        }
        if buffer.len() >= row_group_size {
            flush(&mut sink, &schema, output_path, compression, std::mem::take(&mut buffer))?;
        }
    }
    if !buffer.is_empty() {
        flush(&mut sink, &schema, output_path, compression, buffer)?;
    }

    match sink {
        Some(s) => s.finalize().context("finalizing merge output"),
        None => Ok(0),
    }
}
