//! Stage 1 of C5: stream the source shard in `chunk_rows`-row groups,
//! sort each group in memory, spill it to its own temp parquet file.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ccindex_core::record_from_batch_row;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::batch::records_to_batch;
use crate::key::sort_key;

/// Read `source_path` in `chunk_rows`-row groups, sort each in memory, and
/// write it to its own file under `chunk_dir`. Returns the chunk file paths
/// in write order (arbitrary; the merge stage doesn't care).
pub fn spill_sorted_chunks(source_path: &Path, chunk_dir: &Path, chunk_rows: usize) -> Result<Vec<PathBuf>> {
    let file = File::open(source_path).with_context(|| format!("opening {}", source_path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata for {}", source_path.display()))?;
    let reader = builder
        .with_batch_size(chunk_rows.clamp(1, 65_536))
        .build()
        .with_context(|| format!("building reader for {}", source_path.display()))?;

    let mut chunk_paths = Vec::new();
    let mut buffer = Vec::with_capacity(chunk_rows);
    let mut chunk_idx = 0usize;

    for batch in reader {
        let batch = batch.with_context(|| format!("reading batch from {}", source_path.display()))?;
        for row in 0..batch.num_rows() {
            buffer.push(record_from_batch_row(&batch, row));
        }
        while buffer.len() >= chunk_rows {
            let chunk: Vec<_> = buffer.drain(..chunk_rows).collect();
            chunk_paths.push(write_chunk(chunk, chunk_dir, chunk_idx)?);
            chunk_idx += 1;
        }
    }
    if !buffer.is_empty() {
        chunk_paths.push(write_chunk(buffer, chunk_dir, chunk_idx)?);
    }
    Ok(chunk_paths)
}

fn write_chunk(mut rows: Vec<ccindex_core::PointerRecord>, chunk_dir: &Path, idx: usize) -> Result<PathBuf> {
    rows.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
    let path = chunk_dir.join(format!("chunk-{idx:05}.parquet"));
    let batch = records_to_batch(&rows).context("building chunk record batch")?;
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props)).context("opening chunk writer")?;
    writer.write(&batch).context("writing chunk batch")?;
    writer.close().context("closing chunk writer")?;
    Ok(path)
}
