//! C3: drive the CDXJ line parser over one gzip shard and write the parsed
//! records to a columnar output shard via [`ParquetSink`].
//!
//! The sink is created lazily, on the first full batch — a shard that
//! parses to zero rows never gets a `.tmp` file at all, only an
//! [`write_empty_marker`] sidecar, matching C3's empty-shard invariant.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use ccindex_core::{pointer_schema, process_lines, write_empty_marker, ParquetCompression, ParquetSink};
use ccindex_core::stream::ByteCounter;
use flate2::read::MultiGzDecoder;
use indicatif::ProgressBar;

use crate::cdxj::{parse_line, PointerAccumulator};
use crate::error::IngestError;

/// Outcome of ingesting one shard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardIngestOutcome {
    pub lines_scanned: usize,
    pub rows_written: usize,
    /// Whether a columnar shard was published (false means only an empty
    /// marker was written, because every line parsed to zero kept rows).
    pub published: bool,
}

struct CountingReader<R> {
    inner: R,
    count: Arc<AtomicU64>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Open a local gzip CDXJ shard, counting compressed bytes read for
/// progress reporting. `MultiGzDecoder` tolerates concatenated gzip members,
/// which upstream CC CDXJ shards sometimes are.
fn open_cdxj_reader(path: &Path) -> std::io::Result<(BufReader<MultiGzDecoder<CountingReader<File>>>, ByteCounter, Option<u64>)> {
    let file = File::open(path)?;
    let total = file.metadata().ok().map(|m| m.len());
    let counter: ByteCounter = Arc::new(AtomicU64::new(0));
    let counting = CountingReader {
        inner: file,
        count: counter.clone(),
    };
    let gz = MultiGzDecoder::new(counting);
    Ok((BufReader::new(gz), counter, total))
}

/// Parse `source_path` (a gzip CDXJ shard) and write the parsed records to
/// `output_path` (the unsorted columnar shard location per the canonical
/// layout). `pb` receives byte-position updates as the shard is read.
pub fn ingest_shard(
    source_path: &Path,
    output_path: &Path,
    collection: &str,
    shard_file: &str,
    batch_rows: usize,
    compression: ParquetCompression,
    pb: &ProgressBar,
) -> Result<ShardIngestOutcome> {
    if !source_path.exists() {
        return Err(IngestError::InputMissing {
            path: source_path.to_path_buf(),
        }
        .into());
    }

    let (mut reader, counter, total) = open_cdxj_reader(source_path)
        .with_context(|| format!("opening {}", source_path.display()))?;
    if let Some(total) = total {
        ccindex_core::progress::upgrade_to_bar(pb, total);
    }

    let mut acc = PointerAccumulator::new(batch_rows);
    let schema = pointer_schema();
    let mut sink: Option<ParquetSink> = None;

    let stats = process_lines(
        &mut reader,
        &counter,
        &mut acc,
        |batch| {
            let s = match sink.as_mut() {
                Some(s) => s,
                None => {
                    let created = ParquetSink::with_default_row_group_size(
                        output_path.to_path_buf(),
                        &schema,
                        compression,
                    )
                    .map_err(std::io::Error::other)?;
                    sink.insert(created)
                }
            };
            s.write_batch(batch)
        },
        |line| parse_line(line, collection, shard_file),
        pb,
    )
    .map_err(|e| IngestError::CorruptInput {
        path: source_path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let rows_written = match sink {
        Some(s) => s.finalize().map_err(|e| IngestError::WriterFailure {
            path: output_path.to_path_buf(),
            detail: e.to_string(),
        })?,
        None => 0,
    };

    let published = rows_written > 0;
    if !published {
        write_empty_marker(output_path).map_err(|e| IngestError::WriterFailure {
            path: output_path.to_path_buf(),
            detail: e.to_string(),
        })?;
    }

    Ok(ShardIngestOutcome {
        lines_scanned: stats.lines_scanned,
        rows_written,
        published,
    })
}
