//! Columnar output sink: buffered Parquet writer with atomic tmp→rename
//! publish, plus the empty-shard sidecar marker.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::datatypes::Schema;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::schema::types::ColumnPath;

use crate::paths::Paths;
use crate::pointer_record::DICTIONARY_ENCODED_COLUMNS;

/// Target row-group size for pointer shards. Chosen so a single row group
/// stays cheap to scan when the indexer reads only its `host_rev` column.
pub const DEFAULT_ROW_GROUP_SIZE: usize = 70_000;

/// Compression codec for a columnar shard. `Zstd` is the default; `Snappy`
/// matches the external merge sorter's chunk files (which favor decode
/// speed over ratio); `Gzip` is offered for parity with upstream CC tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParquetCompression {
    Zstd(i32),
    Snappy,
    Gzip(i32),
}

impl Default for ParquetCompression {
    fn default() -> Self {
        ParquetCompression::Zstd(3)
    }
}

impl ParquetCompression {
    fn to_parquet(self) -> Result<Compression, std::io::Error> {
        Ok(match self {
            ParquetCompression::Zstd(level) => Compression::ZSTD(
                ZstdLevel::try_new(level)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?,
            ),
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Gzip(level) => Compression::GZIP(
                GzipLevel::try_new(level as u32)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?,
            ),
        })
    }
}

impl std::str::FromStr for ParquetCompression {
    type Err = std::io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zstd" => Ok(ParquetCompression::Zstd(3)),
            "snappy" => Ok(ParquetCompression::Snappy),
            "gzip" => Ok(ParquetCompression::Gzip(6)),
            other => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unknown parquet compression: {other}"),
            )),
        }
    }
}

fn writer_properties(
    schema: &Schema,
    compression: ParquetCompression,
    row_group_size: usize,
) -> Result<WriterProperties, std::io::Error> {
    let codec = compression.to_parquet()?;
    let mut builder = WriterProperties::builder()
        .set_compression(codec)
        .set_max_row_group_size(row_group_size);
    for col in DICTIONARY_ENCODED_COLUMNS {
        if schema.field_with_name(col).is_ok() {
            let col_path = ColumnPath::new(vec![col.to_string()]);
            builder = builder.set_column_dictionary_enabled(col_path, true);
        }
    }
    Ok(builder.build())
}

/// Buffered parquet writer with atomic tmp→rename publish.
pub struct ParquetSink {
    writer: ArrowWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    row_count: usize,
}

impl std::fmt::Debug for ParquetSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetSink")
            .field("final_path", &self.final_path)
            .field("row_count", &self.row_count)
            .finish_non_exhaustive()
    }
}

impl ParquetSink {
    /// Open a sink writing to `final_path` via a sibling `.tmp` file. Any
    /// stale `.tmp` left from a prior interrupted run is removed first.
    pub fn new(
        final_path: PathBuf,
        schema: &Schema,
        compression: ParquetCompression,
        row_group_size: usize,
    ) -> Result<Self, std::io::Error> {
        let mut tmp_os = final_path.as_os_str().to_os_string();
        tmp_os.push(".tmp");
        let tmp_path = PathBuf::from(tmp_os);

        if tmp_path.exists() {
            fs::remove_file(&tmp_path)?;
        }
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&tmp_path)?;
        let props = writer_properties(schema, compression, row_group_size)?;
        let writer = ArrowWriter::try_new(file, Arc::new(schema.clone()), Some(props))
            .map_err(std::io::Error::other)?;

        Ok(Self {
            writer,
            tmp_path,
            final_path,
            row_count: 0,
        })
    }

    /// Convenience constructor using [`DEFAULT_ROW_GROUP_SIZE`].
    pub fn with_default_row_group_size(
        final_path: PathBuf,
        schema: &Schema,
        compression: ParquetCompression,
    ) -> Result<Self, std::io::Error> {
        Self::new(final_path, schema, compression, DEFAULT_ROW_GROUP_SIZE)
    }

    pub fn write_batch(&mut self, batch: &RecordBatch) -> Result<(), std::io::Error> {
        self.row_count += batch.num_rows();
        self.writer.write(batch).map_err(std::io::Error::other)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Flush the footer and atomically rename tmp → final. If no rows were
    /// ever written, the caller is expected to have already decided whether
    /// to still publish an (empty) shard or write an [`write_empty_marker`]
    /// sidecar instead — `finalize` always publishes what was written.
    pub fn finalize(self) -> Result<usize, std::io::Error> {
        let row_count = self.row_count;
        self.writer.close().map_err(std::io::Error::other)?;
        fs::rename(&self.tmp_path, &self.final_path)?;
        Ok(row_count)
    }
}

/// Write the `<shard>.parquet.empty` sidecar marking a confirmed-empty
/// shard, so the ledger and validator can tell "zero matching lines" apart
/// from "never processed" without re-opening the (nonexistent) shard.
pub fn write_empty_marker(unsorted_shard_path: &Path) -> std::io::Result<()> {
    let marker = Paths::empty_marker(unsorted_shard_path);
    if let Some(parent) = marker.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(marker, b"")
}

/// Check if a completed parquet file exists and has a valid footer.
pub fn is_valid_parquet(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };
    parquet::file::reader::SerializedFileReader::new(file).is_ok()
}

/// Remove stale `.tmp` files in the output directory, left behind by a
/// writer that never reached `finalize`.
pub fn cleanup_tmp_files(output_dir: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_schema() -> Schema {
        arrow::datatypes::Schema::new(vec![arrow::datatypes::Field::new(
            "id",
            arrow::datatypes::DataType::Int64,
            false,
        )])
    }

    fn sample_batch(schema: &Schema) -> RecordBatch {
        RecordBatch::try_new(
            Arc::new(schema.clone()),
            vec![Arc::new(arrow::array::Int64Array::from(vec![1, 2, 3]))],
        )
        .unwrap()
    }

    #[test]
    fn compression_from_str() {
        assert_eq!(
            "zstd".parse::<ParquetCompression>().unwrap(),
            ParquetCompression::Zstd(3)
        );
        assert_eq!(
            "SNAPPY".parse::<ParquetCompression>().unwrap(),
            ParquetCompression::Snappy
        );
        assert!("lz4".parse::<ParquetCompression>().is_err());
    }

    #[test]
    fn sink_writes_and_publishes_atomically() {
        let dir = TempDir::new().unwrap();
        let schema = sample_schema();
        let final_path = dir.path().join("cdx-00000.gz.parquet");
        let mut sink = ParquetSink::with_default_row_group_size(
            final_path.clone(),
            &schema,
            ParquetCompression::Snappy,
        )
        .unwrap();

        assert!(!final_path.exists());
        sink.write_batch(&sample_batch(&schema)).unwrap();
        let rows = sink.finalize().unwrap();

        assert_eq!(rows, 3);
        assert!(final_path.exists());
        assert!(is_valid_parquet(&final_path));
    }

    #[test]
    fn sink_removes_stale_tmp_before_writing() {
        let dir = TempDir::new().unwrap();
        let schema = sample_schema();
        let final_path = dir.path().join("cdx-00000.gz.parquet");
        let tmp_path = dir.path().join("cdx-00000.gz.parquet.tmp");
        std::fs::write(&tmp_path, b"stale").unwrap();

        let sink = ParquetSink::with_default_row_group_size(
            final_path,
            &schema,
            ParquetCompression::Zstd(1),
        )
        .unwrap();
        drop(sink);
        // stale tmp was truncated/replaced by File::create, not left as garbage
        assert!(tmp_path.exists());
    }

    #[test]
    fn write_empty_marker_creates_sidecar() {
        let dir = TempDir::new().unwrap();
        let shard = dir.path().join("cdx-00000.gz.parquet");
        write_empty_marker(&shard).unwrap();
        assert!(dir.path().join("cdx-00000.gz.parquet.empty").exists());
    }

    #[test]
    fn is_valid_parquet_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(!is_valid_parquet(&dir.path().join("nope.parquet")));
    }

    #[test]
    fn is_valid_parquet_not_parquet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.parquet");
        std::fs::write(&path, b"this is not parquet").unwrap();
        assert!(!is_valid_parquet(&path));
    }

    #[test]
    fn cleanup_tmp_files_removes_only_tmp() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.tmp"), b"stale").unwrap();
        std::fs::write(dir.path().join("b.parquet"), b"keep").unwrap();
        std::fs::write(dir.path().join("c.tmp"), b"stale2").unwrap();

        cleanup_tmp_files(dir.path()).unwrap();

        assert!(!dir.path().join("a.tmp").exists());
        assert!(dir.path().join("b.parquet").exists());
        assert!(!dir.path().join("c.tmp").exists());
    }
}
