//! The `PointerRecord` data model: one row per CDXJ line that carries a URL,
//! plus the Arrow schema every columnar shard in this pipeline is written
//! against.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};

/// CDXJ metadata is untrusted, schema-loose JSON. Rather than threading a
/// generic dynamic map through the pipeline, parsed metadata is coerced into
/// this sum type at the ingest boundary: either every recognized key parsed
/// cleanly (`Known`), or the JSON object was absent/malformed and every field
/// is left unset (`Unknown`).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CdxjMeta {
    Known {
        status: Option<i32>,
        mime: Option<String>,
        digest: Option<String>,
        filename: Option<String>,
        offset: Option<i64>,
        length: Option<i64>,
    },
    #[default]
    Unknown,
}

impl CdxjMeta {
    pub fn status(&self) -> Option<i32> {
        match self {
            CdxjMeta::Known { status, .. } => *status,
            CdxjMeta::Unknown => None,
        }
    }

    pub fn mime(&self) -> Option<&str> {
        match self {
            CdxjMeta::Known { mime, .. } => mime.as_deref(),
            CdxjMeta::Unknown => None,
        }
    }

    pub fn digest(&self) -> Option<&str> {
        match self {
            CdxjMeta::Known { digest, .. } => digest.as_deref(),
            CdxjMeta::Unknown => None,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            CdxjMeta::Known { filename, .. } => filename.as_deref(),
            CdxjMeta::Unknown => None,
        }
    }

    pub fn offset(&self) -> Option<i64> {
        match self {
            CdxjMeta::Known { offset, .. } => *offset,
            CdxjMeta::Unknown => None,
        }
    }

    pub fn length(&self) -> Option<i64> {
        match self {
            CdxjMeta::Known { length, .. } => *length,
            CdxjMeta::Unknown => None,
        }
    }
}

/// One CDXJ line with a URL. A record is useful iff `url` is `Some`;
/// callers that parse a CDXJ line with no URL should not construct a
/// `PointerRecord` at all. `host_rev` is present iff a host could be
/// extracted from `url` — malformed URLs still produce a record (with
/// `host`/`host_rev` unset) so the shard row count matches the input line
/// count.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerRecord {
    pub collection: String,
    pub shard_file: String,
    pub surt: Option<String>,
    /// 14-digit YYYYMMDDHHMMSS. Physical column name is `ts`.
    pub timestamp: String,
    pub url: String,
    pub host: Option<String>,
    pub host_rev: Option<String>,
    pub status: Option<i32>,
    pub mime: Option<String>,
    pub digest: Option<String>,
    pub warc_filename: Option<String>,
    pub warc_offset: Option<i64>,
    pub warc_length: Option<i64>,
}

impl PointerRecord {
    /// Build a record from its constituent SURT/timestamp/URL fields plus
    /// decoded metadata. Computes `host`/`host_rev` from `url`.
    pub fn new(
        collection: impl Into<String>,
        shard_file: impl Into<String>,
        surt: Option<String>,
        timestamp: impl Into<String>,
        url: impl Into<String>,
        meta: CdxjMeta,
    ) -> Self {
        let url = url.into();
        let host_rev = crate::reverse_domain::host_rev_from_url(&url);
        let host = extract_normalized_host(&url);
        PointerRecord {
            collection: collection.into(),
            shard_file: shard_file.into(),
            surt,
            timestamp: timestamp.into(),
            url,
            host,
            host_rev,
            status: meta.status(),
            mime: meta.mime().map(str::to_string),
            digest: meta.digest().map(str::to_string),
            warc_filename: meta.filename().map(str::to_string),
            warc_offset: meta.offset(),
            warc_length: meta.length(),
        }
    }
}

fn extract_normalized_host(url: &str) -> Option<String> {
    // Reuse the same extraction the reverse-domain codec performs, but
    // surface the normalized host string itself rather than its rev key.
    let rev_key = crate::reverse_domain::host_rev_from_url(url)?;
    let mut labels: Vec<&str> = rev_key.split(',').collect();
    labels.reverse();
    Some(labels.join("."))
}

/// Column order and types for every pointer shard this pipeline writes or
/// reads, unsorted or sorted. `timestamp` is physically named `ts`.
pub fn pointer_schema() -> Schema {
    Schema::new(vec![
        Field::new("collection", DataType::Utf8, false),
        Field::new("shard_file", DataType::Utf8, false),
        Field::new("surt", DataType::Utf8, true),
        Field::new("ts", DataType::Utf8, false),
        Field::new("url", DataType::Utf8, false),
        Field::new("host", DataType::Utf8, true),
        Field::new("host_rev", DataType::Utf8, true),
        Field::new("status", DataType::Int32, true),
        Field::new("mime", DataType::Utf8, true),
        Field::new("digest", DataType::Utf8, true),
        Field::new("warc_filename", DataType::Utf8, true),
        Field::new("warc_offset", DataType::Int64, true),
        Field::new("warc_length", DataType::Int64, true),
    ])
}

/// Shared, ref-counted handle to the schema, as Arrow writers expect.
pub fn pointer_schema_ref() -> Arc<Schema> {
    Arc::new(pointer_schema())
}

/// Decode row `row` of a [`arrow::array::RecordBatch`] written against
/// [`pointer_schema`] back into a [`PointerRecord`]. Shared by every reader
/// that needs typed rows rather than raw Arrow arrays: the row-group
/// indexer, the resolver, the external merge sorter.
pub fn record_from_batch_row(batch: &arrow::array::RecordBatch, row: usize) -> PointerRecord {
    use arrow::array::{Int32Array, Int64Array, StringArray};

    fn utf8(batch: &arrow::array::RecordBatch, col: &str, row: usize) -> Option<String> {
        let idx = batch.schema().index_of(col).ok()?;
        let arr = batch.column(idx).as_any().downcast_ref::<StringArray>()?;
        if arr.is_null(row) { None } else { Some(arr.value(row).to_string()) }
    }
    fn i32_col(batch: &arrow::array::RecordBatch, col: &str, row: usize) -> Option<i32> {
        let idx = batch.schema().index_of(col).ok()?;
        let arr = batch.column(idx).as_any().downcast_ref::<Int32Array>()?;
        if arr.is_null(row) { None } else { Some(arr.value(row)) }
    }
    fn i64_col(batch: &arrow::array::RecordBatch, col: &str, row: usize) -> Option<i64> {
        let idx = batch.schema().index_of(col).ok()?;
        let arr = batch.column(idx).as_any().downcast_ref::<Int64Array>()?;
        if arr.is_null(row) { None } else { Some(arr.value(row)) }
    }

    PointerRecord {
        collection: utf8(batch, "collection", row).unwrap_or_default(),
        shard_file: utf8(batch, "shard_file", row).unwrap_or_default(),
        surt: utf8(batch, "surt", row),
        timestamp: utf8(batch, "ts", row).unwrap_or_default(),
        url: utf8(batch, "url", row).unwrap_or_default(),
        host: utf8(batch, "host", row),
        host_rev: utf8(batch, "host_rev", row),
        status: i32_col(batch, "status", row),
        mime: utf8(batch, "mime", row),
        digest: utf8(batch, "digest", row),
        warc_filename: utf8(batch, "warc_filename", row),
        warc_offset: i64_col(batch, "warc_offset", row),
        warc_length: i64_col(batch, "warc_length", row),
    }
}

/// Columns given dictionary encoding in the Parquet writer: low-cardinality
/// strings repeated across most rows of a shard.
pub const DICTIONARY_ENCODED_COLUMNS: &[&str] = &["collection", "shard_file", "mime"];
