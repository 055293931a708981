//! `PointerRecord` <-> Arrow `RecordBatch` conversion for chunk spilling and
//! merge output. Same column layout the ingest writer uses.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int32Array, Int64Array, RecordBatch, StringArray};
use arrow::error::ArrowError;
use ccindex_core::{pointer_schema_ref, PointerRecord};

pub fn records_to_batch(rows: &[PointerRecord]) -> Result<RecordBatch, ArrowError> {
    let collection: ArrayRef = Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.collection.as_str())));
    let shard_file: ArrayRef = Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.shard_file.as_str())));
    let surt: ArrayRef = Arc::new(StringArray::from(rows.iter().map(|r| r.surt.as_deref()).collect::<Vec<_>>()));
    let ts: ArrayRef = Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.timestamp.as_str())));
    let url: ArrayRef = Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.url.as_str())));
    let host: ArrayRef = Arc::new(StringArray::from(rows.iter().map(|r| r.host.as_deref()).collect::<Vec<_>>()));
    let host_rev: ArrayRef = Arc::new(StringArray::from(rows.iter().map(|r| r.host_rev.as_deref()).collect::<Vec<_>>()));
    let status: ArrayRef = Arc::new(Int32Array::from(rows.iter().map(|r| r.status).collect::<Vec<_>>()));
    let mime: ArrayRef = Arc::new(StringArray::from(rows.iter().map(|r| r.mime.as_deref()).collect::<Vec<_>>()));
    let digest: ArrayRef = Arc::new(StringArray::from(rows.iter().map(|r| r.digest.as_deref()).collect::<Vec<_>>()));
    let warc_filename: ArrayRef =
        Arc::new(StringArray::from(rows.iter().map(|r| r.warc_filename.as_deref()).collect::<Vec<_>>()));
    let warc_offset: ArrayRef = Arc::new(Int64Array::from(rows.iter().map(|r| r.warc_offset).collect::<Vec<_>>()));
    let warc_length: ArrayRef = Arc::new(Int64Array::from(rows.iter().map(|r| r.warc_length).collect::<Vec<_>>()));

    RecordBatch::try_new(
        pointer_schema_ref(),
        vec![
            collection,
            shard_file,
            surt,
            ts,
            url,
            host,
            host_rev,
            status,
            mime,
            digest,
            warc_filename,
            warc_offset,
            warc_length,
        ],
    )
}
