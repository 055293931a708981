//! The three WARC coordinates C9 needs, carried separately from
//! [`ccindex_core::PointerRecord`] so this crate doesn't depend on the
//! ingest schema beyond what it actually reads.

use ccindex_core::PointerRecord;

/// One WARC record to fetch: `base_prefix + warc_filename`, byte range
/// `[warc_offset, warc_offset + warc_length)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub warc_filename: String,
    pub warc_offset: u64,
    pub warc_length: u64,
}

impl FetchRequest {
    /// Build a request from a pointer record, or `None` if any of the three
    /// WARC coordinates is missing (e.g. a record parsed from a CDXJ line
    /// whose JSON never carried `filename`/`offset`/`length`).
    pub fn from_pointer(record: &PointerRecord) -> Option<Self> {
        let warc_filename = record.warc_filename.clone()?;
        let warc_offset = u64::try_from(record.warc_offset?).ok()?;
        let warc_length = u64::try_from(record.warc_length?).ok()?;
        Some(Self {
            warc_filename,
            warc_offset,
            warc_length,
        })
    }

    /// Absolute URL: `base_prefix + warc_filename`. No normalization beyond
    /// string concatenation — the prefix is expected to end in `/`.
    pub fn url(&self, base_prefix: &str) -> String {
        format!("{base_prefix}{}", self.warc_filename)
    }

    /// Destination file name under the output directory: the WARC filename
    /// with its directory components flattened, so two collections pointing
    /// at differently-pathed WARCs don't collide and so we never need to
    /// recreate Common Crawl's `crawl-data/.../` directory tree on disk.
    pub fn out_file_name(&self) -> String {
        let flat = self.warc_filename.replace('/', "_");
        format!("{flat}.{}-{}", self.warc_offset, self.warc_length)
    }
}
