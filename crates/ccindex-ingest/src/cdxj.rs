//! C2: parse one CDXJ line into a [`PointerRecord`], and the [`Accumulator`]
//! that buffers parsed records into Arrow batches for the writer.
//!
//! A CDXJ line is `surt ts {json}` or `surt ts url {json}`. Malformed JSON
//! is tolerated (treated as an empty meta object); a line with no URL
//! anywhere (neither the optional third token nor `json["url"]`) is dropped.

use std::sync::Arc;

use arrow::array::{ArrayRef, Int32Array, Int64Array, RecordBatch, StringArray};
use arrow::error::ArrowError;
use ccindex_core::{Accumulator, CdxjMeta, PointerRecord, pointer_schema_ref};
use serde_json::Value;

/// Parse one CDXJ line. Returns `None` for blank lines, `#`-comments, lines
/// too short to contain a SURT+timestamp, and lines with no derivable URL.
pub fn parse_line(line: &str, collection: &str, shard_file: &str) -> Option<PointerRecord> {
    let line = line.trim_end_matching(['\n', '\r']);
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let (head, json_str) = match line.find('{') {
        Some(pos) => (line[..pos].trim_end(), Some(&line[pos..])),
        None => (line, None),
    };

    let mut tokens = head.split_whitespace();
    let surt = tokens.next()?;
    let ts = tokens.next()?;
    let url_token = tokens.next();

    let meta_value: Option<Value> = json_str.and_then(|s| serde_json::from_str(s).ok());

    let url = match url_token {
        Some(u) => u.to_string(),
        None => {
            let Some(Value::Object(map)) = &meta_value else {
                return None;
            };
            map.get("url")?.as_str()?.to_string()
        }
    };

    let meta = build_meta(meta_value);
    Some(PointerRecord::new(
        collection,
        shard_file,
        Some(surt.to_string()),
        ts.to_string(),
        url,
        meta,
    ))
}

/// Best-effort int coercion: JSON numbers coerce directly (floats truncate),
/// numeric strings parse, `"-"` (CDXJ's "field absent" marker) and booleans
/// are rejected.
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) if s == "-" => None,
        Value::String(s) => s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().map(|f| f as i64)),
        _ => None,
    }
}

fn build_meta(value: Option<Value>) -> CdxjMeta {
    let Some(Value::Object(obj)) = value else {
        return CdxjMeta::Unknown;
    };
    CdxjMeta::Known {
        status: obj.get("status").and_then(coerce_int).map(|i| i as i32),
        mime: obj.get("mime").and_then(|v| v.as_str()).map(str::to_string),
        digest: obj.get("digest").and_then(|v| v.as_str()).map(str::to_string),
        filename: obj.get("filename").and_then(|v| v.as_str()).map(str::to_string),
        offset: obj.get("offset").and_then(coerce_int),
        length: obj.get("length").and_then(coerce_int),
    }
}

/// Buffers parsed [`PointerRecord`]s up to a configurable batch size, then
/// converts them into an Arrow `RecordBatch` against [`pointer_schema_ref`].
pub struct PointerAccumulator {
    rows: Vec<PointerRecord>,
    batch_rows: usize,
}

impl PointerAccumulator {
    pub fn new(batch_rows: usize) -> Self {
        Self {
            rows: Vec::with_capacity(batch_rows.min(65_536)),
            batch_rows,
        }
    }
}

impl Accumulator for PointerAccumulator {
    type Row = PointerRecord;

    fn push(&mut self, row: PointerRecord) {
        self.rows.push(row);
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn is_full(&self) -> bool {
        self.rows.len() >= self.batch_rows
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let rows = std::mem::take(&mut self.rows);
        records_to_batch(&rows)
    }
}

fn records_to_batch(rows: &[PointerRecord]) -> Result<RecordBatch, ArrowError> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_field_line() {
        let line = r#"com,example)/ 20240301000000 https://example.com/ {"status": "200", "mime": "text/html", "digest": "sha1:abc", "filename": "a.warc.gz", "offset": "100", "length": "200"}"#;
        let rec = parse_line(line, "CC-MAIN-2024-10", "cdx-0.gz").unwrap();
        assert_eq!(rec.url, "https://example.com/");
        assert_eq!(rec.status, Some(200));
        assert_eq!(rec.mime.as_deref(), Some("text/html"));
        assert_eq!(rec.warc_offset, Some(100));
        assert_eq!(rec.warc_length, Some(200));
    }

    #[test]
    fn two_field_line_pulls_url_from_json() {
        let line = r#"com,example)/ 20240301000000 {"url": "https://example.com/", "status": "200"}"#;
        let rec = parse_line(line, "CC-MAIN-2024-10", "cdx-0.gz").unwrap();
        assert_eq!(rec.url, "https://example.com/");
        assert_eq!(rec.status, Some(200));
    }

    #[test]
    fn line_with_no_url_anywhere_is_dropped() {
        let line = r#"com,example)/ 20240301000000 {"status": "200"}"#;
        assert!(parse_line(line, "CC-MAIN-2024-10", "cdx-0.gz").is_none());
    }

    #[test]
    fn malformed_json_is_tolerated_as_empty_meta() {
        let line = r#"com,example)/ 20240301000000 https://example.com/ {not valid json"#;
        let rec = parse_line(line, "CC-MAIN-2024-10", "cdx-0.gz").unwrap();
        assert_eq!(rec.url, "https://example.com/");
        assert_eq!(rec.status, None);
        assert_eq!(rec.mime, None);
    }

    #[test]
    fn dash_marker_rejected_as_field_absent() {
        let line = r#"com,example)/ 20240301000000 https://example.com/ {"status": "-", "offset": "100"}"#;
        let rec = parse_line(line, "CC-MAIN-2024-10", "cdx-0.gz").unwrap();
        assert_eq!(rec.status, None);
        assert_eq!(rec.warc_offset, Some(100));
    }

    #[test]
    fn boolean_meta_field_rejected() {
        let line = r#"com,example)/ 20240301000000 https://example.com/ {"status": true}"#;
        let rec = parse_line(line, "CC-MAIN-2024-10", "cdx-0.gz").unwrap();
        assert_eq!(rec.status, None);
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert!(parse_line("", "C", "s").is_none());
        assert!(parse_line("   \n", "C", "s").is_none());
        assert!(parse_line("# comment", "C", "s").is_none());
    }

    #[test]
    fn accumulator_is_full_at_configured_batch_rows() {
        let mut acc = PointerAccumulator::new(2);
        assert!(!acc.is_full());
        acc.push(PointerRecord::new("C", "s", None, "20240301000000", "https://a.com/", CdxjMeta::Unknown));
        assert!(!acc.is_full());
        acc.push(PointerRecord::new("C", "s", None, "20240301000000", "https://b.com/", CdxjMeta::Unknown));
        assert!(acc.is_full());
    }

    #[test]
    fn accumulator_take_batch_resets_and_preserves_row_count() {
        let mut acc = PointerAccumulator::new(10);
        acc.push(PointerRecord::new("C", "s", None, "20240301000000", "https://a.com/", CdxjMeta::Unknown));
        acc.push(PointerRecord::new("C", "s", None, "20240301000000", "https://b.com/", CdxjMeta::Unknown));
        let batch = acc.take_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(acc.len(), 0);
    }
}
