//! The `(host_rev, url, timestamp)` sort key, nulls-last.

use ccindex_core::PointerRecord;

/// A comparable sort key. `host_rev` nulls sort after every non-null value,
/// so the first element carries the "is this null" flag rather than relying
/// on `Option`'s own (nulls-first) `Ord` impl.
pub type SortKey = (u8, String, String, String);

pub fn sort_key(rec: &PointerRecord) -> SortKey {
    match &rec.host_rev {
        Some(h) => (0, h.clone(), rec.url.clone(), rec.timestamp.clone()),
        None => (1, String::new(), rec.url.clone(), rec.timestamp.clone()),
    }
}

#[cfg(test)]
pub fn is_sorted(records: &[PointerRecord]) -> bool {
    records.windows(2).all(|w| sort_key(&w[0]) <= sort_key(&w[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    fn rec(host_rev: Option<&str>, url: &str, ts: &str) -> PointerRecord {
        PointerRecord {
            collection: "C".into(),
            shard_file: "s".into(),
            surt: None,
            timestamp: ts.into(),
            url: url.into(),
            host: None,
            host_rev: host_rev.map(str::to_string),
            status: None,
            mime: None,
            digest: None,
            warc_filename: None,
            warc_offset: None,
            warc_length: None,
        }
    }

    #[test]
    fn non_null_host_rev_sorts_before_null() {
        let with_host = rec(Some("com,example"), "https://example.com/", "20240101000000");
        let without_host = rec(None, "https://example.com/", "20240101000000");
        assert!(sort_key(&with_host) < sort_key(&without_host));
    }

    #[test]
    fn ties_on_host_rev_break_on_url() {
        let a = rec(Some("com,example"), "https://a.example.com/", "20240101000000");
        let b = rec(Some("com,example"), "https://b.example.com/", "20240101000000");
        assert!(sort_key(&a) < sort_key(&b));
    }

    #[test]
    fn ties_on_host_rev_and_url_break_on_timestamp() {
        let older = rec(Some("com,example"), "https://example.com/", "20230101000000");
        let newer = rec(Some("com,example"), "https://example.com/", "20240101000000");
        assert!(sort_key(&older) < sort_key(&newer));
    }

    #[test]
    fn is_sorted_detects_out_of_order_records() {
        let a = rec(Some("com,a"), "https://a.com/", "20240101000000");
        let b = rec(Some("com,b"), "https://b.com/", "20240101000000");
        assert!(is_sorted(&[a.clone(), b.clone()]));
        assert!(!is_sorted(&[b, a]));
    }
}
