use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Int32Array, Int64Array, RecordBatch, StringArray};
use ccindex_core::{ParquetCompression, ParquetSink, PointerRecord, pointer_schema, pointer_schema_ref, rev};
use ccindex_index::{
    CollectionRef, IndexConfig, MasterIndexConfig, ResolveConfig, ResolveLevel, YearIndexConfig,
    YearRef, build_master_index, build_year_index, index_collection, resolve,
};
use tempfile::TempDir;

fn record(host: &str, seq: i64) -> PointerRecord {
    PointerRecord {
        collection: "CC-MAIN-2024-10".to_string(),
        shard_file: "cdx-00000.gz".to_string(),
        surt: None,
        timestamp: format!("2024030100{seq:04}"),
        url: format!("https://{host}/page{seq}"),
        host: Some(host.to_string()),
        host_rev: Some(rev(host)),
        status: Some(200),
        mime: Some("text/html".to_string()),
        digest: Some(format!("sha1:{seq:040}")),
        warc_filename: Some("crawl.warc.gz".to_string()),
        warc_offset: Some(seq * 1000),
        warc_length: Some(500),
    }
}

fn records_to_batch(records: &[PointerRecord]) -> RecordBatch {
    let schema = Arc::new(pointer_schema());
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.collection.clone()))),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.shard_file.clone()))),
            Arc::new(StringArray::from(records.iter().map(|r| r.surt.clone()).collect::<Vec<_>>())),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.timestamp.clone()))),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.url.clone()))),
            Arc::new(StringArray::from(records.iter().map(|r| r.host.clone()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(records.iter().map(|r| r.host_rev.clone()).collect::<Vec<_>>())),
            Arc::new(Int32Array::from(records.iter().map(|r| r.status).collect::<Vec<_>>())),
            Arc::new(StringArray::from(records.iter().map(|r| r.mime.clone()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(records.iter().map(|r| r.digest.clone()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(records.iter().map(|r| r.warc_filename.clone()).collect::<Vec<_>>())),
            Arc::new(Int64Array::from(records.iter().map(|r| r.warc_offset).collect::<Vec<_>>())),
            Arc::new(Int64Array::from(records.iter().map(|r| r.warc_length).collect::<Vec<_>>())),
        ],
    )
    .unwrap()
}

/// Write one sorted shard as a single Parquet row group (records are assumed
/// already sorted by `host_rev` by the caller, as the real sorter guarantees).
fn write_sorted_shard(dir: &Path, name: &str, hosts: &[&str]) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let schema = pointer_schema_ref();
    let mut sink =
        ParquetSink::with_default_row_group_size(path.clone(), &schema, ParquetCompression::Snappy).unwrap();
    let records: Vec<PointerRecord> =
        hosts.iter().enumerate().map(|(i, host)| record(host, i as i64)).collect();
    sink.write_batch(&records_to_batch(&records)).unwrap();
    sink.finalize().unwrap();
    path
}

fn index_one_collection(root: &Path, collection: &str, hosts: &[&str]) -> PathBuf {
    let shards_dir = root.join(collection).join("sorted");
    write_sorted_shard(&shards_dir, "cdx-00000.gz.sorted.parquet", hosts);

    let collection_db_path = root.join(format!("{collection}.duckdb"));
    index_collection(&IndexConfig {
        collection: collection.to_string(),
        shards_dir,
        parquet_root: root.to_path_buf(),
        collection_db_path: collection_db_path.clone(),
        only: None,
    })
    .unwrap();
    collection_db_path
}

#[test]
fn index_collection_splits_contiguous_runs_into_segments() {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new().unwrap();

    let collection_db_path =
        index_one_collection(tmp.path(), "CC-MAIN-2024-10", &["a.com", "a.com", "b.org", "c.net", "c.net"]);

    let conn = duckdb::Connection::open(&collection_db_path).unwrap();
    let segment_count: i64 = conn.query_row("SELECT COUNT(*) FROM row_group_segments", [], |r| r.get(0)).unwrap();
    assert_eq!(segment_count, 3, "three contiguous host_rev runs");

    let distinct_hosts: i64 =
        conn.query_row("SELECT COUNT(DISTINCT host_rev) FROM domain_shards", [], |r| r.get(0)).unwrap();
    assert_eq!(distinct_hosts, 3);
}

#[test]
fn resolve_at_collection_level_returns_only_matching_rows_in_shard_order() {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new().unwrap();

    let collection_db_path = index_one_collection(
        tmp.path(),
        "CC-MAIN-2024-10",
        &["a.com", "a.com", "b.org", "example.com", "example.com", "example.com"],
    );

    let matches: Vec<_> = resolve(&ResolveConfig {
        domain: "example.com".to_string(),
        parquet_root: tmp.path().to_path_buf(),
        level: ResolveLevel::Collection {
            collection: "CC-MAIN-2024-10".to_string(),
            collection_db_path,
        },
        year_filter: None,
        max_parquet_files: usize::MAX,
        max_matches: usize::MAX,
        per_shard_cap: usize::MAX,
    })
    .unwrap()
    .collect::<anyhow::Result<Vec<_>>>()
    .unwrap();

    assert_eq!(matches.len(), 3);
    assert!(matches.iter().all(|m| m.record.host.as_deref() == Some("example.com")));
    // rows preserved in on-disk order within the shard
    let urls: Vec<_> = matches.iter().map(|m| m.record.url.clone()).collect();
    assert_eq!(urls, vec!["https://example.com/page3", "https://example.com/page4", "https://example.com/page5"]);
}

#[test]
fn resolve_matches_subdomains_via_reverse_domain_prefix() {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new().unwrap();

    let collection_db_path =
        index_one_collection(tmp.path(), "CC-MAIN-2024-10", &["blog.example.com", "shop.example.com", "other.net"]);

    let matches: Vec<_> = resolve(&ResolveConfig {
        domain: "example.com".to_string(),
        parquet_root: tmp.path().to_path_buf(),
        level: ResolveLevel::Collection {
            collection: "CC-MAIN-2024-10".to_string(),
            collection_db_path,
        },
        year_filter: None,
        max_parquet_files: usize::MAX,
        max_matches: usize::MAX,
        per_shard_cap: usize::MAX,
    })
    .unwrap()
    .collect::<anyhow::Result<Vec<_>>>()
    .unwrap();

    assert_eq!(matches.len(), 2, "querying the parent domain must match both subdomains");
}

#[test]
fn resolve_caps_results_with_max_matches_and_per_shard_cap() {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new().unwrap();

    let collection_db_path =
        index_one_collection(tmp.path(), "CC-MAIN-2024-10", &["cap.com", "cap.com", "cap.com", "cap.com"]);

    let capped: Vec<_> = resolve(&ResolveConfig {
        domain: "cap.com".to_string(),
        parquet_root: tmp.path().to_path_buf(),
        level: ResolveLevel::Collection {
            collection: "CC-MAIN-2024-10".to_string(),
            collection_db_path: collection_db_path.clone(),
        },
        year_filter: None,
        max_parquet_files: usize::MAX,
        max_matches: 2,
        per_shard_cap: usize::MAX,
    })
    .unwrap()
    .collect::<anyhow::Result<Vec<_>>>()
    .unwrap();
    assert_eq!(capped.len(), 2);

    let shard_capped: Vec<_> = resolve(&ResolveConfig {
        domain: "cap.com".to_string(),
        parquet_root: tmp.path().to_path_buf(),
        level: ResolveLevel::Collection { collection: "CC-MAIN-2024-10".to_string(), collection_db_path },
        year_filter: None,
        max_parquet_files: usize::MAX,
        max_matches: usize::MAX,
        per_shard_cap: 1,
    })
    .unwrap()
    .collect::<anyhow::Result<Vec<_>>>()
    .unwrap();
    assert_eq!(shard_capped.len(), 1, "per_shard_cap limits matches taken from a single shard");
}

#[test]
fn year_and_master_index_traverse_the_full_meta_chain() {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new().unwrap();

    let jan_db = index_one_collection(tmp.path(), "CC-MAIN-2024-05", &["jan.example.com"]);
    let oct_db = index_one_collection(tmp.path(), "CC-MAIN-2024-41", &["oct.example.com"]);

    let year_db_path = tmp.path().join("2024.duckdb");
    let year_summary = build_year_index(&YearIndexConfig {
        year: "2024".to_string(),
        year_db_path: year_db_path.clone(),
        collections: vec![
            CollectionRef { collection: "CC-MAIN-2024-05".to_string(), collection_db_path: jan_db },
            CollectionRef { collection: "CC-MAIN-2024-41".to_string(), collection_db_path: oct_db },
        ],
    })
    .unwrap();
    assert_eq!(year_summary.collections_registered, 2);

    let master_db_path = tmp.path().join("master.duckdb");
    let master_summary = build_master_index(&MasterIndexConfig {
        master_db_path: master_db_path.clone(),
        years: vec![YearRef { year: "2024".to_string(), year_db_path: year_db_path.clone() }],
    })
    .unwrap();
    assert_eq!(master_summary.years_registered, 1);
    assert_eq!(master_summary.collections_summarized, 2);

    // resolving at the Year level should see both collections
    let from_year: Vec<_> = resolve(&ResolveConfig {
        domain: "example.com".to_string(),
        parquet_root: tmp.path().to_path_buf(),
        level: ResolveLevel::Year { year_db_path: year_db_path.clone() },
        year_filter: None,
        max_parquet_files: usize::MAX,
        max_matches: usize::MAX,
        per_shard_cap: usize::MAX,
    })
    .unwrap()
    .collect::<anyhow::Result<Vec<_>>>()
    .unwrap();
    assert_eq!(from_year.len(), 2, "resolving from the year level must traverse both registered collections");

    // resolving at the Master level with no year filter should also see both
    let from_master: Vec<_> = resolve(&ResolveConfig {
        domain: "example.com".to_string(),
        parquet_root: tmp.path().to_path_buf(),
        level: ResolveLevel::Master { master_db_path },
        year_filter: None,
        max_parquet_files: usize::MAX,
        max_matches: usize::MAX,
        per_shard_cap: usize::MAX,
    })
    .unwrap()
    .collect::<anyhow::Result<Vec<_>>>()
    .unwrap();
    assert_eq!(from_master.len(), 2);
}

#[test]
fn master_level_resolve_honors_year_filter() {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new().unwrap();

    let y2023_collection_db = index_one_collection(tmp.path(), "CC-MAIN-2023-06", &["filtered.example.com"]);
    let y2024_collection_db = index_one_collection(tmp.path(), "CC-MAIN-2024-10", &["filtered.example.com"]);

    let y2023_db = tmp.path().join("2023.duckdb");
    build_year_index(&YearIndexConfig {
        year: "2023".to_string(),
        year_db_path: y2023_db.clone(),
        collections: vec![CollectionRef {
            collection: "CC-MAIN-2023-06".to_string(),
            collection_db_path: y2023_collection_db,
        }],
    })
    .unwrap();

    let y2024_db = tmp.path().join("2024.duckdb");
    build_year_index(&YearIndexConfig {
        year: "2024".to_string(),
        year_db_path: y2024_db.clone(),
        collections: vec![CollectionRef {
            collection: "CC-MAIN-2024-10".to_string(),
            collection_db_path: y2024_collection_db,
        }],
    })
    .unwrap();

    let master_db_path = tmp.path().join("master.duckdb");
    build_master_index(&MasterIndexConfig {
        master_db_path: master_db_path.clone(),
        years: vec![
            YearRef { year: "2023".to_string(), year_db_path: y2023_db },
            YearRef { year: "2024".to_string(), year_db_path: y2024_db },
        ],
    })
    .unwrap();

    let only_2024: Vec<_> = resolve(&ResolveConfig {
        domain: "filtered.example.com".to_string(),
        parquet_root: tmp.path().to_path_buf(),
        level: ResolveLevel::Master { master_db_path },
        year_filter: Some("2024".to_string()),
        max_parquet_files: usize::MAX,
        max_matches: usize::MAX,
        per_shard_cap: usize::MAX,
    })
    .unwrap()
    .collect::<anyhow::Result<Vec<_>>>()
    .unwrap();

    assert_eq!(only_2024.len(), 1, "year_filter must exclude the 2023 collection entirely");
    assert_eq!(only_2024[0].collection, "CC-MAIN-2024-10");
}

#[test]
fn index_collection_rebuild_is_idempotent() {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new().unwrap();
    let shards_dir = tmp.path().join("CC-MAIN-2024-10").join("sorted");
    write_sorted_shard(&shards_dir, "cdx-00000.gz.sorted.parquet", &["a.com", "b.org"]);

    let config = IndexConfig {
        collection: "CC-MAIN-2024-10".to_string(),
        shards_dir,
        parquet_root: tmp.path().to_path_buf(),
        collection_db_path: tmp.path().join("CC-MAIN-2024-10.duckdb"),
        only: None,
    };

    let first = index_collection(&config).unwrap();
    let second = index_collection(&config).unwrap();
    assert_eq!(first.segments_written, second.segments_written);
    assert_eq!(first.distinct_host_rev_count, second.distinct_host_rev_count);
}

#[test]
fn index_collection_only_restricts_to_named_shards() {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new().unwrap();
    let shards_dir = tmp.path().join("CC-MAIN-2024-10").join("sorted");
    write_sorted_shard(&shards_dir, "cdx-00000.gz.sorted.parquet", &["a.com"]);
    write_sorted_shard(&shards_dir, "cdx-00001.gz.sorted.parquet", &["b.org", "c.net"]);

    let config = IndexConfig {
        collection: "CC-MAIN-2024-10".to_string(),
        shards_dir,
        parquet_root: tmp.path().to_path_buf(),
        collection_db_path: tmp.path().join("CC-MAIN-2024-10.duckdb"),
        only: Some(vec!["cdx-00001.gz.sorted.parquet".to_string()]),
    };

    let summary = index_collection(&config).unwrap();
    assert_eq!(summary.shards_indexed, 1);
    assert_eq!(summary.distinct_host_rev_count, 2);
}

#[test]
fn resolve_with_no_matching_domain_yields_no_results() {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp = TempDir::new().unwrap();
    let collection_db_path = index_one_collection(tmp.path(), "CC-MAIN-2024-10", &["present.com"]);

    let matches: Vec<_> = resolve(&ResolveConfig {
        domain: "absent.com".to_string(),
        parquet_root: tmp.path().to_path_buf(),
        level: ResolveLevel::Collection { collection: "CC-MAIN-2024-10".to_string(), collection_db_path },
        year_filter: None,
        max_parquet_files: usize::MAX,
        max_matches: usize::MAX,
        per_shard_cap: usize::MAX,
    })
    .unwrap()
    .collect::<anyhow::Result<Vec<_>>>()
    .unwrap();

    assert!(matches.is_empty());
}
