//! ccindex-index: row-group indexer (C6), meta-index builder (C7), and
//! domain resolver (C8) for the Common Crawl pointer-index pipeline.
//!
//! The three index levels (collection, year, master) are each a standalone
//! DuckDB file. Indexes are rebuilt, never patched in place: each rebuild
//! step writes inside a transaction and the caller is expected to publish
//! via the same atomic tmp-dir/rename convention the rest of the pipeline
//! uses for its outputs.

mod config;
mod resolver;
mod rowgroup;
mod sql;

pub use config::{
    CollectionRef, IndexConfig, MasterIndexConfig, ResolveConfig, ResolveLevel, YearIndexConfig,
    YearRef,
};
pub use resolver::{ResolveIter, ResolvedPointer, resolve};
pub use rowgroup::RowGroupSegment;

use std::path::PathBuf;

use anyhow::{Context, Result};
use duckdb::Connection;

/// Summary returned by [`index_collection`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub shards_indexed: usize,
    pub segments_written: u64,
    pub distinct_host_rev_count: u64,
}

/// C6: (re)build the row-group index for every sorted shard of one
/// collection. Idempotent per shard: each shard's prior segments and
/// domain-shard rows are deleted before the freshly computed ones are
/// inserted, all inside a single transaction.
pub fn index_collection(config: &IndexConfig) -> Result<IndexSummary> {
    if let Some(parent) = config.collection_db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let conn = Connection::open(&config.collection_db_path)
        .with_context(|| format!("opening {}", config.collection_db_path.display()))?;
    conn.execute_batch(sql::create_collection_tables())
        .context("creating collection index tables")?;

    let pattern = config.shards_dir.join("*.sorted.parquet");
    let mut shard_paths: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .context("invalid glob pattern")?
        .filter_map(|e| e.ok())
        .collect();
    if let Some(only) = &config.only {
        shard_paths.retain(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| only.iter().any(|o| o == n))
                .unwrap_or(false)
        });
    }
    shard_paths.sort();

    let mut shards_indexed = 0usize;
    let mut segments_written = 0u64;

    for shard_path in &shard_paths {
        let file_relpath = shard_path
            .strip_prefix(&config.parquet_root)
            .unwrap_or(shard_path)
            .to_string_lossy()
            .into_owned();
        let shard_file = shard_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let segments = rowgroup::scan_row_group_segments(shard_path, &shard_file, &file_relpath)
            .with_context(|| format!("scanning {}", shard_path.display()))?;

        conn.execute_batch("BEGIN TRANSACTION;")?;
        conn.execute(sql::delete_segments_for_shard(), duckdb::params![file_relpath])?;
        conn.execute(sql::delete_domain_shards_for_relpath(), duckdb::params![file_relpath])?;

        let mut distinct_hosts = std::collections::BTreeSet::new();
        {
            let mut seg_stmt = conn.prepare(sql::insert_segment())?;
            let mut dom_stmt = conn.prepare(sql::insert_domain_shard())?;
            for seg in &segments {
                seg_stmt.execute(duckdb::params![
                    seg.shard_file,
                    seg.file_relpath,
                    seg.host_rev,
                    seg.row_group_ix,
                    seg.row_group_start_row,
                    seg.row_group_end_row,
                    seg.segment_start_in_rg,
                    seg.segment_end_in_rg,
                    seg.absolute_start_row,
                    seg.absolute_end_row,
                ])?;
                if distinct_hosts.insert(seg.host_rev.clone()) {
                    dom_stmt.execute(duckdb::params![seg.host_rev, seg.file_relpath])?;
                }
            }
        }
        conn.execute_batch("COMMIT;")?;

        segments_written += segments.len() as u64;
        shards_indexed += 1;
    }

    let distinct_host_rev_count: i64 = conn
        .query_row(sql::count_distinct_host_rev(), [], |row| row.get(0))
        .unwrap_or(0);

    Ok(IndexSummary {
        shards_indexed,
        segments_written,
        distinct_host_rev_count: distinct_host_rev_count.max(0) as u64,
    })
}

/// Summary returned by [`build_year_index`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearIndexSummary {
    pub collections_registered: usize,
}

/// Build a fresh DuckDB file at `final_path.tmp`, hand it to `build`, then
/// atomically rename it into place. Indexes are rebuilt wholesale, never
/// patched in place, so each call starts from an empty file rather than
/// reusing whatever is already published.
fn rebuild_db_atomically(
    final_path: &std::path::Path,
    build: impl FnOnce(&Connection) -> Result<()>,
) -> Result<()> {
    if let Some(parent) = final_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut tmp_os = final_path.as_os_str().to_os_string();
    tmp_os.push(".tmp");
    let tmp_path = PathBuf::from(tmp_os);
    if tmp_path.exists() {
        std::fs::remove_file(&tmp_path)
            .with_context(|| format!("removing stale {}", tmp_path.display()))?;
    }

    let conn = Connection::open(&tmp_path).with_context(|| format!("creating {}", tmp_path.display()))?;
    let result = build(&conn);
    drop(conn);

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    std::fs::rename(&tmp_path, final_path)
        .with_context(|| format!("publishing {}", final_path.display()))?;
    Ok(())
}

/// C7, pass 1: open each per-collection index for the year, register it in
/// `collection_registry`, and copy its aggregate counts. Rebuilds the year
/// index from scratch and publishes it via temp-file rename.
pub fn build_year_index(config: &YearIndexConfig) -> Result<YearIndexSummary> {
    rebuild_db_atomically(&config.year_db_path, |conn| {
        conn.execute_batch(sql::create_year_tables()).context("creating year index tables")?;

        conn.execute_batch("BEGIN TRANSACTION;")?;
        for cref in &config.collections {
            let collection_conn = Connection::open_with_flags(
                &cref.collection_db_path,
                duckdb::Config::default().access_mode(duckdb::AccessMode::ReadOnly)?,
            )
            .with_context(|| format!("opening {}", cref.collection_db_path.display()))?;

            let segment_count: i64 = collection_conn
                .query_row(sql::count_segments(), [], |row| row.get(0))
                .unwrap_or(0);
            let distinct_host_rev_count: i64 = collection_conn
                .query_row(sql::count_distinct_host_rev(), [], |row| row.get(0))
                .unwrap_or(0);

            conn.execute(
                sql::insert_collection_registry_row(),
                duckdb::params![
                    cref.collection,
                    cref.collection_db_path.to_string_lossy(),
                    segment_count,
                    distinct_host_rev_count,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )?;
        }
        conn.execute_batch("COMMIT;")?;
        Ok(())
    })?;

    Ok(YearIndexSummary {
        collections_registered: config.collections.len(),
    })
}

/// Summary returned by [`build_master_index`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterIndexSummary {
    pub years_registered: usize,
    pub collections_summarized: usize,
}

/// C7, pass 2: open each year index, register it in `year_registry`, and
/// build the denormalized `collection_summary` so a domain query can
/// enumerate candidate collections without opening any year DB. Rebuilds the
/// master index from scratch and publishes it via temp-file rename.
pub fn build_master_index(config: &MasterIndexConfig) -> Result<MasterIndexSummary> {
    let mut collections_summarized = 0usize;

    rebuild_db_atomically(&config.master_db_path, |conn| {
        conn.execute_batch(sql::create_master_tables()).context("creating master index tables")?;

        conn.execute_batch("BEGIN TRANSACTION;")?;
        for yref in &config.years {
            let year_conn = Connection::open_with_flags(
                &yref.year_db_path,
                duckdb::Config::default().access_mode(duckdb::AccessMode::ReadOnly)?,
            )
            .with_context(|| format!("opening {}", yref.year_db_path.display()))?;

            conn.execute(
                sql::insert_year_registry_row(),
                duckdb::params![
                    yref.year,
                    yref.year_db_path.to_string_lossy(),
                    chrono::Utc::now().to_rfc3339()
                ],
            )?;

            let mut stmt = year_conn.prepare(
                "SELECT collection, collection_index_path, segment_count, distinct_host_rev_count
                 FROM collection_registry ORDER BY collection",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?;
            for row in rows.filter_map(|r| r.ok()) {
                let (collection, collection_db_path, segment_count, distinct_host_rev_count) = row;
                conn.execute(
                    sql::insert_collection_summary_row(),
                    duckdb::params![
                        yref.year,
                        collection,
                        collection_db_path,
                        segment_count,
                        distinct_host_rev_count
                    ],
                )?;
                collections_summarized += 1;
            }
        }
        conn.execute_batch("COMMIT;")?;
        Ok(())
    })?;

    Ok(MasterIndexSummary {
        years_registered: config.years.len(),
        collections_summarized,
    })
}
