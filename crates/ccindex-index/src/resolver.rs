//! C8: resolve a domain to its matching pointer records.
//!
//! The candidate collection/shard plan is computed eagerly — it's a handful
//! of narrow DuckDB queries against index metadata — but shard files are
//! opened and scanned lazily, one row group at a time, as the caller pulls
//! from the returned iterator. Nothing is buffered beyond the row group
//! currently being walked.

use std::collections::{BTreeSet, VecDeque};
use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use arrow::array::{RecordBatch, StringArray};
use ccindex_core::{PointerRecord, host_rev_like_pattern, normalize_host, record_from_batch_row, rev};
use duckdb::{AccessMode, Connection};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};

use crate::config::{ResolveConfig, ResolveLevel};
use crate::sql;

/// A [`PointerRecord`] decorated with the collection and parquet file it was
/// read from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPointer {
    pub collection: String,
    pub parquet_path: PathBuf,
    pub record: PointerRecord,
}

#[derive(Debug, Clone)]
struct CollectionPlan {
    collection: String,
    collection_db_path: PathBuf,
}

#[derive(Debug, Clone)]
struct ShardPlan {
    collection: String,
    parquet_path: PathBuf,
    row_groups: Vec<usize>,
}

fn open_readonly(path: &std::path::Path) -> Result<Connection> {
    let config = duckdb::Config::default().access_mode(AccessMode::ReadOnly)?;
    Connection::open_with_flags(path, config).with_context(|| format!("opening {}", path.display()))
}

fn collection_plans(config: &ResolveConfig) -> Result<Vec<CollectionPlan>> {
    match &config.level {
        ResolveLevel::Collection { collection, collection_db_path } => Ok(vec![CollectionPlan {
            collection: collection.clone(),
            collection_db_path: collection_db_path.clone(),
        }]),
        ResolveLevel::Year { year_db_path } => {
            let conn = open_readonly(year_db_path)?;
            let mut stmt = conn.prepare(sql::list_collections_ordered())?;
            let rows = stmt.query_map([], |row| {
                Ok(CollectionPlan {
                    collection: row.get(0)?,
                    collection_db_path: PathBuf::from(row.get::<_, String>(1)?),
                })
            })?;
            Ok(rows.filter_map(|r| r.ok()).collect())
        }
        ResolveLevel::Master { master_db_path } => {
            // The master's collection_summary already denormalizes each
            // collection's db path, so no year DB needs to be opened here.
            let conn = open_readonly(master_db_path)?;
            let rows = match &config.year_filter {
                Some(year) => {
                    let mut stmt = conn.prepare(sql::list_collection_summaries_for_year_ordered())?;
                    let rows = stmt.query_map(duckdb::params![year], |row| {
                        Ok(CollectionPlan {
                            collection: row.get(0)?,
                            collection_db_path: PathBuf::from(row.get::<_, String>(1)?),
                        })
                    })?;
                    rows.filter_map(|r| r.ok()).collect::<Vec<_>>()
                }
                None => {
                    let mut stmt = conn.prepare(sql::list_collection_summaries_ordered())?;
                    let rows = stmt.query_map([], |row| {
                        Ok(CollectionPlan {
                            collection: row.get(0)?,
                            collection_db_path: PathBuf::from(row.get::<_, String>(1)?),
                        })
                    })?;
                    rows.filter_map(|r| r.ok()).collect::<Vec<_>>()
                }
            };
            Ok(rows)
        }
    }
}

/// Build the shard plan for `config` and return a lazy iterator over
/// matching pointer records. `host_rev` is derived from `config.domain` via
/// [`normalize_host`] + [`rev`], matching the C1 codec exactly.
pub fn resolve(config: &ResolveConfig) -> Result<ResolveIter> {
    let host_rev = rev(&normalize_host(&config.domain));
    let like_pattern = host_rev_like_pattern(&host_rev);

    let mut shard_plans = VecDeque::new();
    'collections: for cref in collection_plans(config)? {
        let conn = open_readonly(&cref.collection_db_path)?;

        let relpaths: Vec<String> = {
            let mut stmt = conn.prepare(sql::matching_shard_relpaths())?;
            stmt.query_map(duckdb::params![host_rev, like_pattern], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect()
        };

        for relpath in relpaths {
            if shard_plans.len() >= config.max_parquet_files {
                break 'collections;
            }
            let parquet_path = config.parquet_root.join(&relpath);
            if !parquet_path.exists() {
                log::warn!("resolver: skipping missing shard {}", parquet_path.display());
                continue;
            }

            let row_groups: BTreeSet<usize> = {
                let mut stmt = conn.prepare(sql::matching_segments_for_shard())?;
                stmt.query_map(duckdb::params![relpath, host_rev, like_pattern], |row| {
                    row.get::<_, i32>(0)
                })?
                .filter_map(|r| r.ok())
                .map(|ix| ix as usize)
                .collect()
            };

            shard_plans.push_back(ShardPlan {
                collection: cref.collection.clone(),
                parquet_path,
                row_groups: row_groups.into_iter().collect(),
            });
        }
    }

    Ok(ResolveIter {
        host_rev,
        max_matches: config.max_matches,
        per_shard_cap: config.per_shard_cap,
        emitted_total: 0,
        shard_plans,
        current: None,
    })
}

struct OpenShard {
    collection: String,
    parquet_path: PathBuf,
    reader: ParquetRecordBatchReader,
    pending: Option<(RecordBatch, usize)>,
    emitted: usize,
}

/// Lazy iterator over a resolved domain's matching pointer records, in
/// sorted-shard order within a collection and meta-index traversal order
/// across collections. Never deduplicates.
pub struct ResolveIter {
    host_rev: String,
    max_matches: usize,
    per_shard_cap: usize,
    emitted_total: usize,
    shard_plans: VecDeque<ShardPlan>,
    current: Option<OpenShard>,
}

impl ResolveIter {
    fn open_next_shard(&mut self) -> Result<bool> {
        let Some(plan) = self.shard_plans.pop_front() else {
            return Ok(false);
        };
        let file = File::open(&plan.parquet_path)
            .with_context(|| format!("opening {}", plan.parquet_path.display()))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let reader = if plan.row_groups.is_empty() {
            builder.build()?
        } else {
            builder.with_row_groups(plan.row_groups).build()?
        };
        self.current = Some(OpenShard {
            collection: plan.collection,
            parquet_path: plan.parquet_path,
            reader,
            pending: None,
            emitted: 0,
        });
        Ok(true)
    }

    /// Try to produce one match from the currently open shard. `Ok(None)`
    /// means the shard is exhausted (or capped) and the caller should move
    /// to the next one.
    fn try_next_from_current(&mut self) -> Result<Option<ResolvedPointer>> {
        let host_rev = self.host_rev.clone();
        let shard = self.current.as_mut().expect("current shard is open");
        if shard.emitted >= self.per_shard_cap {
            return Ok(None);
        }

        loop {
            if shard.pending.is_none() {
                match shard.reader.next() {
                    Some(batch) => shard.pending = Some((batch?, 0)),
                    None => return Ok(None),
                }
            }

            let (batch, row_cursor) = shard.pending.as_mut().expect("just populated");
            let host_rev_idx = batch.schema().index_of("host_rev").context("batch has no host_rev column")?;
            let col = batch
                .column(host_rev_idx)
                .as_any()
                .downcast_ref::<StringArray>()
                .context("host_rev column is not Utf8")?;

            let mut found: Option<usize> = None;
            while *row_cursor < batch.num_rows() {
                let r = *row_cursor;
                *row_cursor += 1;
                let value = if col.is_null(r) { None } else { Some(col.value(r)) };
                let matches = match value {
                    None => false,
                    Some(v) => {
                        v == host_rev
                            || (v.len() > host_rev.len()
                                && v.starts_with(host_rev.as_str())
                                && v.as_bytes()[host_rev.len()] == b',')
                    }
                };
                if matches {
                    found = Some(r);
                    break;
                }
            }

            if let Some(r) = found {
                let (batch, _) = shard.pending.as_ref().expect("just populated");
                let record = record_from_batch_row(batch, r);
                shard.emitted += 1;
                return Ok(Some(ResolvedPointer {
                    collection: shard.collection.clone(),
                    parquet_path: shard.parquet_path.clone(),
                    record,
                }));
            }
            // batch exhausted with no match; drop it and pull the next one
            shard.pending = None;
        }
    }
}

impl Iterator for ResolveIter {
    type Item = Result<ResolvedPointer>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.emitted_total >= self.max_matches {
                return None;
            }
            if self.current.is_none() {
                match self.open_next_shard() {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(e) => return Some(Err(e)),
                }
            }

            match self.try_next_from_current() {
                Ok(Some(m)) => {
                    self.emitted_total += 1;
                    return Some(Ok(m));
                }
                Ok(None) => {
                    self.current = None;
                    continue;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

