//! C5: the external merge sorter. Sorts one pointer shard by
//! `(host_rev, url, timestamp)` (nulls-last) via chunk-sort-then-k-way-merge,
//! with an alternate DuckDB-subprocess backend for very large shards.

mod batch;
mod chunk;
mod config;
mod duckdb_backend;
mod error;
mod key;
mod merge;
mod runner;
mod sort;

pub use config::{discover_collections, year_from_collection, SortConfig};
pub use duckdb_backend::{run_with_retry, run_worker, RetryAction, SubprocessPlan, DUCKDB_SORT_WORKER_ENV};
pub use error::SortError;
pub use key::{sort_key, SortKey};
pub use runner::{run, SortSummary};
pub use sort::{sort_shard, SortOutcome};
