//! SQL for the three index levels (collection, year, master) and the
//! resolver's domain-prefix queries.
//!
//! Strategy: tables are plain, narrow, and rebuilt level-by-level rather
//! than joined across levels in one statement — each level's DB is a
//! self-contained file a resolver can open read-only without touching its
//! neighbors.

/// DDL for a per-collection index: segments plus the shard lookup table.
pub fn create_collection_tables() -> &'static str {
    "CREATE TABLE IF NOT EXISTS row_group_segments (
       shard_file VARCHAR NOT NULL,
       file_relpath VARCHAR NOT NULL,
       host_rev VARCHAR NOT NULL,
       row_group_ix INTEGER NOT NULL,
       row_group_start_row BIGINT NOT NULL,
       row_group_end_row BIGINT NOT NULL,
       segment_start_in_rg INTEGER NOT NULL,
       segment_end_in_rg INTEGER NOT NULL,
       absolute_start_row BIGINT NOT NULL,
       absolute_end_row BIGINT NOT NULL
     );
     CREATE TABLE IF NOT EXISTS domain_shards (
       host_rev VARCHAR NOT NULL,
       parquet_relpath VARCHAR NOT NULL,
       PRIMARY KEY (host_rev, parquet_relpath)
     );"
}

pub fn delete_segments_for_shard() -> &'static str {
    "DELETE FROM row_group_segments WHERE file_relpath = ?"
}

pub fn delete_domain_shards_for_relpath() -> &'static str {
    "DELETE FROM domain_shards WHERE parquet_relpath = ?"
}

pub fn insert_segment() -> &'static str {
    "INSERT INTO row_group_segments (
       shard_file, file_relpath, host_rev, row_group_ix,
       row_group_start_row, row_group_end_row,
       segment_start_in_rg, segment_end_in_rg,
       absolute_start_row, absolute_end_row
     ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
}

pub fn insert_domain_shard() -> &'static str {
    "INSERT INTO domain_shards (host_rev, parquet_relpath) VALUES (?, ?)"
}

pub fn count_segments() -> &'static str {
    "SELECT COUNT(*) FROM row_group_segments"
}

pub fn count_distinct_host_rev() -> &'static str {
    "SELECT COUNT(DISTINCT host_rev) FROM domain_shards"
}

/// Distinct shard relpaths whose `host_rev` equals `domain_rev` or carries it
/// as a prefix (`domain_rev || ',%'`), ordered for deterministic traversal.
pub fn matching_shard_relpaths() -> &'static str {
    "SELECT DISTINCT parquet_relpath FROM domain_shards
     WHERE host_rev = ? OR host_rev LIKE ?
     ORDER BY parquet_relpath"
}

/// Row groups (and the in-row-group span) of one shard that can contain a
/// matching `host_rev`, so the resolver can open only those row groups.
pub fn matching_segments_for_shard() -> &'static str {
    "SELECT row_group_ix, segment_start_in_rg, segment_end_in_rg
     FROM row_group_segments
     WHERE file_relpath = ? AND (host_rev = ? OR host_rev LIKE ?)
     ORDER BY row_group_ix, segment_start_in_rg"
}

// ── Year level ──

pub fn create_year_tables() -> &'static str {
    "CREATE TABLE IF NOT EXISTS collection_registry (
       collection VARCHAR PRIMARY KEY,
       collection_index_path VARCHAR NOT NULL,
       segment_count BIGINT NOT NULL,
       distinct_host_rev_count BIGINT NOT NULL,
       updated_at VARCHAR NOT NULL
     );"
}

pub fn insert_collection_registry_row() -> &'static str {
    "INSERT INTO collection_registry (
       collection, collection_index_path, segment_count,
       distinct_host_rev_count, updated_at
     ) VALUES (?, ?, ?, ?, ?)"
}

/// Collections registered in a year index, in traversal order.
pub fn list_collections_ordered() -> &'static str {
    "SELECT collection, collection_index_path FROM collection_registry ORDER BY collection"
}

// ── Master level ──

pub fn create_master_tables() -> &'static str {
    "CREATE TABLE IF NOT EXISTS year_registry (
       year VARCHAR PRIMARY KEY,
       year_index_path VARCHAR NOT NULL,
       updated_at VARCHAR NOT NULL
     );
     CREATE TABLE IF NOT EXISTS collection_summary (
       year VARCHAR NOT NULL,
       collection VARCHAR NOT NULL,
       collection_db_path VARCHAR NOT NULL,
       segment_count BIGINT NOT NULL,
       distinct_host_rev_count BIGINT NOT NULL,
       PRIMARY KEY (year, collection)
     );"
}

pub fn insert_year_registry_row() -> &'static str {
    "INSERT INTO year_registry (year, year_index_path, updated_at) VALUES (?, ?, ?)"
}

pub fn insert_collection_summary_row() -> &'static str {
    "INSERT INTO collection_summary (
       year, collection, collection_db_path, segment_count, distinct_host_rev_count
     ) VALUES (?, ?, ?, ?, ?)"
}

/// Years registered in the master index, ascending.
pub fn list_years_ordered() -> &'static str {
    "SELECT year, year_index_path FROM year_registry ORDER BY year"
}

/// Every collection in the master's denormalized summary, in traversal
/// order, so a caller can enumerate candidates without opening any year DB.
pub fn list_collection_summaries_ordered() -> &'static str {
    "SELECT collection, collection_db_path FROM collection_summary ORDER BY year, collection"
}

/// Same as [`list_collection_summaries_ordered`] but restricted to one year.
pub fn list_collection_summaries_for_year_ordered() -> &'static str {
    "SELECT collection, collection_db_path FROM collection_summary WHERE year = ? ORDER BY collection"
}
