//! C12: per-collection completeness report. The validator is the sole
//! authority that decides "collection done" — supervisor completion
//! detection (C10) is a cheaper, racier approximation used only to decide
//! whether to keep retrying, never the final word.

use serde::Serialize;
use std::path::Path;

use ccindex_core::Paths;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CollectionReport {
    pub collection: String,
    pub source_shards_present: usize,
    pub source_shards_expected: usize,
    pub pointer_shards_present: usize,
    pub pointer_shards_sorted: usize,
    pub collection_index_present: bool,
    pub collection_index_sorted_marker_present: bool,
    pub complete: bool,
}

fn count_glob(pattern: &Path) -> usize {
    glob::glob(&pattern.to_string_lossy()).map(|entries| entries.filter_map(|e| e.ok()).count()).unwrap_or(0)
}

/// A pointer shard counts as present if it has a `.sorted.parquet` sibling,
/// an unsorted `.parquet`, or an `EmptyMarker` sidecar confirming the
/// source shard parsed to zero rows.
fn pointer_shard_present(unsorted_path: &Path, sorted_path: &Path) -> bool {
    sorted_path.exists() || unsorted_path.exists() || Paths::empty_marker(unsorted_path).exists()
}

/// Validate one collection against the canonical on-disk layout.
pub fn validate_collection(paths: &Paths, collection: &str, year: &str) -> CollectionReport {
    let source_dir = paths.collection_source_dir(collection);
    let source_shards_expected = count_glob(&source_dir.join("*.gz"));

    let mut shard_names: Vec<String> = glob::glob(&source_dir.join("*.gz").to_string_lossy())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect()
        })
        .unwrap_or_default();
    shard_names.sort();

    let mut pointer_shards_present = 0usize;
    let mut pointer_shards_sorted = 0usize;
    for shard_file in &shard_names {
        let unsorted = paths.unsorted_shard(year, collection, shard_file);
        let sorted = paths.sorted_shard(year, collection, shard_file);
        if pointer_shard_present(&unsorted, &sorted) {
            pointer_shards_present += 1;
        }
        // An EmptyMarker shard never gets a `.sorted.parquet` sibling — sort
        // globs `*.parquet`, which a zero-row shard never produced — but an
        // empty shard is vacuously sorted, so it still counts.
        if sorted.exists() || Paths::empty_marker(&unsorted).exists() {
            pointer_shards_sorted += 1;
        }
    }

    let collection_db_path = paths.collection_db(collection);
    let collection_index_present = collection_db_path.exists();
    let collection_index_sorted_marker_present = Paths::sorted_marker(&collection_db_path).exists();

    let complete = source_shards_expected > 0
        && pointer_shards_present >= source_shards_expected
        && pointer_shards_sorted >= source_shards_expected
        && collection_index_present
        && collection_index_sorted_marker_present;

    CollectionReport {
        collection: collection.to_string(),
        source_shards_present: source_shards_expected,
        source_shards_expected,
        pointer_shards_present,
        pointer_shards_sorted,
        collection_index_present,
        collection_index_sorted_marker_present,
        complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths(dir: &TempDir) -> Paths {
        Paths::new(dir.path().join("ccindex"), dir.path().join("parquet"), dir.path().join("duckdb"))
    }

    fn write(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn empty_collection_is_incomplete() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        let report = validate_collection(&paths, "CC-MAIN-2024-10", "2024");
        assert!(!report.complete);
        assert_eq!(report.source_shards_expected, 0);
    }

    #[test]
    fn fully_built_collection_is_complete() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        write(&paths.source_shard("CC-MAIN-2024-10", "cdx-00000.gz"));
        write(&paths.sorted_shard("2024", "CC-MAIN-2024-10", "cdx-00000.gz"));
        write(&paths.collection_db("CC-MAIN-2024-10"));
        write(&Paths::sorted_marker(&paths.collection_db("CC-MAIN-2024-10")));

        let report = validate_collection(&paths, "CC-MAIN-2024-10", "2024");
        assert!(report.complete);
        assert_eq!(report.pointer_shards_present, 1);
        assert_eq!(report.pointer_shards_sorted, 1);
    }

    #[test]
    fn empty_marker_counts_as_present_and_vacuously_sorted() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        write(&paths.source_shard("CC-MAIN-2024-10", "cdx-00000.gz"));
        let unsorted = paths.unsorted_shard("2024", "CC-MAIN-2024-10", "cdx-00000.gz");
        write(&Paths::empty_marker(&unsorted));
        write(&paths.collection_db("CC-MAIN-2024-10"));
        write(&Paths::sorted_marker(&paths.collection_db("CC-MAIN-2024-10")));

        let report = validate_collection(&paths, "CC-MAIN-2024-10", "2024");
        assert_eq!(report.pointer_shards_present, 1);
        assert_eq!(report.pointer_shards_sorted, 1);
        assert!(report.complete, "a confirmed-empty shard is vacuously sorted and should still validate as complete");
    }

    #[test]
    fn missing_sorted_marker_is_incomplete_even_with_sorted_shards() {
        let dir = TempDir::new().unwrap();
        let paths = paths(&dir);
        write(&paths.source_shard("CC-MAIN-2024-10", "cdx-00000.gz"));
        write(&paths.sorted_shard("2024", "CC-MAIN-2024-10", "cdx-00000.gz"));
        write(&paths.collection_db("CC-MAIN-2024-10"));

        let report = validate_collection(&paths, "CC-MAIN-2024-10", "2024");
        assert!(!report.complete);
        assert!(!report.collection_index_sorted_marker_present);
    }
}
