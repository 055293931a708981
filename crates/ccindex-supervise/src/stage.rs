//! The per-collection stage chain: ingest, then sort, then index-rowgroups.
//! Each stage is a re-exec of this same binary scoped to one collection, so
//! a crash in any stage is an ordinary child-process death, never a fault
//! that can corrupt the supervisor's own state.

use std::path::PathBuf;

/// One stage's subcommand and the arguments that scope it to a single
/// collection, relative to the roots the supervisor was given.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    pub subcommand: &'static str,
    pub args: Vec<String>,
}

/// Roots the supervisor was started with, from which each stage's argv is
/// derived.
#[derive(Debug, Clone)]
pub struct StageRoots {
    pub ccindex_root: PathBuf,
    pub parquet_root: PathBuf,
    pub db_dir: PathBuf,
    pub threads_per_worker: usize,
}

/// Build the ordered stage chain for `collection`: ingest -> sort ->
/// index-rowgroups. A collection is "done" only after all three exit 0.
pub fn stage_chain(roots: &StageRoots, collection: &str) -> Vec<StageSpec> {
    let parquet_root = roots.parquet_root.to_string_lossy().into_owned();
    let collection_db = roots.db_dir.join("cc_pointers_by_collection").join(format!("{collection}.duckdb"));

    vec![
        StageSpec {
            subcommand: "ingest",
            args: vec![
                "--ccindex-root".to_string(),
                roots.ccindex_root.to_string_lossy().into_owned(),
                "--parquet-root".to_string(),
                parquet_root.clone(),
                "--duckdb-root".to_string(),
                roots.db_dir.to_string_lossy().into_owned(),
                "--collections".to_string(),
                collection.to_string(),
                "--workers".to_string(),
                "1".to_string(),
            ],
        },
        StageSpec {
            subcommand: "sort",
            args: vec![
                "--parquet-root".to_string(),
                parquet_root.clone(),
                "--workers".to_string(),
                roots.threads_per_worker.to_string(),
            ],
        },
        StageSpec {
            subcommand: "index-rowgroups",
            args: vec!["--parquet-root".to_string(), parquet_root, "--out-db".to_string(), collection_db.to_string_lossy().into_owned()],
        },
    ]
}
