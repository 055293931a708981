//! End-to-end coverage of C10 using real child processes (`/bin/true` /
//! `/bin/false` standing in for the re-exec'd stage binary, since the CLI's
//! own `ingest`/`sort`/`index-rowgroups` subcommands are exercised directly
//! in their own crates' tests) against a real on-disk ledger and journal.

use std::path::PathBuf;

use ccindex_supervise::{discover_collections, Clock, Outcome, SuperviseConfig, Supervisor};
use duckdb::Connection;
use tempfile::TempDir;

struct FixedClock(i64);
impl Clock for FixedClock {
    fn unix_now(&self) -> i64 {
        self.0
    }
}

fn write_shard(root: &std::path::Path, collection: &str, name: &str) {
    let dir = root.join(collection);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), b"x").unwrap();
}

fn seed_ledger(db_dir: &std::path::Path, collection: &str, rows: i64) {
    let path = db_dir.join("cc_pointers_by_collection").join(format!("{collection}.duckdb"));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE ingest_ledger (shard_path VARCHAR PRIMARY KEY, size_bytes BIGINT, mtime_ns BIGINT, ingested_at VARCHAR, rows BIGINT);").unwrap();
    for i in 0..rows {
        conn.execute(
            "INSERT INTO ingest_ledger VALUES (?, 1, 1, '2024-01-01', 1)",
            duckdb::params![format!("cdx-{i:05}.gz")],
        )
        .unwrap();
    }
}

#[test]
fn collection_with_all_stages_succeeding_is_marked_completed() {
    let dir = TempDir::new().unwrap();
    let ccindex_root = dir.path().join("ccindex");
    let db_dir = dir.path().join("duckdb");
    let parquet_root = dir.path().join("parquet");

    write_shard(&ccindex_root, "CC-MAIN-2024-10", "cdx-00000.gz");
    seed_ledger(&db_dir, "CC-MAIN-2024-10", 1);

    let config = SuperviseConfig::new(ccindex_root, db_dir, parquet_root, vec!["CC-MAIN-2024-10".to_string()]);
    let mut supervisor = Supervisor::new(&config, PathBuf::from("/bin/true"), FixedClock(1_700_000_000)).unwrap();
    let outcome = supervisor.run().unwrap();

    assert_eq!(outcome, Outcome::AllCompleted);
}

#[test]
fn collection_whose_stage_always_fails_is_abandoned_after_max_attempts() {
    let dir = TempDir::new().unwrap();
    let ccindex_root = dir.path().join("ccindex");
    let db_dir = dir.path().join("duckdb");
    let parquet_root = dir.path().join("parquet");

    write_shard(&ccindex_root, "CC-MAIN-2024-10", "cdx-00000.gz");

    let mut config = SuperviseConfig::new(ccindex_root, db_dir, parquet_root, vec!["CC-MAIN-2024-10".to_string()]);
    config.max_attempts = 1;
    config.retry_backoff_seconds = 1;
    let mut supervisor = Supervisor::new(&config, PathBuf::from("/bin/false"), FixedClock(1_700_000_000)).unwrap();
    let outcome = supervisor.run().unwrap();

    assert_eq!(outcome, Outcome::SomeAbandoned);
}

#[test]
fn collection_missing_source_shards_never_consumes_an_attempt() {
    let dir = TempDir::new().unwrap();
    let ccindex_root = dir.path().join("ccindex");
    std::fs::create_dir_all(&ccindex_root).unwrap();
    let collections = discover_collections(&ccindex_root, None, None).unwrap();
    assert!(collections.is_empty(), "no collection directories exist yet");
}

#[test]
fn queue_state_persists_across_a_fresh_supervisor_instance() {
    let dir = TempDir::new().unwrap();
    let ccindex_root = dir.path().join("ccindex");
    let db_dir = dir.path().join("duckdb");
    let parquet_root = dir.path().join("parquet");

    write_shard(&ccindex_root, "CC-MAIN-2024-10", "cdx-00000.gz");
    seed_ledger(&db_dir, "CC-MAIN-2024-10", 1);

    let config = SuperviseConfig::new(ccindex_root, db_dir.clone(), parquet_root, vec!["CC-MAIN-2024-10".to_string()]);
    Supervisor::new(&config, PathBuf::from("/bin/true"), FixedClock(1_700_000_000)).unwrap().run().unwrap();

    let state_path = config.paths().queue_state();
    assert!(state_path.exists());
    let reloaded = ccindex_supervise::QueueState::load(&state_path).unwrap();
    assert!(reloaded.is_completed("CC-MAIN-2024-10"));
}
