//! Alternate C5 backend: delegate the sort to DuckDB's own `ORDER BY` with
//! spill-to-disk, run in a dedicated subprocess with a bounded memory limit.
//! The parent process only supervises exit codes; [`run_worker`] is the
//! code the child actually executes once relaunched.

use std::path::Path;
use std::process::ExitStatus;

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::error::SortError;

/// Env var a relaunched child checks to know it should run [`run_worker`]
/// instead of the normal CLI dispatch.
pub const DUCKDB_SORT_WORKER_ENV: &str = "CCINDEX_DUCKDB_SORT_WORKER";

/// Sort `source_path` into `output_path` via DuckDB's `ORDER BY`, spilling
/// to `temp_dir` once `memory_limit_gb` is exceeded. Runs entirely within
/// the calling process — callers that want subprocess isolation relaunch
/// the binary with [`DUCKDB_SORT_WORKER_ENV`] set and have the child call
/// this from its own `main()`.
pub fn run_worker(source_path: &Path, output_path: &Path, memory_limit_gb: f64, temp_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(temp_dir).with_context(|| format!("creating {}", temp_dir.display()))?;
    let conn = Connection::open_in_memory().context("opening duckdb")?;
    conn.execute_batch(&format!(
        "PRAGMA memory_limit='{memory_limit_gb}GB'; PRAGMA temp_directory='{}';",
        temp_dir.display()
    ))
    .context("configuring duckdb session")?;
    conn.execute_batch(&format!(
        "COPY (SELECT * FROM read_parquet('{src}') ORDER BY host_rev NULLS LAST, url, ts)
         TO '{out}' (FORMAT PARQUET);",
        src = source_path.display(),
        out = output_path.display(),
    ))
    .context("running sort query")?;
    Ok(())
}

/// What the retry supervisor should do after observing one subprocess exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// SIGSEGV/SIGKILL: treat as memory exhaustion, bump the limit and halve
    /// worker concurrency before the next attempt.
    BumpMemoryAndHalveWorkers,
    /// Any other nonzero exit: bump the memory limit only.
    BumpMemoryOnly,
    /// Exited successfully.
    Done,
}

/// The deterministic exit-code policy from C5/C10: success is terminal,
/// a segfault-like exit bumps memory and halves worker count, anything
/// else just bumps memory.
pub fn retry_action_for_exit(status: &ExitStatus) -> RetryAction {
    if status.success() {
        RetryAction::Done
    } else if ccindex_core::is_oom_like_exit(status) {
        RetryAction::BumpMemoryAndHalveWorkers
    } else {
        RetryAction::BumpMemoryOnly
    }
}

/// Resource plan for one subprocess attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubprocessPlan {
    pub memory_limit_gb: f64,
    pub workers: usize,
}

impl SubprocessPlan {
    fn bumped(self) -> Self {
        Self {
            memory_limit_gb: self.memory_limit_gb * 2.0,
            workers: self.workers,
        }
    }

    fn bumped_and_halved(self) -> Self {
        Self {
            memory_limit_gb: self.memory_limit_gb * 2.0,
            workers: (self.workers / 2).max(1),
        }
    }
}

/// Drive `spawn` (one subprocess attempt, given the current plan) until it
/// succeeds or `max_attempts` is exhausted, applying [`retry_action_for_exit`]
/// between attempts. Decoupled from actually spawning a process so the
/// policy itself is unit-testable without a real subprocess.
pub fn run_with_retry(
    mut plan: SubprocessPlan,
    max_attempts: u32,
    mut spawn: impl FnMut(SubprocessPlan) -> std::io::Result<ExitStatus>,
) -> Result<SubprocessPlan, SortError> {
    for attempt in 1..=max_attempts {
        let status = spawn(plan).map_err(|e| SortError::SubprocessInstability {
            detail: format!("attempt {attempt}: spawn failed: {e}"),
            signal_like: false,
        })?;

        match retry_action_for_exit(&status) {
            RetryAction::Done => return Ok(plan),
            RetryAction::BumpMemoryAndHalveWorkers if attempt < max_attempts => {
                log::warn!("duckdb sort backend: attempt {attempt} killed (memory pressure), bumping memory and halving workers");
                plan = plan.bumped_and_halved();
            }
            RetryAction::BumpMemoryOnly if attempt < max_attempts => {
                log::warn!("duckdb sort backend: attempt {attempt} exited abnormally, bumping memory");
                plan = plan.bumped();
            }
            RetryAction::BumpMemoryAndHalveWorkers | RetryAction::BumpMemoryOnly => {
                return Err(SortError::SubprocessInstability {
                    detail: format!("exhausted {max_attempts} attempts"),
                    signal_like: matches!(retry_action_for_exit(&status), RetryAction::BumpMemoryAndHalveWorkers),
                });
            }
        }
    }
    unreachable!("loop always returns on its final iteration")
}
