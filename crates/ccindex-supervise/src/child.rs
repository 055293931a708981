//! Spawning and reaping one collection's currently-running stage process.
//! stdout/stderr are redirected to `<log_dir>/build_<collection>.log`,
//! opened in append mode so a supervisor restart preserves prior attempts'
//! output rather than truncating it.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};

use anyhow::{Context, Result};

use crate::stage::StageSpec;

/// A running (or just-reaped) collection: its current position in the
/// stage chain and the live child, if any.
pub struct CollectionWorker {
    pub collection: String,
    pub stage_index: usize,
    pub child: Child,
}

pub fn log_path(log_dir: &Path, collection: &str) -> PathBuf {
    log_dir.join(format!("build_{collection}.log"))
}

/// Spawn `stage` as a re-exec of `exe`, redirecting output into the
/// collection's log file.
pub fn spawn_stage(exe: &Path, log_dir: &Path, collection: &str, stage: &StageSpec) -> Result<Child> {
    let path = log_path(log_dir, collection);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let stdout = OpenOptions::new().create(true).append(true).open(&path).with_context(|| format!("opening {}", path.display()))?;
    let stderr = stdout.try_clone().with_context(|| format!("cloning handle for {}", path.display()))?;

    Command::new(exe)
        .arg(stage.subcommand)
        .args(&stage.args)
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .with_context(|| format!("spawning {collection} stage {}", stage.subcommand))
}

/// Non-blocking poll: `Some(status)` once the child has exited, `None` if
/// it's still running.
pub fn try_reap(child: &mut Child) -> Result<Option<ExitStatus>> {
    Ok(child.try_wait()?)
}
