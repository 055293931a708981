//! Supervisor configuration, matching the `supervise` CLI surface.

use std::path::PathBuf;

use crate::stage::StageRoots;

#[derive(Debug, Clone)]
pub struct SuperviseConfig {
    pub ccindex_root: PathBuf,
    pub db_dir: PathBuf,
    pub parquet_out: PathBuf,
    pub collections: Vec<String>,
    pub max_parallel: usize,
    pub threads_per_worker: usize,
    pub min_mem_to_start_gib: f64,
    pub max_attempts: u32,
    pub retry_backoff_seconds: u64,
    pub max_backoff_seconds: u64,
    pub dry_run: bool,
    /// How often the poll loop wakes to reap children and consider starts.
    pub tick_interval: std::time::Duration,
    /// How long a child is given to exit gracefully after the parent asks
    /// it to stop before being force-killed.
    pub grace_period: std::time::Duration,
}

impl SuperviseConfig {
    pub fn new(ccindex_root: PathBuf, db_dir: PathBuf, parquet_out: PathBuf, collections: Vec<String>) -> Self {
        Self {
            ccindex_root,
            db_dir,
            parquet_out,
            collections,
            max_parallel: 1,
            threads_per_worker: 1,
            min_mem_to_start_gib: 2.0,
            max_attempts: 5,
            retry_backoff_seconds: 30,
            max_backoff_seconds: 3600,
            dry_run: false,
            tick_interval: std::time::Duration::from_secs(5),
            grace_period: std::time::Duration::from_secs(10),
        }
    }

    pub fn stage_roots(&self) -> StageRoots {
        StageRoots {
            ccindex_root: self.ccindex_root.clone(),
            parquet_root: self.parquet_out.clone(),
            db_dir: self.db_dir.clone(),
            threads_per_worker: self.threads_per_worker,
        }
    }

    pub fn paths(&self) -> ccindex_core::Paths {
        ccindex_core::Paths::new(self.ccindex_root.clone(), self.parquet_out.clone(), self.db_dir.clone())
    }
}

/// Resolve the collections a `supervise` run should manage: an explicit
/// list takes precedence; otherwise every subdirectory of `ccindex_root`
/// matching `collections_regex` is selected (a glob, same substitution as
/// `ingest --filter` — see DESIGN.md).
pub fn discover_collections(ccindex_root: &std::path::Path, explicit: Option<&[String]>, collections_glob: Option<&str>) -> anyhow::Result<Vec<String>> {
    if let Some(explicit) = explicit {
        return Ok(explicit.to_vec());
    }
    use anyhow::Context;
    let pattern = collections_glob.map(glob::Pattern::new).transpose().context("invalid --collections-regex glob")?;
    let mut collections: Vec<String> = std::fs::read_dir(ccindex_root)
        .with_context(|| format!("reading {}", ccindex_root.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| pattern.as_ref().map_or(true, |p| p.matches(name)))
        .collect();
    collections.sort();
    Ok(collections)
}
