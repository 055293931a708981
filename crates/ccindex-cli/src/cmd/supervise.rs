//! `ccindex supervise` - C10: run the ingest -> sort -> index-rowgroups
//! chain for every selected collection as re-exec'd child processes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ccindex_supervise::{discover_collections, install_signal_handlers, Outcome, Supervisor, SuperviseConfig, SystemClock};
use clap::Args;

#[derive(Args, Debug)]
pub struct SuperviseArgs {
    #[arg(long)]
    pub ccindex_root: PathBuf,
    #[arg(long)]
    pub db_dir: PathBuf,
    #[arg(long)]
    pub parquet_out: PathBuf,

    #[arg(long, value_delimiter = ',')]
    pub collections: Option<Vec<String>>,
    #[arg(long)]
    pub collections_regex: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub max_parallel: usize,
    #[arg(long, default_value_t = 1)]
    pub threads_per_worker: usize,
    #[arg(long, default_value_t = 2.0)]
    pub min_mem_to_start_gib: f64,
    #[arg(long, default_value_t = 5)]
    pub max_attempts: u32,
    #[arg(long, default_value_t = 30)]
    pub retry_backoff_seconds: u64,
    #[arg(long, default_value_t = 3600)]
    pub max_backoff_seconds: u64,
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(args: SuperviseArgs) -> Result<i32> {
    install_signal_handlers();

    let collections = discover_collections(&args.ccindex_root, args.collections.as_deref(), args.collections_regex.as_deref())
        .context("resolving collections")?;
    if collections.is_empty() {
        log::warn!("no collections found under {}", args.ccindex_root.display());
        return Ok(0);
    }

    let mut config = SuperviseConfig::new(args.ccindex_root, args.db_dir, args.parquet_out, collections);
    config.max_parallel = args.max_parallel;
    config.threads_per_worker = args.threads_per_worker;
    config.min_mem_to_start_gib = args.min_mem_to_start_gib;
    config.max_attempts = args.max_attempts;
    config.retry_backoff_seconds = args.retry_backoff_seconds;
    config.max_backoff_seconds = args.max_backoff_seconds;
    config.dry_run = args.dry_run;

    let exe = std::env::current_exe().context("resolving current executable for re-exec")?;
    let mut supervisor = Supervisor::new(&config, exe, SystemClock)?;

    let outcome = supervisor.run()?;
    Ok(match outcome {
        Outcome::AllCompleted => 0,
        Outcome::SomeAbandoned => 1,
        Outcome::Interrupted => 130,
    })
}
