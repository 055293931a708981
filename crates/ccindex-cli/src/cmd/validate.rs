//! `ccindex validate` - C12: report per-collection completeness.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ccindex_core::Paths;
use ccindex_validate::{discover_collections, report, run, ValidateConfig};
use clap::Args;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[arg(long)]
    pub ccindex_dir: PathBuf,
    #[arg(long)]
    pub parquet_dir: PathBuf,
    #[arg(long)]
    pub pointer_dir: PathBuf,

    #[arg(long, value_delimiter = ',')]
    pub collections: Option<Vec<String>>,
    #[arg(long)]
    pub filter: Option<String>,

    #[arg(long)]
    pub json: bool,
}

pub fn run_cmd(args: ValidateArgs) -> Result<i32> {
    let paths = Paths::new(args.ccindex_dir.clone(), args.parquet_dir, args.pointer_dir);

    let collections = discover_collections(&args.ccindex_dir, args.collections.as_deref(), args.filter.as_deref())
        .context("resolving collections")?;
    if collections.is_empty() {
        log::warn!("no collections found under {}", args.ccindex_dir.display());
        return Ok(0);
    }

    let mut config = ValidateConfig::new(paths, collections);
    config.json = args.json;

    let reports = run(&config);
    Ok(report(&config, &reports))
}
