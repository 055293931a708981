//! `ccindex search` - C8: resolve a domain to its matching pointer records.

use std::path::PathBuf;

use anyhow::{bail, Result};
use ccindex_index::{resolve, ResolveConfig, ResolveLevel};
use clap::Args;

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[arg(long)]
    pub domain: String,
    #[arg(long)]
    pub year: Option<String>,
    #[arg(long)]
    pub collection: Option<String>,

    #[arg(long)]
    pub master_db: Option<PathBuf>,
    #[arg(long)]
    pub year_db: Option<PathBuf>,
    #[arg(long)]
    pub collection_db: Option<PathBuf>,

    #[arg(long, default_value = ".")]
    pub parquet_root: PathBuf,

    #[arg(long, default_value_t = usize::MAX)]
    pub max_matches: usize,
    #[arg(long, default_value_t = usize::MAX)]
    pub max_parquet_files: usize,
    #[arg(long = "per-parquet-limit", default_value_t = usize::MAX)]
    pub per_shard_cap: usize,
}

pub fn run(args: SearchArgs) -> Result<i32> {
    let level = if let Some(path) = args.collection_db {
        ResolveLevel::Collection {
            collection: args.collection.clone().unwrap_or_default(),
            collection_db_path: path,
        }
    } else if let Some(path) = args.year_db {
        ResolveLevel::Year { year_db_path: path }
    } else if let Some(path) = args.master_db {
        ResolveLevel::Master { master_db_path: path }
    } else {
        bail!("one of --collection-db, --year-db, or --master-db is required");
    };

    let config = ResolveConfig {
        domain: args.domain,
        parquet_root: args.parquet_root,
        level,
        year_filter: args.year,
        max_parquet_files: args.max_parquet_files,
        max_matches: args.max_matches,
        per_shard_cap: args.per_shard_cap,
    };

    let mut found = 0usize;
    for result in resolve(&config)? {
        let hit = result?;
        let record = &hit.record;
        println!(
            "{} {} {} {{\"status\":{},\"mime\":{},\"filename\":{},\"offset\":{},\"length\":{}}}",
            hit.collection,
            record.timestamp,
            record.url,
            record.status.map(|s| s.to_string()).unwrap_or_else(|| "null".to_string()),
            record.mime.as_deref().map(|m| format!("\"{m}\"")).unwrap_or_else(|| "null".to_string()),
            record.warc_filename.as_deref().map(|f| format!("\"{f}\"")).unwrap_or_else(|| "null".to_string()),
            record.warc_offset.map(|o| o.to_string()).unwrap_or_else(|| "null".to_string()),
            record.warc_length.map(|l| l.to_string()).unwrap_or_else(|| "null".to_string()),
        );
        found += 1;
    }

    log::info!("search: {found} matches");
    Ok(0)
}
