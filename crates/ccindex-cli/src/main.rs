//! ccindex - Common Crawl CDX pointer-index pipeline CLI
//!
//! Builds and queries a compact pointer index over Common Crawl's CDX
//! shards: ingest raw CDXJ into columnar pointer records, sort them for
//! prefix lookups, build row-group and collection/year/master indexes,
//! resolve domains to WARC coordinates, and range-fetch the WARC bytes.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

#[derive(Parser)]
#[command(name = "ccindex")]
#[command(about = "Common Crawl CDX pointer-index pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose (debug-level) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (default: ./ccindex.toml or ~/.config/ccindex/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// C2/C3/C4: parse CDXJ shards into columnar pointer records
    Ingest(cmd::ingest::IngestArgs),
    /// C5: external merge sort pointer shards by (host_rev, url, timestamp)
    Sort(cmd::sort::SortArgs),
    /// C6: (re)build the row-group index for one collection's sorted shards
    IndexRowgroups(cmd::index_rowgroups::IndexRowgroupsArgs),
    /// C7: fold per-collection indexes into year and master indexes
    BuildMeta(cmd::build_meta::BuildMetaArgs),
    /// C8: resolve a domain to its matching pointer records
    Search(cmd::search::SearchArgs),
    /// C9: range-fetch WARC records named on stdin
    Fetch(cmd::fetch::FetchArgs),
    /// C12: report per-collection completeness
    Validate(cmd::validate::ValidateArgs),
    /// C10: supervise the ingest -> sort -> index-rowgroups chain
    Supervise(cmd::supervise::SuperviseArgs),
    /// Manage the content-addressable stage cache
    Store(cmd::store::StoreArgs),
    /// Show the resolved configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    ccindex_core::logging::init_logging(false, cli.verbose, None);

    let run_config = match &cli.config {
        Some(path) => config::from_file(path)?,
        None => config::load()?,
    };

    let code = match cli.command {
        Command::Ingest(args) => cmd::ingest::run(args)?,
        Command::Sort(args) => cmd::sort::run(args)?,
        Command::IndexRowgroups(args) => cmd::index_rowgroups::run(args)?,
        Command::BuildMeta(args) => cmd::build_meta::run(args)?,
        Command::Search(args) => cmd::search::run(args)?,
        Command::Fetch(args) => cmd::fetch::run(args)?,
        Command::Validate(args) => cmd::validate::run_cmd(args)?,
        Command::Supervise(args) => cmd::supervise::run(args)?,
        Command::Store(args) => {
            cmd::store::run(args)?;
            0
        }
        Command::Config => {
            println!("ccindex_root: {}", run_config.ccindex_root().display());
            println!("parquet_root: {}", run_config.parquet_root().display());
            println!("duckdb_root: {}", run_config.duckdb_root().display());
            0
        }
    };

    std::process::exit(code);
}
