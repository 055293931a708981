//! `ccindex fetch` - C9: range-fetch WARC records named by JSON lines on
//! stdin (`{"warc_filename":...,"warc_offset":...,"warc_length":...}`),
//! normally produced by piping `search`'s output through a small filter.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Result;
use ccindex_core::stream::{http_config, set_http_config};
use ccindex_fetch::{fetch_many, FetchConfig, FetchRequest};
use clap::Args;

#[derive(Args, Debug)]
pub struct FetchArgs {
    #[arg(long)]
    pub out_dir: PathBuf,
    #[arg(long, default_value = "https://data.commoncrawl.org/")]
    pub prefix: String,
    #[arg(long)]
    pub max_records: Option<usize>,
    /// Noted for CLI-surface parity; each fetch is already bounded by its
    /// own WARC record length, there's no separate overall byte budget.
    #[arg(long)]
    pub max_bytes: Option<u64>,
    #[arg(long)]
    pub timeout: Option<u64>,
    #[arg(long)]
    pub retries: Option<u32>,
    #[arg(long, default_value_t = 8)]
    pub concurrency: usize,
    #[arg(long)]
    pub overwrite: bool,
}

/// Reads newline-delimited JSON objects off stdin, one per WARC coordinate.
fn read_requests(max_records: Option<usize>) -> Result<Vec<FetchRequest>> {
    let stdin = std::io::stdin();
    let mut requests = Vec::new();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(&line)?;
        let warc_filename = value["warc_filename"].as_str().unwrap_or_default().to_string();
        let warc_offset = value["warc_offset"].as_u64().unwrap_or(0);
        let warc_length = value["warc_length"].as_u64().unwrap_or(0);
        if warc_filename.is_empty() {
            log::warn!("skipping stdin line with no warc_filename: {line}");
            continue;
        }
        requests.push(FetchRequest { warc_filename, warc_offset, warc_length });
        if let Some(max) = max_records {
            if requests.len() >= max {
                break;
            }
        }
    }
    Ok(requests)
}

pub fn run(args: FetchArgs) -> Result<i32> {
    if let Some(max_bytes) = args.max_bytes {
        log::debug!("--max-bytes {max_bytes} noted; each request is already bounded by its WARC record's length");
    }

    let mut http = http_config();
    if let Some(timeout) = args.timeout {
        http.read_timeout_secs = timeout;
        http.connect_timeout_secs = http.connect_timeout_secs.min(timeout);
    }
    if let Some(retries) = args.retries {
        http.max_retries = retries;
    }
    set_http_config(http);

    let requests = read_requests(args.max_records)?;
    if requests.is_empty() {
        log::warn!("no fetch requests on stdin");
        return Ok(0);
    }

    let config = FetchConfig {
        base_prefix: args.prefix,
        out_dir: args.out_dir,
        concurrency: args.concurrency,
        overwrite: args.overwrite,
    };

    let results = fetch_many(&requests, &config);
    let failed = results.iter().filter(|r| !r.ok).count();
    log::info!("fetch: {} requests, {failed} failed", results.len());

    Ok(if failed > 0 { 1 } else { 0 })
}
