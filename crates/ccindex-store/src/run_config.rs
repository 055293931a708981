//! RunConfig: layered TOML + CLI configuration, and the glue that turns it
//! into per-collection [`StageInput`]s for the content-addressable store.
//!
//! Loaded from (in increasing precedence) built-in defaults, an optional
//! TOML file resolved via XDG config search or `--config`, and CLI flags.
//! Mirrors the shape of each subcommand's args so a config file can
//! pre-populate an entire `ingest` or `search` invocation. `${VAR}` tokens
//! inside string fields are expanded against the process environment at
//! load time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::stage::{IndexInput, IngestInput, MetaInput, SortInput, StageInput, StageName, make_stage_input};

/// Top-level configuration file structure (`ccindex.toml`).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RunConfig {
    /// Root directory holding per-collection CDXJ shards.
    #[serde(default)]
    pub ccindex_root: Option<String>,

    /// Root directory for columnar pointer shards.
    #[serde(default)]
    pub parquet_root: Option<String>,

    /// Root directory for DuckDB registries (collection/year/master).
    #[serde(default)]
    pub duckdb_root: Option<String>,

    #[serde(default)]
    pub ingest: Option<IngestConfig>,

    #[serde(default)]
    pub sort: Option<SortConfig>,

    #[serde(default)]
    pub index: Option<IndexConfig>,

    #[serde(default)]
    pub supervise: Option<SuperviseConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_batch_rows")]
    pub batch_rows: usize,
    #[serde(default = "default_compression")]
    pub parquet_compression: String,
    pub progress_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SortConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_memory_per_worker_gb")]
    pub memory_per_worker_gb: f64,
    #[serde(default)]
    pub use_subprocess_backend: bool,
    pub temp_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuperviseConfig {
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_seconds")]
    pub retry_backoff_seconds: u64,
    #[serde(default = "default_memory_limit_gib")]
    pub memory_limit_gib: f64,
    #[serde(default = "default_min_mem_to_start_gib")]
    pub min_mem_to_start_gib: f64,
}

fn default_workers() -> usize {
    1
}
fn default_batch_rows() -> usize {
    8192
}
fn default_compression() -> String {
    "zstd".into()
}
fn default_memory_per_worker_gb() -> f64 {
    4.0
}
fn default_batch_size() -> usize {
    8192
}
fn default_max_parallel() -> usize {
    4
}
fn default_max_attempts() -> u32 {
    5
}
fn default_retry_backoff_seconds() -> u64 {
    30
}
fn default_memory_limit_gib() -> f64 {
    8.0
}
fn default_min_mem_to_start_gib() -> f64 {
    2.0
}

/// Expand `${VAR}` tokens in `s` against the process environment. Unknown
/// variables are left untouched rather than erroring, matching shell
/// parameter-expansion leniency for config files authored once and reused
/// across machines.
pub fn expand_env(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '$' && s[i..].starts_with("${") {
            if let Some(end) = s[i..].find('}') {
                let var_name = &s[i + 2..i + end];
                match std::env::var(var_name) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => out.push_str(&s[i..i + end + 1]),
                }
                for _ in 0..end {
                    chars.next();
                }
                continue;
            }
        }
        out.push(c);
    }
    out
}

impl RunConfig {
    /// Parse a config file from disk, expanding `${VAR}` tokens in every
    /// string-valued root path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        config.ccindex_root = config.ccindex_root.map(|s| expand_env(&s));
        config.parquet_root = config.parquet_root.map(|s| expand_env(&s));
        config.duckdb_root = config.duckdb_root.map(|s| expand_env(&s));
        Ok(config)
    }

    pub fn ccindex_root(&self) -> PathBuf {
        PathBuf::from(self.ccindex_root.clone().unwrap_or_else(|| "./ccindex".into()))
    }

    pub fn parquet_root(&self) -> PathBuf {
        PathBuf::from(self.parquet_root.clone().unwrap_or_else(|| "./parquet".into()))
    }

    pub fn duckdb_root(&self) -> PathBuf {
        PathBuf::from(self.duckdb_root.clone().unwrap_or_else(|| "./duckdb".into()))
    }

    pub fn ingest_batch_rows(&self) -> usize {
        self.ingest.as_ref().map(|c| c.batch_rows).unwrap_or_else(default_batch_rows)
    }

    pub fn ingest_compression(&self) -> String {
        self.ingest
            .as_ref()
            .map(|c| c.parquet_compression.clone())
            .unwrap_or_else(default_compression)
    }

    /// Build the [`StageInput`] for ingesting one collection.
    pub fn ingest_input(&self, collection: &str) -> StageInput {
        let input = IngestInput {
            collection: collection.to_string(),
            batch_rows: self.ingest_batch_rows(),
            parquet_compression: self.ingest_compression(),
        };
        make_stage_input(StageName::Ingest, &input)
    }

    /// Build the [`StageInput`] for sorting one collection.
    pub fn sort_input(&self, collection: &str) -> StageInput {
        let cfg = self.sort.clone();
        let input = SortInput {
            collection: collection.to_string(),
            memory_per_worker_gb: cfg
                .as_ref()
                .map(|c| c.memory_per_worker_gb)
                .unwrap_or_else(default_memory_per_worker_gb),
            use_subprocess_backend: cfg.map(|c| c.use_subprocess_backend).unwrap_or(false),
        };
        make_stage_input(StageName::Sort, &input)
    }

    /// Build the [`StageInput`] for row-group indexing one collection.
    pub fn index_input(&self, collection: &str) -> StageInput {
        let input = IndexInput {
            collection: collection.to_string(),
            batch_size: self.index.as_ref().map(|c| c.batch_size).unwrap_or_else(default_batch_size),
        };
        make_stage_input(StageName::Index, &input)
    }

    /// Build the [`StageInput`] for rebuilding the meta-index from a set of
    /// upstream per-collection index content hashes.
    pub fn meta_input(&self, mut collection_index_hashes: Vec<String>) -> StageInput {
        collection_index_hashes.sort();
        make_stage_input(StageName::Meta, &MetaInput { collection_index_hashes })
    }

    pub fn supervise_max_parallel(&self) -> usize {
        self.supervise.as_ref().map(|c| c.max_parallel).unwrap_or_else(default_max_parallel)
    }

    pub fn supervise_max_attempts(&self) -> u32 {
        self.supervise.as_ref().map(|c| c.max_attempts).unwrap_or_else(default_max_attempts)
    }

    pub fn supervise_retry_backoff_seconds(&self) -> u64 {
        self.supervise
            .as_ref()
            .map(|c| c.retry_backoff_seconds)
            .unwrap_or_else(default_retry_backoff_seconds)
    }

    pub fn supervise_memory_limit_gib(&self) -> f64 {
        self.supervise.as_ref().map(|c| c.memory_limit_gib).unwrap_or_else(default_memory_limit_gib)
    }

    pub fn supervise_min_mem_to_start_gib(&self) -> f64 {
        self.supervise
            .as_ref()
            .map(|c| c.min_mem_to_start_gib)
            .unwrap_or_else(default_min_mem_to_start_gib)
    }
}
