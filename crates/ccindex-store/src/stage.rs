//! Stage definitions and input hashing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash;

/// Pipeline stage identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Ingest,
    Sort,
    Index,
    Meta,
}

impl StageName {
    /// Directory name used under the content-addressable store root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Sort => "sort",
            Self::Index => "index",
            Self::Meta => "meta",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Content-affecting configuration for a stage, serialized to compute its
/// input hash.
///
/// Fields must be in a fixed order (struct field order via serde). Vec
/// fields are sorted before serialization for determinism.
#[derive(Debug, Clone, Serialize)]
pub struct StageInput {
    pub stage: StageName,
    /// Canonical JSON of content-affecting config fields. Built differently
    /// per stage.
    pub config_json: String,
}

impl StageInput {
    /// Compute the blake3 input hash from the canonical config JSON.
    pub fn input_hash(&self) -> blake3::Hash {
        hash::hash_bytes(self.config_json.as_bytes())
    }

    /// Short (8-char hex) input hash.
    pub fn short_hash(&self) -> String {
        hash::short_hash(&self.input_hash())
    }
}

/// Content-affecting fields for the ingest stage (C2+C3+C4): parsing CDXJ
/// for one collection and writing unsorted pointer shards.
#[derive(Debug, Clone, Serialize)]
pub struct IngestInput {
    pub collection: String,
    pub batch_rows: usize,
    pub parquet_compression: String,
}

/// Content-affecting fields for the sort stage (C5): rewriting a
/// collection's shards in `(host_rev, url, ts)` order.
#[derive(Debug, Clone, Serialize)]
pub struct SortInput {
    pub collection: String,
    pub memory_per_worker_gb: f64,
    pub use_subprocess_backend: bool,
}

/// Content-affecting fields for the row-group indexer (C6).
#[derive(Debug, Clone, Serialize)]
pub struct IndexInput {
    pub collection: String,
    pub batch_size: usize,
}

/// Content-affecting fields for the meta-index builder (C7). Uses content
/// hashes from upstream per-collection indexes rather than re-deriving
/// their config, so a rebuild is only triggered when an upstream index
/// actually changed.
#[derive(Debug, Clone, Serialize)]
pub struct MetaInput {
    pub collection_index_hashes: Vec<String>,
}

/// Build a StageInput from typed config.
pub fn make_stage_input<T: Serialize>(stage: StageName, config: &T) -> StageInput {
    let config_json =
        serde_json::to_string(config).expect("StageInput config serialization should never fail");
    StageInput { stage, config_json }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_hash_deterministic() {
        let input = IngestInput {
            collection: "CC-MAIN-2024-10".into(),
            batch_rows: 8192,
            parquet_compression: "zstd".into(),
        };
        let si1 = make_stage_input(StageName::Ingest, &input);
        let si2 = make_stage_input(StageName::Ingest, &input);
        assert_eq!(si1.input_hash(), si2.input_hash());
    }

    #[test]
    fn input_hash_changes_with_config() {
        let input1 = IngestInput {
            collection: "CC-MAIN-2024-10".into(),
            batch_rows: 8192,
            parquet_compression: "zstd".into(),
        };
        let input2 = IngestInput {
            collection: "CC-MAIN-2024-11".into(),
            ..input1.clone()
        };
        let si1 = make_stage_input(StageName::Ingest, &input1);
        let si2 = make_stage_input(StageName::Ingest, &input2);
        assert_ne!(si1.input_hash(), si2.input_hash());
    }

    #[test]
    fn meta_input_sorted_hashes() {
        let mut input = MetaInput {
            collection_index_hashes: vec!["bbb".into(), "aaa".into()],
        };
        input.collection_index_hashes.sort();

        let si = make_stage_input(StageName::Meta, &input);
        assert_eq!(si.short_hash().len(), 8);
    }

    #[test]
    fn stage_name_display() {
        assert_eq!(StageName::Ingest.to_string(), "ingest");
        assert_eq!(StageName::Meta.to_string(), "meta");
    }
}
