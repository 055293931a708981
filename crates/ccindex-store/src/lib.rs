//! ccindex-store: content-addressable store for pipeline stage outputs.
//!
//! Provides blake3-based caching and integrity verification for the
//! ingest/sort/index/meta stages. Each stage's output is stored under its
//! input hash, enabling deterministic cache lookups and the `store`
//! CLI subcommand's list/gc/verify operations.

pub mod hash;
pub mod manifest;
pub mod run_config;
pub mod stage;
pub mod store;

pub use hash::{combine_hashes, hash_bytes, hash_file, short_hash};
pub use manifest::StageManifest;
pub use run_config::RunConfig;
pub use stage::{IndexInput, IngestInput, MetaInput, SortInput, StageInput, StageName, make_stage_input};
pub use store::Store;
