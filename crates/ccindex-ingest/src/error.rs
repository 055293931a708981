//! Error taxonomy for the ingest stage (C2 parse, C3 write, C4 ledger).
//!
//! Kept as its own enum, per crate boundary, rather than reusing
//! `ccindex_core::PipelineError` directly — callers convert at the point
//! they aggregate (the CLI command handler, the supervisor) via `From`.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum IngestError {
    /// Source shard vanished between enumeration and open.
    InputMissing { path: PathBuf },
    /// Gzip decode failure at the whole-file level.
    CorruptInput { path: PathBuf, detail: String },
    /// Partial write to the output shard; the `.tmp` is left for the next
    /// run's cleanup pass rather than cleaned up here.
    WriterFailure { path: PathBuf, detail: String },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::InputMissing { path } => write!(f, "input missing: {}", path.display()),
            IngestError::CorruptInput { path, detail } => {
                write!(f, "corrupt input {}: {detail}", path.display())
            }
            IngestError::WriterFailure { path, detail } => {
                write!(f, "writer failure for {}: {detail}", path.display())
            }
        }
    }
}

impl std::error::Error for IngestError {}

impl From<IngestError> for ccindex_core::PipelineError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::InputMissing { path } => ccindex_core::PipelineError::InputMissing {
                path: path.display().to_string(),
            },
            IngestError::CorruptInput { path, detail } => ccindex_core::PipelineError::CorruptInput {
                path: path.display().to_string(),
                detail,
            },
            IngestError::WriterFailure { path, detail } => ccindex_core::PipelineError::WriterFailure {
                path: path.display().to_string(),
                detail,
            },
        }
    }
}
