//! Error taxonomy for the sort stage (C5): chunk spill, merge, and the
//! mandatory post-sort verification.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum SortError {
    InputMissing { path: PathBuf },
    ChunkFailure { path: PathBuf, detail: String },
    MergeFailure { path: PathBuf, detail: String },
    /// Post-sort verification (C12 invariant 2) failed: either the output
    /// isn't in nondecreasing key order, or its row count disagrees with
    /// the unsorted input.
    VerificationFailed { path: PathBuf, detail: String },
    /// The alternate subprocess backend exited abnormally.
    SubprocessInstability { detail: String, signal_like: bool },
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortError::InputMissing { path } => write!(f, "input missing: {}", path.display()),
            SortError::ChunkFailure { path, detail } => write!(f, "chunk spill failed for {}: {detail}", path.display()),
            SortError::MergeFailure { path, detail } => write!(f, "merge failed writing {}: {detail}", path.display()),
            SortError::VerificationFailed { path, detail } => {
                write!(f, "sort verification failed for {}: {detail}", path.display())
            }
            SortError::SubprocessInstability { detail, signal_like } => {
                write!(f, "sort subprocess instability (signal_like={signal_like}): {detail}")
            }
        }
    }
}

impl std::error::Error for SortError {}

impl From<SortError> for ccindex_core::PipelineError {
    fn from(e: SortError) -> Self {
        match e {
            SortError::InputMissing { path } => ccindex_core::PipelineError::InputMissing {
                path: path.display().to_string(),
            },
            SortError::ChunkFailure { path, detail } => ccindex_core::PipelineError::CorruptInput {
                path: path.display().to_string(),
                detail,
            },
            SortError::MergeFailure { path, detail } => ccindex_core::PipelineError::WriterFailure {
                path: path.display().to_string(),
                detail,
            },
            SortError::VerificationFailed { path, detail } => ccindex_core::PipelineError::SchemaMismatch {
                path: path.display().to_string(),
                detail,
            },
            SortError::SubprocessInstability { detail, signal_like } => {
                ccindex_core::PipelineError::SortInstability { detail, signal_like }
            }
        }
    }
}
