//! C9's own error taxonomy. Maps onto `PipelineError::RangeFetchFailure` at
//! the boundary, same convention as `SortError` and `IndexError`.

use std::fmt;

#[derive(Debug)]
pub enum FetchError {
    /// Non-206 status, or a 206 with the wrong byte count, that survived the
    /// retry budget (or wasn't eligible for retry at all).
    Terminal { url: String, status: Option<u16>, detail: String },
    /// Writing the `.part` file or renaming it into place failed.
    Write { path: String, detail: String },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Terminal { url, status: Some(s), detail } => write!(f, "fetch {url} failed with status {s}: {detail}"),
            FetchError::Terminal { url, status: None, detail } => write!(f, "fetch {url} failed: {detail}"),
            FetchError::Write { path, detail } => write!(f, "writing {path} failed: {detail}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<FetchError> for ccindex_core::PipelineError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Terminal { url, detail, .. } => ccindex_core::PipelineError::RangeFetchFailure { url, detail },
            FetchError::Write { path, detail } => ccindex_core::PipelineError::WriterFailure { path, detail },
        }
    }
}
