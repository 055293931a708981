//! Shared error taxonomy and the one piece of cross-crate exit-code policy
//! every sort-backend caller needs: telling a segfault/OOM-kill exit apart
//! from an ordinary nonzero exit.

use std::fmt;
use std::io;
use std::process::ExitStatus;

/// The error kinds named in the pipeline's error-handling design. Crate-local
/// error types (`CdxjError`, `SortError`, `IndexError`, ...) still exist per
/// crate boundary and convert into this one via `From` at aggregation points
/// (CLI command handlers, the supervisor's child-management loop); this
/// gives those call sites a common currency rather than replacing them.
#[derive(Debug)]
pub enum PipelineError {
    /// Source shard vanished between enumeration and open.
    InputMissing { path: String },
    /// Gzip/CDXJ decode failure at the whole-file level (not a single bad
    /// line, which is absorbed and skipped rather than raised here).
    CorruptInput { path: String, detail: String },
    /// Partial write to an output shard; caller has already removed the
    /// `.tmp` before raising this.
    WriterFailure { path: String, detail: String },
    /// Sort subprocess exited via signal or nonzero status.
    SortInstability { detail: String, signal_like: bool },
    /// A reader encountered a writer's lock past the retry budget.
    IndexLock { path: String },
    /// Range fetch exhausted its retry budget.
    RangeFetchFailure { url: String, detail: String },
    /// Shard is missing required columns on read.
    SchemaMismatch { path: String, detail: String },
    /// SIGINT observed; caller should wind down gracefully.
    Interrupted,
    Io(io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InputMissing { path } => write!(f, "input missing: {path}"),
            PipelineError::CorruptInput { path, detail } => {
                write!(f, "corrupt input {path}: {detail}")
            }
            PipelineError::WriterFailure { path, detail } => {
                write!(f, "writer failure for {path}: {detail}")
            }
            PipelineError::SortInstability { detail, signal_like } => {
                write!(f, "sort instability (signal_like={signal_like}): {detail}")
            }
            PipelineError::IndexLock { path } => write!(f, "index lock held: {path}"),
            PipelineError::RangeFetchFailure { url, detail } => {
                write!(f, "range fetch failed for {url}: {detail}")
            }
            PipelineError::SchemaMismatch { path, detail } => {
                write!(f, "schema mismatch in {path}: {detail}")
            }
            PipelineError::Interrupted => write!(f, "interrupted"),
            PipelineError::Io(e) => write!(f, "IO: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PipelineError {
    fn from(e: io::Error) -> Self {
        PipelineError::Io(e)
    }
}

impl PipelineError {
    /// Whether a retry is expected to help, per the propagation policy:
    /// everything except a schema mismatch and an explicit interrupt is
    /// retryable at some granularity (shard, collection, or record).
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            PipelineError::SchemaMismatch { .. } | PipelineError::Interrupted
        )
    }
}

/// Unix signal numbers the sort-backend retry policy treats as memory
/// exhaustion: killed outright (`SIGKILL`, 9) or crashed with a segfault
/// (`SIGSEGV`, 11).
const SIGKILL: i32 = 9;
const SIGSEGV: i32 = 11;

/// True iff `status` looks like the process was killed by the OS for memory
/// pressure rather than exiting on its own with a nonzero code. The sort
/// backend's retry policy halves worker count in addition to bumping the
/// memory budget only when this returns true.
#[cfg(unix)]
pub fn is_oom_like_exit(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    matches!(status.signal(), Some(SIGKILL) | Some(SIGSEGV))
}

#[cfg(not(unix))]
pub fn is_oom_like_exit(_status: &ExitStatus) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mismatch_not_retryable() {
        let e = PipelineError::SchemaMismatch {
            path: "x".into(),
            detail: "missing host_rev".into(),
        };
        assert!(!e.is_retryable());
    }

    #[test]
    fn interrupted_not_retryable() {
        assert!(!PipelineError::Interrupted.is_retryable());
    }

    #[test]
    fn corrupt_input_is_retryable() {
        let e = PipelineError::CorruptInput {
            path: "x".into(),
            detail: "bad gzip".into(),
        };
        assert!(e.is_retryable());
    }

    #[test]
    fn display_messages_are_informative() {
        let e = PipelineError::RangeFetchFailure {
            url: "http://x/y".into(),
            detail: "non-206".into(),
        };
        assert!(e.to_string().contains("http://x/y"));
    }

    #[cfg(unix)]
    #[test]
    fn oom_like_exit_detects_sigkill_and_sigsegv() {
        use std::os::unix::process::ExitStatusExt;
        let killed = ExitStatus::from_raw(SIGKILL);
        let segv = ExitStatus::from_raw(SIGSEGV);
        let normal = ExitStatus::from_raw(1 << 8);
        assert!(is_oom_like_exit(&killed));
        assert!(is_oom_like_exit(&segv));
        assert!(!is_oom_like_exit(&normal));
    }
}
