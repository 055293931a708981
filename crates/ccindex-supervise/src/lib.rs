//! C10: the queue supervisor. A single-threaded, poll-based scheduler that
//! runs the ingest -> sort -> index-rowgroups chain for each collection as
//! re-exec'd child processes, with memory-gated starts, exponential
//! backoff on failure, and observable (not trust-the-exit-code) completion
//! detection.

mod child;
mod completion;
mod config;
mod meminfo;
mod runner;
mod signals;
mod stage;
mod state;

pub use child::{log_path, spawn_stage, try_reap, CollectionWorker};
pub use completion::{expected_shard_count, is_completed};
pub use config::{discover_collections, SuperviseConfig};
pub use meminfo::mem_available_gib;
pub use runner::{Clock, Outcome, SystemClock, Supervisor};
pub use signals::install as install_signal_handlers;
pub use stage::{stage_chain, StageRoots, StageSpec};
pub use state::QueueState;
