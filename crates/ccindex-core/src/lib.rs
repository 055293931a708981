//! ccindex-core - shared infrastructure for the Common Crawl pointer-index pipeline
//!
//! This crate provides the primitives every other `ccindex-*` crate builds on:
//! the reverse-domain codec, the `PointerRecord` data model, canonical on-disk
//! layout, a retrying HTTP range-GET reader, a Parquet sink with atomic
//! publish, progress reporting, and process-wide shutdown/concurrency helpers.

pub mod accumulator;
pub mod error;
pub mod journal;
pub mod logging;
pub mod paths;
pub mod pointer_record;
pub mod progress;
pub mod retry;
pub mod reverse_domain;
pub mod semaphore;
pub mod shutdown;
pub mod sink;
pub mod stream;
pub mod work_queue;

pub use accumulator::{Accumulator, DEFAULT_BATCH_SIZE, LineStats, process_lines};
pub use error::{PipelineError, is_oom_like_exit};
pub use journal::{
    DEFAULT_PROGRESS_INTERVAL_SECONDS, ProgressJournal, ProgressSnapshot, read_snapshot,
    write_snapshot,
};
pub use logging::{IndicatifLogger, init_logging};
pub use paths::Paths;
pub use pointer_record::{
    CdxjMeta, DICTIONARY_ENCODED_COLUMNS, PointerRecord, pointer_schema, pointer_schema_ref,
    record_from_batch_row,
};
pub use progress::{ProgressContext, SharedProgress};
pub use retry::{backoff_duration, retry_with_backoff};
pub use reverse_domain::{host_rev_from_url, host_rev_like_pattern, normalize_host, rev};
pub use semaphore::{Semaphore, SemaphoreGuard};
pub use shutdown::{is_shutdown_requested, request_shutdown, shutdown_flag};
pub use sink::{
    DEFAULT_ROW_GROUP_SIZE, ParquetCompression, ParquetSink, cleanup_tmp_files, is_valid_parquet,
    write_empty_marker,
};
pub use stream::{
    ByteCounter, HttpConfig, RangeReader, RangeResponse, SHARED_RUNTIME, StreamError,
    fetch_range_bytes, http_client, http_config, open_range_reader, set_http_config,
};
pub use work_queue::WorkQueue;
