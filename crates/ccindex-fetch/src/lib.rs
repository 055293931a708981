//! C9: the range fetcher. Given WARC coordinates recovered from a pointer
//! shard, issues a byte-range GET, verifies the response, and streams the
//! result to disk under a sha256-verified atomic rename.

mod error;
mod fetch;
mod pool;
mod request;
mod result;
mod write;

pub use error::FetchError;
pub use fetch::{fetch_one, fetch_with};
pub use pool::{fetch_many, fetch_many_with, FetchConfig};
pub use request::FetchRequest;
pub use result::FetchResult;
pub use write::{destination_matches, write_then_rename};
