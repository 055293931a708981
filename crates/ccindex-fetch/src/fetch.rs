//! Orchestrates one record's fetch: skip check, retrying range GET, then the
//! pure write-and-hash step. The only part of this module that touches a
//! real socket is `do_fetch`, which is a one-line call into
//! `ccindex_core::stream`; everything else is plain control flow over that
//! result and is exercised in tests via [`fetch_with`], which takes the
//! fetch function as a parameter so tests can supply canned byte ranges
//! instead of a live server.

use std::path::Path;

use ccindex_core::retry::backoff_duration;
use ccindex_core::stream::{fetch_range_bytes, http_config, StreamError};
use indicatif::ProgressBar;

use crate::error::FetchError;
use crate::request::FetchRequest;
use crate::result::FetchResult;
use crate::write::{destination_matches, write_then_rename};

/// The real network call, wired to `ccindex_core::stream::fetch_range_bytes`.
fn do_fetch(url: &str, offset: u64, length: u64) -> Result<Vec<u8>, StreamError> {
    fetch_range_bytes(url, offset, length)
}

/// Fetch one WARC record into `out_dir`, named by [`FetchRequest::out_file_name`].
///
/// Skips the network entirely if the destination already exists with the
/// expected size, unless `overwrite` is set.
pub fn fetch_one(request: &FetchRequest, base_prefix: &str, out_dir: &Path, overwrite: bool, pb: &ProgressBar) -> FetchResult {
    fetch_with(request, base_prefix, out_dir, overwrite, pb, do_fetch)
}

/// Same as [`fetch_one`], but the byte-range fetch is supplied by the
/// caller — the seam tests use to avoid any real HTTP.
pub fn fetch_with(
    request: &FetchRequest,
    base_prefix: &str,
    out_dir: &Path,
    overwrite: bool,
    pb: &ProgressBar,
    mut fetch_bytes: impl FnMut(&str, u64, u64) -> Result<Vec<u8>, StreamError>,
) -> FetchResult {
    let url = request.url(base_prefix);
    let out_path = out_dir.join(request.out_file_name());

    if !overwrite && destination_matches(&out_path, request.warc_length) {
        return FetchResult::skipped(url, out_path, request.warc_length);
    }

    let max_retries = http_config().max_retries;
    let mut attempt = 0u32;
    let outcome = loop {
        match fetch_bytes(&url, request.warc_offset, request.warc_length) {
            Ok(bytes) => break Ok((206u16, bytes)),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                attempt += 1;
                pb.set_message(format!("retry {attempt}/{max_retries}..."));
                log::debug!("{}: attempt {attempt}/{max_retries} failed: {e}, retrying...", request.warc_filename);
                std::thread::sleep(backoff_duration(attempt));
            }
            Err(e) => break Err(e),
        }
    };

    match outcome {
        Ok((status, bytes)) => match write_then_rename(&bytes, &out_path) {
            Ok((bytes_written, sha256)) => FetchResult::success(url, out_path, status, request.warc_length, bytes_written, sha256),
            Err(e) => {
                let err = FetchError::Write {
                    path: out_path.display().to_string(),
                    detail: e.to_string(),
                };
                FetchResult::failure(url, out_path, Some(status), request.warc_length, err.to_string())
            }
        },
        Err(e) => {
            let status = match &e {
                StreamError::Http { status, .. } => *status,
                StreamError::Io(_) => None,
            };
            let err = FetchError::Terminal {
                url: url.clone(),
                status,
                detail: e.to_string(),
            };
            FetchResult::failure(url, out_path, status, request.warc_length, err.to_string())
        }
    }
}
