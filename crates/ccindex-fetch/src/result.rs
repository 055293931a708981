//! The typed, per-record outcome C9 returns. The WARC body itself is never
//! interpreted here — decoding WARC framing is an external collaborator's job.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub ok: bool,
    pub status: Option<u16>,
    pub url: String,
    pub out_path: PathBuf,
    pub bytes_requested: u64,
    pub bytes_written: u64,
    pub sha256: Option<String>,
    pub error: Option<String>,
}

impl FetchResult {
    pub fn skipped(url: String, out_path: PathBuf, bytes_requested: u64) -> Self {
        Self {
            ok: true,
            status: None,
            url,
            out_path,
            bytes_requested,
            bytes_written: bytes_requested,
            sha256: None,
            error: None,
        }
    }

    pub fn success(url: String, out_path: PathBuf, status: u16, bytes_requested: u64, bytes_written: u64, sha256: String) -> Self {
        Self {
            ok: true,
            status: Some(status),
            url,
            out_path,
            bytes_requested,
            bytes_written,
            sha256: Some(sha256),
            error: None,
        }
    }

    pub fn failure(url: String, out_path: PathBuf, status: Option<u16>, bytes_requested: u64, error: String) -> Self {
        Self {
            ok: false,
            status,
            url,
            out_path,
            bytes_requested,
            bytes_written: 0,
            sha256: None,
            error: Some(error),
        }
    }
}
