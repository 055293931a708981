//! Streaming the fetched bytes to disk: hash while writing, then atomic
//! rename, matching the sink's `.tmp`-then-rename convention elsewhere in
//! the pipeline. Takes an in-memory buffer rather than a live reader since
//! `ccindex_core::stream::fetch_range_bytes` already buffers range responses
//! fully (they're bounded, single WARC records) — this is the part of C9
//! that's pure and gets exercised directly by tests with canned bytes,
//! never a real socket.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

fn part_path(out_path: &Path) -> PathBuf {
    let mut name = out_path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Write `bytes` to `<out_path>.part`, hashing as it goes, then rename into
/// place. Returns `(bytes_written, sha256_hex)`.
pub fn write_then_rename(bytes: &[u8], out_path: &Path) -> std::io::Result<(u64, String)> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let part = part_path(out_path);
    let mut hasher = Sha256::new();
    {
        let mut file = File::create(&part)?;
        file.write_all(bytes)?;
        hasher.update(bytes);
        file.sync_all()?;
    }
    std::fs::rename(&part, out_path)?;
    Ok((bytes.len() as u64, hex_digest(hasher)))
}

fn hex_digest(hasher: Sha256) -> String {
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// True iff `out_path` exists and its size matches `expected_len` — the
/// skip-unless-overwrite condition.
pub fn destination_matches(out_path: &Path, expected_len: u64) -> bool {
    std::fs::metadata(out_path).map(|m| m.len() == expected_len).unwrap_or(false)
}
