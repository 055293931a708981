//! Available memory, read from `/proc/meminfo`. No crate in the ambient
//! stack surfaces this; `MemAvailable` (kernel-computed, accounting for
//! reclaimable caches) is simpler and more honest than re-deriving it from
//! `MemFree`+`Cached`, so we parse the one line we need.

use std::path::Path;

const MEMINFO_PATH: &str = "/proc/meminfo";

pub fn mem_available_gib() -> f64 {
    read_mem_available_kb(Path::new(MEMINFO_PATH)).map(|kb| kb as f64 / (1024.0 * 1024.0)).unwrap_or(0.0)
}

fn read_mem_available_kb(path: &Path) -> Option<u64> {
    let contents = std::fs::read_to_string(path).ok()?;
    parse_mem_available_kb(&contents)
}

fn parse_mem_available_kb(contents: &str) -> Option<u64> {
    for line in contents.lines() {
        let (key, rest) = line.split_once(':')?;
        if key.trim() != "MemAvailable" {
            continue;
        }
        let value = rest.trim().split_whitespace().next()?;
        return value.parse().ok();
    }
    None
}
