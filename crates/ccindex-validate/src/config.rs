//! Validator configuration and collection enumeration.

use anyhow::{Context, Result};
use ccindex_core::Paths;

#[derive(Debug, Clone)]
pub struct ValidateConfig {
    pub paths: Paths,
    pub collections: Vec<String>,
    pub json: bool,
}

impl ValidateConfig {
    pub fn new(paths: Paths, collections: Vec<String>) -> Self {
        Self { paths, collections, json: false }
    }
}

/// Same derivation as `ccindex-ingest`/`ccindex-sort` (duplicated rather
/// than shared — stage crates stay independent of one another).
pub fn year_from_collection(collection: &str) -> String {
    collection
        .split('-')
        .find(|tok| tok.len() == 4 && tok.bytes().all(|b| b.is_ascii_digit()))
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Resolve which collections to validate: an explicit `--collection`
/// allowlist takes precedence; otherwise `--filter` globs collection
/// directory names under `ccindex_dir`; with neither, every subdirectory
/// is validated.
pub fn discover_collections(ccindex_dir: &std::path::Path, explicit: Option<&[String]>, filter_glob: Option<&str>) -> Result<Vec<String>> {
    if let Some(explicit) = explicit {
        return Ok(explicit.to_vec());
    }
    let pattern = filter_glob.map(glob::Pattern::new).transpose().context("invalid --filter glob")?;
    let mut collections: Vec<String> = std::fs::read_dir(ccindex_dir)
        .with_context(|| format!("reading {}", ccindex_dir.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| pattern.as_ref().map_or(true, |p| p.matches(name)))
        .collect();
    collections.sort();
    Ok(collections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn year_from_collection_extracts_four_digit_token() {
        assert_eq!(year_from_collection("CC-MAIN-2024-10"), "2024");
    }

    #[test]
    fn discover_collections_lists_subdirectories_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("CC-MAIN-2024-10")).unwrap();
        std::fs::create_dir_all(dir.path().join("CC-MAIN-2023-05")).unwrap();
        let collections = discover_collections(dir.path(), None, None).unwrap();
        assert_eq!(collections, vec!["CC-MAIN-2023-05".to_string(), "CC-MAIN-2024-10".to_string()]);
    }

    #[test]
    fn discover_collections_filters_by_glob() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("CC-MAIN-2024-10")).unwrap();
        std::fs::create_dir_all(dir.path().join("CC-NEWS-2024-10")).unwrap();
        let collections = discover_collections(dir.path(), None, Some("CC-MAIN-*")).unwrap();
        assert_eq!(collections, vec!["CC-MAIN-2024-10".to_string()]);
    }
}
