//! Run C12 over every selected collection and render the result.

use crate::config::{year_from_collection, ValidateConfig};
use crate::report::{validate_collection, CollectionReport};
use crate::table::render_table;

/// Validate every collection in `config.collections`. Returns one report
/// per collection, in the same order they were given.
pub fn run(config: &ValidateConfig) -> Vec<CollectionReport> {
    config
        .collections
        .iter()
        .map(|collection| validate_collection(&config.paths, collection, &year_from_collection(collection)))
        .collect()
}

/// Render `reports` per `config.json`, and return the process exit code:
/// 0 iff every collection is complete, 1 otherwise.
pub fn report(config: &ValidateConfig, reports: &[CollectionReport]) -> i32 {
    if config.json {
        match serde_json::to_string_pretty(reports) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("failed to serialize validation report: {e}"),
        }
    } else {
        println!("{}", render_table(reports));
    }
    if reports.iter().all(|r| r.complete) {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccindex_core::Paths;
    use tempfile::TempDir;

    #[test]
    fn exit_code_is_zero_only_when_every_collection_is_complete() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::new(dir.path().join("ccindex"), dir.path().join("parquet"), dir.path().join("duckdb"));
        let config = ValidateConfig::new(paths, vec!["CC-MAIN-2024-10".to_string()]);

        let reports = run(&config);
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].complete);
        assert_eq!(report(&config, &reports), 1);
    }
}
