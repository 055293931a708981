//! Persistent queue state: `{attempts, next_ok_after, completed}` keyed by
//! collection, written atomically (temp file + rename) so a supervisor
//! restart never reads a half-written file.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueueState {
    pub attempts: BTreeMap<String, u32>,
    /// Unix epoch seconds a collection may next be attempted.
    pub next_ok_after: BTreeMap<String, i64>,
    pub completed: BTreeMap<String, bool>,
    /// Informational fields, refreshed every tick for observability; not
    /// load-bearing for scheduling decisions.
    #[serde(default)]
    pub mem_avail_gib: f64,
    #[serde(default)]
    pub selected_collections: Vec<String>,
    #[serde(default)]
    pub running: Vec<String>,
}

impl QueueState {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        match serde_json::from_slice(&bytes) {
            Ok(state) => Ok(state),
            Err(e) => {
                log::warn!("{}: unreadable queue state ({e}), starting fresh", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("renaming {} to {}", tmp.display(), path.display()))?;
        Ok(())
    }

    pub fn is_completed(&self, collection: &str) -> bool {
        self.completed.get(collection).copied().unwrap_or(false)
    }

    pub fn mark_completed(&mut self, collection: &str) {
        self.completed.insert(collection.to_string(), true);
    }

    pub fn attempts(&self, collection: &str) -> u32 {
        self.attempts.get(collection).copied().unwrap_or(0)
    }

    pub fn record_attempt(&mut self, collection: &str) {
        *self.attempts.entry(collection.to_string()).or_insert(0) += 1;
    }

    pub fn next_ok_after(&self, collection: &str) -> i64 {
        self.next_ok_after.get(collection).copied().unwrap_or(0)
    }

    pub fn set_next_ok_after(&mut self, collection: &str, unix_secs: i64) {
        self.next_ok_after.insert(collection.to_string(), unix_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_as_default() {
        let dir = TempDir::new().unwrap();
        let state = QueueState::load(&dir.path().join("queue_state.json")).unwrap();
        assert_eq!(state, QueueState::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue_state.json");
        let mut state = QueueState::default();
        state.record_attempt("CC-MAIN-2024-10");
        state.set_next_ok_after("CC-MAIN-2024-10", 1_700_000_000);
        state.mark_completed("CC-MAIN-2023-05");
        state.save(&path).unwrap();

        let loaded = QueueState::load(&path).unwrap();
        assert_eq!(loaded.attempts("CC-MAIN-2024-10"), 1);
        assert_eq!(loaded.next_ok_after("CC-MAIN-2024-10"), 1_700_000_000);
        assert!(loaded.is_completed("CC-MAIN-2023-05"));
        assert!(!loaded.is_completed("CC-MAIN-2024-10"));
    }

    #[test]
    fn corrupt_file_loads_as_default_instead_of_erroring() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue_state.json");
        std::fs::write(&path, b"{not json at all").unwrap();
        let state = QueueState::load(&path).unwrap();
        assert_eq!(state, QueueState::default());
    }

    #[test]
    fn no_tmp_file_left_behind_after_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue_state.json");
        QueueState::default().save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert!(path.exists());
    }
}
