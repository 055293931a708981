//! C10's main loop: a cooperative single-threaded scheduler polling on a
//! fixed tick. Workers are POSIX child processes; there is no shared memory
//! between the supervisor and its children beyond the filesystem (ledger,
//! progress journal, queue state).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use ccindex_core::{is_oom_like_exit, is_shutdown_requested};

use crate::child::{spawn_stage, try_reap, CollectionWorker};
use crate::completion::{expected_shard_count, is_completed};
use crate::config::SuperviseConfig;
use crate::meminfo::mem_available_gib;
use crate::stage::stage_chain;
use crate::state::QueueState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AllCompleted,
    SomeAbandoned,
    Interrupted,
}

/// A source of "now" abstracted out so tests can fast-forward through
/// backoff windows without sleeping.
pub trait Clock {
    fn unix_now(&self) -> i64;
}

pub struct SystemClock;
impl Clock for SystemClock {
    fn unix_now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

pub struct Supervisor<'a, C: Clock> {
    config: &'a SuperviseConfig,
    exe: std::path::PathBuf,
    state_path: std::path::PathBuf,
    log_dir: std::path::PathBuf,
    state: QueueState,
    workers: HashMap<String, CollectionWorker>,
    clock: C,
}

impl<'a, C: Clock> Supervisor<'a, C> {
    pub fn new(config: &'a SuperviseConfig, exe: std::path::PathBuf, clock: C) -> anyhow::Result<Self> {
        let paths = config.paths();
        let state_path = paths.queue_state();
        let log_dir = paths.state_dir.clone();
        let state = QueueState::load(&state_path)?;
        Ok(Self { config, exe, state_path, log_dir, state, workers: HashMap::new(), clock })
    }

    /// Run to completion: loop `tick` until every collection is either
    /// completed or abandoned, or a shutdown signal arrives.
    pub fn run(&mut self) -> anyhow::Result<Outcome> {
        loop {
            if is_shutdown_requested() {
                self.shutdown_gracefully()?;
                return Ok(Outcome::Interrupted);
            }

            self.reap_finished()?;

            if self.all_collections_resolved() {
                self.state.save(&self.state_path)?;
                let abandoned = self.config.collections.iter().any(|c| !self.state.is_completed(c) && self.state.attempts(c) >= self.config.max_attempts);
                return Ok(if abandoned { Outcome::SomeAbandoned } else { Outcome::AllCompleted });
            }

            self.maybe_start_more()?;
            self.state.mem_avail_gib = mem_available_gib();
            self.state.running = self.workers.keys().cloned().collect();
            self.state.selected_collections = self.config.collections.clone();
            self.state.save(&self.state_path)?;

            std::thread::sleep(self.config.tick_interval);
        }
    }

    fn all_collections_resolved(&self) -> bool {
        self.config.collections.iter().all(|c| {
            self.state.is_completed(c) || (self.state.attempts(c) >= self.config.max_attempts && !self.workers.contains_key(c))
        })
    }

    fn reap_finished(&mut self) -> anyhow::Result<()> {
        let collections: Vec<String> = self.workers.keys().cloned().collect();
        for collection in collections {
            let status = {
                let worker = self.workers.get_mut(&collection).unwrap();
                try_reap(&mut worker.child)?
            };
            let Some(status) = status else { continue };

            let worker = self.workers.remove(&collection).unwrap();
            let paths = self.config.paths();

            if !status.success() {
                log::warn!("{collection}: stage exited {status:?}, scheduling retry");
                self.state.record_attempt(&collection);
                if is_oom_like_exit(&status) {
                    log::warn!("{collection}: OOM-like exit, will retry with reduced concurrency next attempt");
                }
                let backoff = self.backoff_seconds(self.state.attempts(&collection));
                self.state.set_next_ok_after(&collection, self.clock.unix_now() + backoff as i64);
                continue;
            }

            let chain = stage_chain(&self.config.stage_roots(), &collection);
            if worker.stage_index + 1 < chain.len() {
                let next_stage = &chain[worker.stage_index + 1];
                match spawn_stage(&self.exe, &self.log_dir, &collection, next_stage) {
                    Ok(child) => {
                        self.workers.insert(collection.clone(), CollectionWorker { collection, stage_index: worker.stage_index + 1, child });
                    }
                    Err(e) => {
                        log::error!("{collection}: failed to spawn next stage: {e:#}");
                        self.state.record_attempt(&collection);
                        let backoff = self.backoff_seconds(self.state.attempts(&collection));
                        self.state.set_next_ok_after(&collection, self.clock.unix_now() + backoff as i64);
                    }
                }
            } else if is_completed(&paths, &collection) {
                self.state.mark_completed(&collection);
                log::info!("{collection}: complete");
            } else {
                log::warn!("{collection}: stage chain finished but completion check failed, retrying");
                self.state.record_attempt(&collection);
                let backoff = self.backoff_seconds(self.state.attempts(&collection));
                self.state.set_next_ok_after(&collection, self.clock.unix_now() + backoff as i64);
            }
        }
        Ok(())
    }

    fn backoff_seconds(&self, attempts: u32) -> u64 {
        let exp = self.config.retry_backoff_seconds.saturating_mul(1u64.checked_shl(attempts.min(16)).unwrap_or(u64::MAX));
        exp.min(self.config.max_backoff_seconds)
    }

    fn maybe_start_more(&mut self) -> anyhow::Result<()> {
        if mem_available_gib() < self.config.min_mem_to_start_gib {
            log::debug!("below min_mem_to_start_gib, deferring new starts this tick");
            return Ok(());
        }

        let now = self.clock.unix_now();
        let paths = self.config.paths();
        let slots = self.config.max_parallel.saturating_sub(self.workers.len());

        let mut started = 0usize;
        for collection in &self.config.collections {
            if started >= slots {
                break;
            }
            if self.state.is_completed(collection) || self.workers.contains_key(collection) {
                continue;
            }
            if self.state.attempts(collection) >= self.config.max_attempts {
                continue;
            }
            if self.state.next_ok_after(collection) > now {
                continue;
            }
            if expected_shard_count(&paths, collection) == 0 {
                // Upstream downloader hasn't populated this collection yet;
                // re-check later without burning an attempt.
                self.state.set_next_ok_after(collection, now + self.config.retry_backoff_seconds as i64);
                continue;
            }

            if self.config.dry_run {
                log::info!("[dry-run] would start {collection}");
                continue;
            }

            let chain = stage_chain(&self.config.stage_roots(), collection);
            match spawn_stage(&self.exe, &self.log_dir, collection, &chain[0]) {
                Ok(child) => {
                    self.workers.insert(collection.clone(), CollectionWorker { collection: collection.clone(), stage_index: 0, child });
                    started += 1;
                }
                Err(e) => {
                    log::error!("{collection}: failed to start: {e:#}");
                    self.state.record_attempt(collection);
                }
            }
        }
        Ok(())
    }

    fn shutdown_gracefully(&mut self) -> anyhow::Result<()> {
        let deadline = Instant::now() + self.config.grace_period;
        while Instant::now() < deadline {
            let mut any_alive = false;
            for worker in self.workers.values_mut() {
                if try_reap(&mut worker.child)?.is_none() {
                    any_alive = true;
                }
            }
            if !any_alive {
                break;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        for worker in self.workers.values_mut() {
            if try_reap(&mut worker.child)?.is_none() {
                let _ = worker.child.kill();
                let _ = worker.child.wait();
            }
        }
        self.workers.clear();
        self.state.save(&self.state_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FixedClock(i64);
    impl Clock for FixedClock {
        fn unix_now(&self) -> i64 {
            self.0
        }
    }

    fn config(dir: &TempDir, collections: Vec<String>) -> SuperviseConfig {
        let mut config = SuperviseConfig::new(dir.path().join("ccindex"), dir.path().join("duckdb"), dir.path().join("parquet"), collections);
        config.tick_interval = Duration::from_millis(5);
        config.max_parallel = 2;
        config
    }

    #[test]
    fn backoff_escalates_and_caps_at_max_backoff() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, vec![]);
        let sup = Supervisor::new(&config, std::path::PathBuf::from("/bin/true"), FixedClock(0)).unwrap();
        assert_eq!(sup.backoff_seconds(0), 30);
        assert_eq!(sup.backoff_seconds(1), 60);
        assert_eq!(sup.backoff_seconds(2), 120);
        assert_eq!(sup.backoff_seconds(20), config.max_backoff_seconds);
    }

    #[test]
    fn collection_with_no_source_shards_is_never_resolved() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, vec!["CC-MAIN-2024-10".to_string()]);
        let sup = Supervisor::new(&config, std::path::PathBuf::from("/bin/true"), FixedClock(0)).unwrap();
        assert!(!sup.all_collections_resolved());
    }

    #[test]
    fn all_collections_resolved_once_completed() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, vec!["CC-MAIN-2024-10".to_string()]);
        let mut sup = Supervisor::new(&config, std::path::PathBuf::from("/bin/true"), FixedClock(0)).unwrap();
        sup.state.mark_completed("CC-MAIN-2024-10");
        assert!(sup.all_collections_resolved());
    }

    #[test]
    fn all_collections_resolved_once_abandoned() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, vec!["CC-MAIN-2024-10".to_string()]);
        config.max_attempts = 2;
        let mut sup = Supervisor::new(&config, std::path::PathBuf::from("/bin/true"), FixedClock(0)).unwrap();
        sup.state.record_attempt("CC-MAIN-2024-10");
        sup.state.record_attempt("CC-MAIN-2024-10");
        assert!(sup.all_collections_resolved());
    }
}
