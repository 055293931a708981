//! Bounded concurrency for C9: a counting semaphore over blocking OS
//! threads, per the ambient concurrency model (async tasks are deliberately
//! not used here — the work is I/O-bound but bounded, so a reactor buys
//! nothing).

use std::path::PathBuf;
use std::sync::Arc;

use ccindex_core::progress::ProgressContext;
use ccindex_core::Semaphore;

use crate::fetch::fetch_one;
use crate::request::FetchRequest;
use crate::result::FetchResult;

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base_prefix: String,
    pub out_dir: PathBuf,
    pub concurrency: usize,
    pub overwrite: bool,
}

/// Fetch every request in `requests`, `config.concurrency` at a time.
/// Results are returned in the same order as `requests`, regardless of
/// completion order.
pub fn fetch_many(requests: &[FetchRequest], config: &FetchConfig) -> Vec<FetchResult> {
    let progress = ProgressContext::new();
    let pb = progress.shard_bar("fetch");
    fetch_many_with(requests, config, |req, overwrite, pb| fetch_one(req, &config.base_prefix, &config.out_dir, overwrite, pb), &pb)
}

/// Same as [`fetch_many`], but the per-request fetch is supplied by the
/// caller — the seam tests use so no real HTTP client is ever constructed.
pub fn fetch_many_with(
    requests: &[FetchRequest],
    config: &FetchConfig,
    work: impl Fn(&FetchRequest, bool, &indicatif::ProgressBar) -> FetchResult + Sync,
    pb: &indicatif::ProgressBar,
) -> Vec<FetchResult> {
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut results: Vec<Option<FetchResult>> = (0..requests.len()).map(|_| None).collect();

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            let semaphore = semaphore.clone();
            let work = &work;
            handles.push(scope.spawn(move || {
                let _permit = semaphore.acquire();
                let result = work(request, config.overwrite, pb);
                (index, result)
            }));
        }
        for handle in handles {
            let (index, result) = handle.join().expect("fetch worker panicked");
            results[index] = Some(result);
        }
    });

    pb.finish_and_clear();
    results.into_iter().map(|r| r.expect("every request produces a result")).collect()
}
