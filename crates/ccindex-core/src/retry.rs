//! Retry with exponential backoff, shared by the range fetcher and the
//! sort-backend subprocess supervisor.

use std::time::Duration;

use indicatif::ProgressBar;
use rand::Rng;

use crate::error::PipelineError;
use crate::stream::http_config;

/// Exponential backoff with jitter: a base of 2^attempt seconds (2s, 4s,
/// 8s, ...), randomized by up to ±25% so a burst of clients retrying the
/// same failure don't all wake up and hammer it again in lockstep.
pub fn backoff_duration(attempt: u32) -> Duration {
    let base = 2u64.pow(attempt) as f64;
    let jitter = rand::thread_rng().gen_range(-0.25..=0.25);
    Duration::from_secs_f64(base * (1.0 + jitter))
}

/// Retry a fallible operation with exponential backoff.
///
/// On retryable errors, logs the failure, updates the progress bar, sleeps,
/// and retries up to `max_retries` (from the global [`crate::stream::HttpConfig`]).
///
/// Returns `Ok(T)` on first success, or the final `Err` on exhaustion / non-retryable error.
pub fn retry_with_backoff<T>(
    label: &str,
    pb: &ProgressBar,
    mut attempt_fn: impl FnMut() -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    let max_retries = http_config().max_retries;
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                attempt += 1;
                pb.set_message(format!("retry {attempt}/{max_retries}..."));
                log::debug!("{label}: attempt {attempt}/{max_retries} failed: {e}, retrying...");
                std::thread::sleep(backoff_duration(attempt));
            }
            Err(e) => {
                log::error!("{label}: failed permanently: {e}");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_exponential_with_jitter() {
        for attempt in 1..=3 {
            let base = 2u64.pow(attempt) as f64;
            let d = backoff_duration(attempt).as_secs_f64();
            assert!(d >= base * 0.75 && d <= base * 1.25, "attempt {attempt}: {d} outside jitter window around {base}");
        }
    }

    #[test]
    fn retry_with_backoff_succeeds_without_retry() {
        let pb = ProgressBar::hidden();
        let mut calls = 0;
        let result: Result<i32, PipelineError> = retry_with_backoff("test", &pb, || {
            calls += 1;
            Ok(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn retry_with_backoff_gives_up_on_non_retryable() {
        let pb = ProgressBar::hidden();
        let mut calls = 0;
        let result: Result<i32, PipelineError> = retry_with_backoff("test", &pb, || {
            calls += 1;
            Err(PipelineError::Interrupted)
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
