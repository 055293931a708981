//! SIGINT/SIGTERM/SIGHUP handling: the first signal sets the shared
//! shutdown flag so the poll loop can wind down gracefully (grace period,
//! then force-kill children, persist state, exit 130); a second signal
//! force-exits immediately, matching the fetcher example's handler.

use std::sync::atomic::Ordering;

use ccindex_core::shutdown_flag;

/// Install handlers for SIGINT, SIGTERM and SIGHUP. Safe to call once at
/// startup; re-registering is a no-op failure the caller logs and ignores.
pub fn install() {
    // SAFETY: AtomicBool::store and process::exit are async-signal-safe.
    unsafe {
        for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT, signal_hook::consts::SIGHUP] {
            if let Err(e) = signal_hook::low_level::register(signal, || {
                if shutdown_flag().swap(true, Ordering::Relaxed) {
                    std::process::exit(130);
                }
            }) {
                log::warn!("failed to register handler for signal {signal}: {e}");
            }
        }
    }
}
