//! Shutdown state tracking.
//!
//! One process-wide flag plus an optional channel into the reload loop. The
//! Ctrl+C handler must work in two phases:
//! - Before the host registers a channel: nothing is mounted yet, exit 0
//!   immediately.
//! - After registration: set the flag, notify the loop, and let the host
//!   perform the scoped teardown (watcher unsubscription before exit).

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shutdown has been requested (Ctrl+C / SIGTERM received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Shutdown signal sender for the reload loop and the parked non-TTY host
static SHUTDOWN_TX: OnceLock<crossbeam::channel::Sender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        request_shutdown();

        // No channel registered yet (still building, nothing mounted):
        // nothing to gracefully tear down, exit immediately
        if SHUTDOWN_TX.get().is_none() {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the channel the host waits on for graceful shutdown
///
/// Call after the initial build succeeds, before entering the render loop
pub fn register_shutdown_channel(tx: crossbeam::channel::Sender<()>) {
    let _ = SHUTDOWN_TX.set(tx);
}

/// Request shutdown: set the flag and notify the registered channel
///
/// Non-blocking (`try_send`): a full channel means a notification is
/// already pending, which is all the receivers need
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
    if let Some(tx) = SHUTDOWN_TX.get() {
        let _ = tx.try_send(());
    }
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering for performance - worst case is rendering
/// one more frame before stopping, which is acceptable
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_sets_flag_and_notifies() {
        let (tx, rx) = crossbeam::channel::unbounded();
        register_shutdown_channel(tx);

        SHUTDOWN.store(false, Ordering::SeqCst);
        assert!(!is_shutdown());

        request_shutdown();
        assert!(is_shutdown());
        assert!(rx.try_recv().is_ok());

        // Restore for other tests in this process
        SHUTDOWN.store(false, Ordering::SeqCst);
    }
}
