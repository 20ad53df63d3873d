//! Change detection.
//!
//! Watches a root directory tree and delivers ignore-filtered change events
//! to the reload loop. Implements the "Watcher-First" pattern: the OS-level
//! watcher starts immediately and buffers events while the caller finishes
//! its initial build, so nothing is lost in between.
//!
//! Architecture:
//! ```text
//! notify → bridge thread (ignore filter, kind map) → Debouncer (pure timing)
//! ```

use std::path::Path;

use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use tokio::sync::mpsc;

// Pure timing and coalescing.
mod debouncer;
// Path-pattern predicates excluding files from triggering rebuilds.
pub mod ignore;
// Shared watch event types.
mod types;

#[cfg(test)]
mod tests;

pub use debouncer::Debouncer;
pub use ignore::IgnoreRules;
pub use types::{ChangeKind, WatchEvent};

const EVENT_BUFFER: usize = 64;

/// Active watch subscription.
///
/// Holds the watcher handle (must be kept alive) and the sync→async bridge
/// thread. Shutdown paths call [`Subscription::unsubscribe`] and thereby
/// wait for the bridge to drain before the process exits.
pub struct Subscription {
    /// Watcher handle (dropping it stops OS-level watching)
    watcher: RecommendedWatcher,
    /// Bridge thread forwarding notify events into the async channel
    bridge: std::thread::JoinHandle<()>,
}

impl Subscription {
    /// Tear down the subscription.
    ///
    /// Stops the OS-level watcher, then joins the bridge thread. Completes
    /// before returning, so no orphaned watch handle can outlive the caller.
    pub fn unsubscribe(self) {
        drop(self.watcher);
        let _ = self.bridge.join();
    }
}

/// Subscribe to filesystem changes under `root`.
///
/// Every raw event is checked against the ignore rules; matches are
/// discarded silently. Survivors arrive kind-mapped on the returned channel.
/// Watcher-level errors are logged and do not terminate the subscription.
pub fn subscribe(
    root: &Path,
    rules: IgnoreRules,
) -> notify::Result<(Subscription, mpsc::Receiver<WatchEvent>)> {
    // Create sync channel for notify (it doesn't support async)
    let (notify_tx, notify_rx) = std::sync::mpsc::channel();

    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = notify_tx.send(res);
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;

    // Events are now buffering in notify_rx while the caller finishes its
    // initial build

    let (event_tx, event_rx) = mpsc::channel::<WatchEvent>(EVENT_BUFFER);
    let root = root.to_path_buf();
    let bridge = std::thread::spawn(move || {
        while let Ok(result) = notify_rx.recv() {
            match result {
                Ok(event) => {
                    let Some(kind) = types::map_kind(&event.kind) else {
                        continue;
                    };
                    for path in &event.paths {
                        if rules.is_ignored(path, &root) {
                            continue;
                        }
                        let event = WatchEvent {
                            path: path.clone(),
                            kind,
                        };
                        // `try_send`: a full channel means a build is in
                        // flight and the loop is not draining - those
                        // changes are dropped, never queued. Blocking here
                        // could stall unsubscription at shutdown.
                        match event_tx.try_send(event) {
                            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                            Err(mpsc::error::TrySendError::Closed(_)) => return,
                        }
                    }
                }
                // Watcher-level errors do not terminate the subscription
                Err(e) => crate::log!("watch"; "notify error: {}", e),
            }
        }
    });

    Ok((Subscription { watcher, bridge }, event_rx))
}

/// Human-readable label for a coalesced batch: the first entry's path,
/// relative to the root. The batch is one trigger regardless of size.
pub fn batch_label(batch: &[WatchEvent], root: &Path) -> String {
    match batch.first() {
        Some(event) => {
            let shown = event.path.strip_prefix(root).unwrap_or(&event.path);
            format!("{} ({})", shown.display(), event.kind.label())
        }
        None => String::from("(empty batch)"),
    }
}
