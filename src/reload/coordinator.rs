//! The rebuild/reload event loop.
//!
//! Wires the change detector to the builder and the live-patch runtime.
//! Everything runs as one logical task: all mutation of [`ReloadState`]
//! happens here, which is why the plain `is_building` flag is a sufficient
//! guard - there is no data race, only interleaving order. Build-and-patch
//! for a trigger always completes (success or failure) strictly before the
//! guard is released.
//!
//! No timeout is imposed on the build step: a hung toolchain blocks that
//! cycle and every subsequent trigger. Accepted limitation for a local dev
//! tool.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::loader::Reloader;
use super::state::ReloadState;
use crate::build::Bundler;
use crate::watch::{self, Debouncer, WatchEvent};

/// Upper bound on idle sleeps so shutdown requests are noticed promptly.
const SHUTDOWN_POLL: Duration = Duration::from_millis(500);

/// The reload coordinator: owns the state machine and the debouncer.
pub struct DevLoop {
    state: ReloadState,
    debouncer: Debouncer,
    bundler: Arc<dyn Bundler>,
    reloader: Box<dyn Reloader>,
    out_dir: PathBuf,
    events: mpsc::Receiver<WatchEvent>,
    shutdown: Option<crossbeam::channel::Receiver<()>>,
}

impl DevLoop {
    pub fn new(
        state: ReloadState,
        debouncer: Debouncer,
        bundler: Arc<dyn Bundler>,
        reloader: Box<dyn Reloader>,
        out_dir: PathBuf,
        events: mpsc::Receiver<WatchEvent>,
    ) -> Self {
        Self {
            state,
            debouncer,
            bundler,
            reloader,
            out_dir,
            events,
            shutdown: None,
        }
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: crossbeam::channel::Receiver<()>) -> Self {
        self.shutdown = Some(rx);
        self
    }

    /// Run until shutdown is requested or the subscription closes.
    pub async fn run(mut self) {
        loop {
            if self.shutdown_requested() {
                break;
            }
            tokio::select! {
                biased;
                maybe = self.events.recv() => match maybe {
                    Some(event) => self.debouncer.add(&event),
                    None => break, // Subscription dropped
                },
                _ = tokio::time::sleep(self.debouncer.sleep_duration().min(SHUTDOWN_POLL)) => {
                    if let Some(batch) = self.debouncer.take_if_ready() {
                        self.trigger_rebuild(&batch).await;
                    }
                }
            }
        }
        crate::debug!("reload"; "loop stopped");
    }

    /// One coalesced batch is one trigger, whatever its size.
    async fn trigger_rebuild(&mut self, batch: &[WatchEvent]) {
        if !self.state.begin_build() {
            crate::debug!("reload"; "build already in progress, skipping trigger");
            return;
        }

        let label = watch::batch_label(batch, self.state.root_path());
        crate::log!("watch"; "changed: {}", label);
        crate::log!("reload"; "rebuilding...");

        let bundler = Arc::clone(&self.bundler);
        let entry = self.state.entry_path().to_path_buf();
        let out_dir = self.out_dir.clone();
        let built = tokio::task::spawn_blocking(move || bundler.build(&entry, &out_dir)).await;

        let outcome = match built {
            Err(join_error) => Err(format!("build task failed: {join_error}")),
            Ok(result) if !result.success => {
                Err(format!("rebuild failed:\n{}", result.error_message()))
            }
            Ok(result) => {
                let generation = self.state.next_generation();
                match self.reloader.reload(&result.artifact_path, generation) {
                    Ok(updated) => Ok((result.artifact_path, updated)),
                    Err(e) => Err(format!("failed to re-load artifact: {e}")),
                }
            }
        };

        // Changes that landed mid-build are dropped, never queued: only an
        // event arriving after the return to Idle may start the next cycle
        self.discard_buffered_events();

        match outcome {
            Ok((artifact, updated)) => {
                self.state.finish_success(artifact);
                crate::log!(
                    "reload";
                    "hot reload complete ({} component{} updated)",
                    updated,
                    if updated == 1 { "" } else { "s" }
                );
            }
            Err(message) => {
                // Previous implementation stays mounted and running
                self.state.finish_failure();
                crate::log!("error"; "{}", message);
            }
        }
    }

    fn discard_buffered_events(&mut self) {
        let mut dropped = 0usize;
        while self.events.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            crate::debug!("watch"; "dropped {} change(s) during build", dropped);
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|rx| rx.try_recv().is_ok())
    }
}
