//! Host Shell
//!
//! Owns process lifecycle: validate the entry component, prepare the scratch
//! directory, run one synchronous build-and-load cycle before any rendering,
//! create the render surface exactly once, then hand change events to the
//! reload loop until a termination signal triggers the scoped shutdown.

mod surface;
mod wrapper;

pub use wrapper::RootWrapper;

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Result;

use crate::build::{Bundler, CargoBundler};
use crate::config::HarnessConfig;
use crate::core;
use crate::error::StartupError;
use crate::reload::{DevLoop, DylibReloader, RefreshRuntime, ReloadState, Reloader};
use crate::utils::normalize_path;
use crate::watch::{self, Debouncer, IgnoreRules};
use surface::Surface;

/// Run the harness until terminated.
///
/// Returns only on a clean shutdown (exit 0 path); startup failures
/// propagate as errors and exit non-zero before any UI is shown.
pub fn run(entry: &Path, root: &Path, config: &HarnessConfig) -> Result<()> {
    let root = normalize_path(root);
    let entry = normalize_path(entry);

    // Fail fast: the entry component must exist before anything is set up
    if !entry.is_file() {
        return Err(StartupError::ComponentNotFound(entry).into());
    }

    let scratch = root.join(&config.build.scratch_dir);
    prepare_scratch(&scratch)?;

    // One synchronous build-and-load cycle before any rendering, so the
    // first frame already reflects valid compiled code
    crate::log!("build"; "building...");
    let bundler = Arc::new(CargoBundler::new(
        &config.build.profile,
        &config.build.scratch_dir,
    )?);
    let built = bundler.build(&entry, &scratch);
    if !built.success {
        return Err(
            StartupError::InitialBuildFailed(built.error_message().to_owned()).into(),
        );
    }

    let runtime = RefreshRuntime::new(core::mode().is_development());
    if !runtime.is_enabled() {
        crate::log!("reload"; "production mode: in-place updates disabled");
    }
    let mut reloader = DylibReloader::new(Arc::clone(&runtime));
    let mut state = ReloadState::new(entry.clone(), root.clone());

    crate::log!("reload"; "loading component...");
    let generation = state.next_generation();
    reloader
        .reload(&built.artifact_path, generation)
        .map_err(StartupError::InitialLoadFailed)?;
    state.finish_success(built.artifact_path.clone());

    let Some(family) = runtime.resolve_root() else {
        return Err(StartupError::RootExportMissing(entry).into());
    };
    let wrapper = RootWrapper::new(family);

    // From here on Ctrl+C means graceful teardown, not exit-now
    let (shutdown_tx, shutdown_rx) = crossbeam::channel::bounded(2);
    core::register_shutdown_channel(shutdown_tx);

    crate::log!("host"; "starting app...");
    if !std::io::stdout().is_terminal() {
        // A non-interactive host cannot usefully hot-reload: render once,
        // keep the process alive, never start the change detector
        crate::log!("watch"; "not running in interactive terminal, watching disabled");
        surface::render_once(&wrapper);
        let _ = shutdown_rx.recv();
        return Ok(());
    }

    // The change detector starts only after the first successful build
    let rules = IgnoreRules::new(
        &config.build.scratch_dir,
        &config.watch.ignore_dirs,
        &config.watch.ignore_extensions,
    );
    let (subscription, events) = watch::subscribe(&root, rules).map_err(StartupError::Watcher)?;
    crate::log!("watch"; "watching for file changes...");

    let debouncer = Debouncer::new(config.watch.debounce_ms, config.watch.cooldown_ms);
    let dev_loop = DevLoop::new(
        state,
        debouncer,
        bundler,
        Box::new(reloader),
        scratch,
        events,
    )
    .with_shutdown_signal(shutdown_rx);
    let loop_handle = spawn_reload_loop(dev_loop);

    // The render loop owns the main thread until quit or shutdown
    let mut surface = Surface::new()?;
    let outcome = surface.run(&wrapper);
    surface.restore();

    // Scoped shutdown: watcher unsubscription must complete before the
    // process exits, even if a build is still in flight (its outcome is no
    // longer observed)
    crate::log!("host"; "shutting down...");
    core::request_shutdown();
    subscription.unsubscribe();
    wait_for_loop(loop_handle);

    outcome
}

/// Create the private scratch directory with a marker telling
/// version-control to ignore its contents entirely.
fn prepare_scratch(scratch: &Path) -> Result<()> {
    std::fs::create_dir_all(scratch)?;
    std::fs::write(scratch.join(".gitignore"), "*\n")?;
    Ok(())
}

/// Run the reload loop on its own runtime thread; the render loop owns the
/// main thread.
fn spawn_reload_loop(dev_loop: DevLoop) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime");
        rt.block_on(dev_loop.run());
    })
}

/// Wait for the reload loop to stop gracefully (max 2 seconds). A hung
/// build can block its cycle indefinitely; the loop is abandoned rather
/// than the exit delayed.
fn wait_for_loop(handle: JoinHandle<()>) {
    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_entry_fails_before_any_surface() {
        let temp = tempfile::TempDir::new().unwrap();
        let entry = temp.path().join("src/does_not_exist.rs");
        let config = HarnessConfig::default();

        let err = run(&entry, temp.path(), &config).unwrap_err();
        let startup = err.downcast_ref::<StartupError>().expect("startup error");
        assert!(matches!(startup, StartupError::ComponentNotFound(_)));

        // Nothing was prepared: fail-fast happens before the scratch dir
        assert!(!temp.path().join(".hotshell").exists());
    }

    #[test]
    fn test_prepare_scratch_writes_ignore_marker() {
        let temp = tempfile::TempDir::new().unwrap();
        let scratch = temp.path().join(".hotshell");
        prepare_scratch(&scratch).unwrap();

        let marker = std::fs::read_to_string(scratch.join(".gitignore")).unwrap();
        assert_eq!(marker, "*\n");
    }
}
