//! Harness error types.
//!
//! Two tiers with different propagation policies. Startup errors are thrown
//! to the caller and terminate the process with a visible message and a
//! non-zero exit. Reload errors are contained within a single rebuild cycle:
//! they are logged to the side channel and the previously loaded
//! implementation keeps running.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// StartupError
// ============================================================================

/// Fatal errors raised before any UI is shown.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("component file does not exist: {}", .0.display())]
    ComponentNotFound(PathBuf),

    #[error(
        "entry file must define a `pub fn app` component (or exactly one component): {}",
        .0.display()
    )]
    RootExportMissing(PathBuf),

    #[error("initial build failed:\n{0}")]
    InitialBuildFailed(String),

    #[error("initial artifact load failed: {0}")]
    InitialLoadFailed(#[from] ReloadError),

    #[error("watcher failed to start")]
    Watcher(#[from] notify::Error),
}

// ============================================================================
// ReloadError
// ============================================================================

/// Contained errors from one build+reload cycle.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("failed to stage artifact generation {generation}: {source}")]
    Stage {
        generation: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load artifact: {0}")]
    Open(#[from] libloading::Error),

    #[error("artifact registered no components")]
    EmptyRegistration,
}
