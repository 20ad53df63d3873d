//! Incremental build of view-crate artifacts.
//!
//! The builder turns "the entry component file changed" into "a fresh
//! dynamic-library artifact sits at a fixed path":
//!
//! ```text
//! entry file → package discovery → shadow-tree instrumentation → cargo build
//!            → artifact staged under a fixed name in the scratch dir
//! ```
//!
//! Successive builds overwrite the same output filename; cache-busting
//! happens at the *load* layer (generation-suffixed copies), never here.

mod cargo;
mod transform;

pub use cargo::CargoBundler;
pub use transform::{ComponentMeta, RefreshTransform};

use std::path::{Path, PathBuf};

/// Result of one build attempt. Owned transiently by the reload loop and
/// superseded by the next attempt's result.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Fixed-name artifact location. Meaningless when `success` is false.
    pub artifact_path: PathBuf,
    pub success: bool,
    /// Concatenated toolchain diagnostics when `success` is false.
    pub error: Option<String>,
}

impl BuildResult {
    pub fn ok(artifact_path: PathBuf) -> Self {
        Self {
            artifact_path,
            success: true,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            artifact_path: PathBuf::new(),
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("unknown build error")
    }
}

/// External bundler seam.
///
/// Implementations must create `out_dir` if absent and report failures as
/// data (`success = false`) rather than panicking; no partial artifact is
/// ever considered valid.
pub trait Bundler: Send + Sync {
    fn build(&self, entry: &Path, out_dir: &Path) -> BuildResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_result_failure_carries_message() {
        let result = BuildResult::fail("error[E0308]: mismatched types");
        assert!(!result.success);
        assert!(result.error_message().contains("E0308"));
        assert_eq!(result.artifact_path, PathBuf::new());
    }

    #[test]
    fn test_build_result_success_has_no_error() {
        let result = BuildResult::ok(PathBuf::from("/tmp/.hotshell/app.so"));
        assert!(result.success);
        assert!(result.error.is_none());
    }
}
