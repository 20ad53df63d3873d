//! Generation-named dynamic-library loading.
//!
//! A dynamic loader caches by canonical path, so re-opening the fixed-name
//! build output would hand back the stale mapping. Each reload therefore
//! stages a copy suffixed with the rebuild generation and opens that: the
//! suffix is the cache-busting identity, while the build output path itself
//! never changes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hotshell_api::{REGISTER_SYMBOL, RegisterFn, Registrar};

use super::refresh::RefreshRuntime;
use crate::error::ReloadError;

/// Re-import seam consumed by the reload loop: load a built artifact under
/// a distinct generation and apply pending updates in place.
pub trait Reloader: Send {
    fn reload(&mut self, artifact: &Path, generation: u64) -> Result<usize, ReloadError>;
}

/// Reloader backed by `libloading`.
pub struct DylibReloader {
    runtime: Arc<RefreshRuntime>,
    /// Every loaded generation, retained for the process lifetime: fn
    /// pointers registered by an older artifact may still be mid-frame when
    /// it is superseded, so unloading would be unsound.
    libraries: Vec<libloading::Library>,
}

impl DylibReloader {
    pub fn new(runtime: Arc<RefreshRuntime>) -> Self {
        Self {
            runtime,
            libraries: Vec::new(),
        }
    }

    pub fn loaded_generations(&self) -> usize {
        self.libraries.len()
    }
}

impl Reloader for DylibReloader {
    fn reload(&mut self, artifact: &Path, generation: u64) -> Result<usize, ReloadError> {
        let staged = generation_path(artifact, generation);
        std::fs::copy(artifact, &staged)
            .map_err(|source| ReloadError::Stage { generation, source })?;

        // Safety: the artifact was built by this harness with the same
        // toolchain and the shared api crate; its only export takes the
        // registrar type both sides compiled from identical source.
        let library = unsafe { libloading::Library::new(&staged) }?;
        let register: libloading::Symbol<'_, RegisterFn> =
            unsafe { library.get(REGISTER_SYMBOL) }?;

        let mut registrar = Registrar::new();
        register(&mut registrar);
        if registrar.is_empty() {
            return Err(ReloadError::EmptyRegistration);
        }

        self.runtime.register(registrar.into_entries());
        self.libraries.push(library);
        Ok(self.runtime.apply_updates())
    }
}

/// Cache-busting path for one generation: `app.so` → `app-3.so`.
fn generation_path(artifact: &Path, generation: u64) -> PathBuf {
    let stem = artifact
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("artifact");
    let suffix = artifact
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    artifact.with_file_name(format!("{stem}-{generation}{suffix}"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_path_is_distinct_per_generation() {
        let artifact = Path::new("/proj/.hotshell/app.so");
        let one = generation_path(artifact, 1);
        let two = generation_path(artifact, 2);
        assert_eq!(one, PathBuf::from("/proj/.hotshell/app-1.so"));
        assert_eq!(two, PathBuf::from("/proj/.hotshell/app-2.so"));
        assert_ne!(one, two);
    }

    #[test]
    fn test_generation_path_without_extension() {
        let artifact = Path::new("/proj/.hotshell/app");
        assert_eq!(
            generation_path(artifact, 7),
            PathBuf::from("/proj/.hotshell/app-7")
        );
    }

    #[test]
    fn test_missing_artifact_is_a_stage_error() {
        let runtime = RefreshRuntime::new(true);
        let mut reloader = DylibReloader::new(Arc::clone(&runtime));

        let err = reloader
            .reload(Path::new("/nonexistent/app.so"), 1)
            .unwrap_err();
        assert!(matches!(err, ReloadError::Stage { generation: 1, .. }));

        // Nothing was registered or retained
        assert_eq!(reloader.loaded_generations(), 0);
        assert!(runtime.resolve_root().is_none());
    }

    #[test]
    fn test_garbage_artifact_is_an_open_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let artifact = temp.path().join("app.so");
        std::fs::write(&artifact, b"not a shared object").unwrap();

        let runtime = RefreshRuntime::new(true);
        let mut reloader = DylibReloader::new(Arc::clone(&runtime));

        let err = reloader.reload(&artifact, 1).unwrap_err();
        assert!(matches!(err, ReloadError::Open(_)));
        assert!(runtime.resolve_root().is_none());
    }
}
