//! The rebuild state machine.
//!
//! Two states, `Idle` and `Building`, with `is_building` as the sole
//! concurrency guard. The whole machine is owned by the reload loop's one
//! logical task and handed by reference to its entry points, so there is no
//! data race to reason about - only interleaving order. The guard holds for
//! the entire duration of exactly one build+reload cycle; a trigger arriving
//! while it holds is dropped, never queued.

use std::path::{Path, PathBuf};

/// Single-owner reload state, alive for the whole process.
pub struct ReloadState {
    /// Monotonic rebuild counter; each re-load uses a distinct generation.
    rebuild_counter: u64,
    /// The sole concurrency guard (`Idle` = false, `Building` = true).
    is_building: bool,
    /// Artifact of the last *successful* build; failed cycles leave it be.
    current_artifact: Option<PathBuf>,
    root_path: PathBuf,
    entry_path: PathBuf,
}

impl ReloadState {
    pub fn new(entry_path: PathBuf, root_path: PathBuf) -> Self {
        Self {
            rebuild_counter: 0,
            is_building: false,
            current_artifact: None,
            root_path,
            entry_path,
        }
    }

    /// Attempt the `Idle → Building` transition.
    ///
    /// Returns `false` when a cycle is already in flight; the caller must
    /// drop its trigger (a burst of edits during a slow build collapses to
    /// at most one follow-up, and only if a change lands after `Idle`).
    pub fn begin_build(&mut self) -> bool {
        if self.is_building {
            return false;
        }
        self.is_building = true;
        true
    }

    /// Next cache-busting generation. Strictly increasing.
    pub fn next_generation(&mut self) -> u64 {
        self.rebuild_counter += 1;
        self.rebuild_counter
    }

    /// `Building → Idle` after a successful build+reload.
    pub fn finish_success(&mut self, artifact: PathBuf) {
        self.current_artifact = Some(artifact);
        self.is_building = false;
    }

    /// `Building → Idle` after a failed build or re-load. The previous
    /// artifact (and the running implementation) stay untouched.
    pub fn finish_failure(&mut self) {
        self.is_building = false;
    }

    pub fn is_building(&self) -> bool {
        self.is_building
    }

    pub fn generation(&self) -> u64 {
        self.rebuild_counter
    }

    pub fn current_artifact(&self) -> Option<&Path> {
        self.current_artifact.as_deref()
    }

    pub fn entry_path(&self) -> &Path {
        &self.entry_path
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_state() -> ReloadState {
        ReloadState::new(PathBuf::from("/proj/src/app.rs"), PathBuf::from("/proj"))
    }

    #[test]
    fn test_guard_drops_reentrant_triggers() {
        let mut state = make_state();
        assert!(state.begin_build());
        // Any trigger during `Building` is refused, not queued
        assert!(!state.begin_build());
        assert!(!state.begin_build());

        state.finish_failure();
        assert!(state.begin_build());
    }

    #[test]
    fn test_generation_strictly_increases() {
        let mut state = make_state();
        let first = state.next_generation();
        let second = state.next_generation();
        let third = state.next_generation();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_failure_leaves_artifact_unchanged() {
        let mut state = make_state();

        assert!(state.begin_build());
        state.finish_success(PathBuf::from("/proj/.hotshell/app.so"));
        assert_eq!(
            state.current_artifact(),
            Some(Path::new("/proj/.hotshell/app.so"))
        );

        assert!(state.begin_build());
        state.finish_failure();
        assert!(!state.is_building());
        assert_eq!(
            state.current_artifact(),
            Some(Path::new("/proj/.hotshell/app.so"))
        );
    }

    #[test]
    fn test_guard_holds_for_whole_cycle() {
        let mut state = make_state();
        assert!(!state.is_building());

        assert!(state.begin_build());
        assert!(state.is_building());
        let _generation = state.next_generation();
        assert!(state.is_building());

        state.finish_success(PathBuf::from("/a.so"));
        assert!(!state.is_building());
    }
}
