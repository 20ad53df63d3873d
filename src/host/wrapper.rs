//! The stable wrapper mounted on the render surface.

use std::sync::Arc;

use crossterm::event::KeyEvent;
use ratatui::Frame;

use crate::reload::FamilyCell;

/// Mounted once and never replaced.
///
/// Its render output is "the referent of the current implementation handle,
/// or nothing if unset". The live-patch runtime swaps the referent across
/// reloads; the wrapper's own identity never changes, which is what lets the
/// surface keep running (and keep its interactive state) while behavior is
/// substituted underneath it.
pub struct RootWrapper {
    family: Arc<FamilyCell>,
}

impl RootWrapper {
    pub fn new(family: Arc<FamilyCell>) -> Self {
        Self { family }
    }

    /// Dereference the handle and render the current implementation.
    pub fn render(&self, frame: &mut Frame<'_>) {
        if let Some(entry) = self.family.load() {
            (entry.view)(frame, &mut entry.state.lock());
        }
        // Nothing mounted yet: leave the frame empty
    }

    /// Forward a key press to the current implementation's input handler.
    pub fn handle_key(&self, key: KeyEvent) {
        if let Some(entry) = self.family.load()
            && let Some(input) = entry.input
        {
            input(key, &mut entry.state.lock());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
