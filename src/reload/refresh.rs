//! Live-patch runtime: component families and in-place swap.
//!
//! Each loaded artifact registers its components here. A component family is
//! an indirection cell keyed by identity: the host's wrapper holds the cell
//! and dereferences it every frame, the runtime swaps the cell's *contents*
//! on reload and never its identity. That is what lets behavior change under
//! a mounted UI without tearing it down - naive remounting would reset all
//! interactive state on every keystroke-triggered rebuild.
//!
//! State preservation follows the registered signature: unchanged signature
//! keeps the family's state bag, a changed one resets it.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use hotshell_api::{InputFn, Registration, StateBag, ViewFn};

/// The swappable referent of a family: callbacks plus persistent state.
pub struct ViewEntry {
    pub view: ViewFn,
    pub input: Option<InputFn>,
    pub state: Arc<Mutex<StateBag>>,
}

/// Indirection cell for one component family.
///
/// Dependents hold the `Arc<FamilyCell>`; updates replace the slot's
/// contents, never the slot.
pub struct FamilyCell {
    current: ArcSwapOption<ViewEntry>,
}

impl FamilyCell {
    fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    /// Dereference the handle: the current implementation, or `None` if
    /// nothing is mounted yet.
    pub fn load(&self) -> Option<Arc<ViewEntry>> {
        self.current.load_full()
    }

    fn store(&self, entry: ViewEntry) {
        self.current.store(Some(Arc::new(entry)));
    }
}

struct Family {
    signature: String,
    cell: Arc<FamilyCell>,
}

/// Process-wide live-patch runtime.
///
/// `enabled` gates the in-place *update* machinery: production-labeled runs
/// never patch. First-sight mounting still works either way - mounting is
/// not patching, and one binary serves both modes.
pub struct RefreshRuntime {
    enabled: bool,
    families: Mutex<FxHashMap<String, Family>>,
    pending: Mutex<Vec<Registration>>,
}

impl RefreshRuntime {
    pub fn new(enabled: bool) -> Arc<Self> {
        Arc::new(Self {
            enabled,
            families: Mutex::new(FxHashMap::default()),
            pending: Mutex::new(Vec::new()),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queue registrations from a freshly loaded artifact. Nothing becomes
    /// visible to dependents until [`RefreshRuntime::apply_updates`] runs.
    pub fn register(&self, entries: Vec<Registration>) {
        self.pending.lock().extend(entries);
    }

    /// Apply pending updates in place. Returns the number of families
    /// touched.
    ///
    /// Existing families get their cell contents swapped (state preserved
    /// when the signature is unchanged, reset otherwise); unseen identities
    /// mount a fresh family. Only the reload coordinator calls this.
    pub fn apply_updates(&self) -> usize {
        let pending = std::mem::take(&mut *self.pending.lock());
        let mut families = self.families.lock();
        let mut touched = 0;

        for registration in pending {
            match families.get_mut(&registration.identity) {
                Some(family) => {
                    if !self.enabled {
                        continue;
                    }
                    let state = if family.signature == registration.signature {
                        family
                            .cell
                            .load()
                            .map(|entry| Arc::clone(&entry.state))
                            .unwrap_or_default()
                    } else {
                        crate::debug!(
                            "reload";
                            "signature changed for `{}`, resetting state",
                            registration.identity
                        );
                        Arc::new(Mutex::new(StateBag::new()))
                    };
                    family.signature = registration.signature;
                    family.cell.store(ViewEntry {
                        view: registration.view,
                        input: registration.input,
                        state,
                    });
                    touched += 1;
                }
                None => {
                    let cell = Arc::new(FamilyCell::new());
                    cell.store(ViewEntry {
                        view: registration.view,
                        input: registration.input,
                        state: Arc::default(),
                    });
                    families.insert(
                        registration.identity,
                        Family {
                            signature: registration.signature,
                            cell,
                        },
                    );
                    touched += 1;
                }
            }
        }

        touched
    }

    /// Resolve the root family: `app` by convention, or the sole registered
    /// family when there is exactly one.
    pub fn resolve_root(&self) -> Option<Arc<FamilyCell>> {
        let families = self.families.lock();
        if let Some(family) = families.get("app") {
            return Some(Arc::clone(&family.cell));
        }
        if families.len() == 1 {
            return families.values().next().map(|f| Arc::clone(&f.cell));
        }
        None
    }

    #[cfg(test)]
    pub(super) fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    #[cfg(test)]
    pub(super) fn family_cell(&self, identity: &str) -> Option<Arc<FamilyCell>> {
        self.families
            .lock()
            .get(identity)
            .map(|f| Arc::clone(&f.cell))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn view_a(_: &mut ratatui::Frame<'_>, state: &mut StateBag) {
        state.set("rendered_by", "a");
    }

    fn view_b(_: &mut ratatui::Frame<'_>, state: &mut StateBag) {
        state.set("rendered_by", "b");
    }

    fn registration(identity: &str, signature: &str, view: ViewFn) -> Registration {
        Registration {
            identity: identity.into(),
            signature: signature.into(),
            view,
            input: None,
        }
    }

    #[test]
    fn test_mount_then_update_keeps_cell_identity() {
        let runtime = RefreshRuntime::new(true);

        runtime.register(vec![registration("app", "sig-1", view_a)]);
        assert_eq!(runtime.apply_updates(), 1);

        let cell = runtime.resolve_root().expect("root mounted");
        let before = cell.load().expect("entry present");
        assert!(std::ptr::fn_addr_eq(before.view, view_a as ViewFn));

        // Reload with a new implementation, same signature
        runtime.register(vec![registration("app", "sig-1", view_b)]);
        assert_eq!(runtime.apply_updates(), 1);

        // Same cell, new referent
        let same_cell = runtime.resolve_root().expect("still mounted");
        assert!(Arc::ptr_eq(&cell, &same_cell));
        let after = cell.load().expect("entry present");
        assert!(std::ptr::fn_addr_eq(after.view, view_b as ViewFn));
    }

    #[test]
    fn test_state_preserved_when_signature_unchanged() {
        let runtime = RefreshRuntime::new(true);
        runtime.register(vec![registration("app", "sig-1", view_a)]);
        runtime.apply_updates();

        let cell = runtime.resolve_root().unwrap();
        cell.load().unwrap().state.lock().set("query", "hello");

        runtime.register(vec![registration("app", "sig-1", view_b)]);
        runtime.apply_updates();

        let state = cell.load().unwrap().state.lock().text("query").to_owned();
        assert_eq!(state, "hello");
    }

    #[test]
    fn test_state_reset_when_signature_changes() {
        let runtime = RefreshRuntime::new(true);
        runtime.register(vec![registration("app", "sig-1", view_a)]);
        runtime.apply_updates();

        let cell = runtime.resolve_root().unwrap();
        cell.load().unwrap().state.lock().set("query", "hello");

        runtime.register(vec![registration("app", "sig-2", view_b)]);
        runtime.apply_updates();

        assert_eq!(cell.load().unwrap().state.lock().text("query"), "");
    }

    #[test]
    fn test_disabled_runtime_mounts_but_never_patches() {
        let runtime = RefreshRuntime::new(false);

        // First sight still mounts (production runs need a UI too)
        runtime.register(vec![registration("app", "sig-1", view_a)]);
        assert_eq!(runtime.apply_updates(), 1);
        let cell = runtime.resolve_root().expect("mounted");

        // In-place updates are inert
        runtime.register(vec![registration("app", "sig-1", view_b)]);
        assert_eq!(runtime.apply_updates(), 0);
        let entry = cell.load().unwrap();
        assert!(std::ptr::fn_addr_eq(entry.view, view_a as ViewFn));
    }

    #[test]
    fn test_resolve_root_prefers_app_then_sole_family() {
        let runtime = RefreshRuntime::new(true);
        assert!(runtime.resolve_root().is_none());

        runtime.register(vec![registration("viewer", "sig-1", view_a)]);
        runtime.apply_updates();
        assert!(runtime.resolve_root().is_some());

        runtime.register(vec![registration("sidebar", "sig-2", view_b)]);
        runtime.apply_updates();
        // Two families, neither named `app`: ambiguous
        assert!(runtime.resolve_root().is_none());

        runtime.register(vec![registration("app", "sig-3", view_a)]);
        runtime.apply_updates();
        let root = runtime.resolve_root().expect("app family wins");
        assert!(Arc::ptr_eq(&root, &runtime.family_cell("app").unwrap()));
    }

    #[test]
    fn test_register_is_invisible_until_apply() {
        let runtime = RefreshRuntime::new(true);
        runtime.register(vec![registration("app", "sig-1", view_a)]);
        assert_eq!(runtime.pending_len(), 1);
        assert!(runtime.resolve_root().is_none());

        runtime.apply_updates();
        assert_eq!(runtime.pending_len(), 0);
        assert!(runtime.resolve_root().is_some());
    }
}
