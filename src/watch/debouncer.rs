use std::path::Path;
use std::time::Duration;

use rustc_hash::FxHashMap;

use super::types::{ChangeKind, WatchEvent};
use crate::utils::path::normalize_path;

/// Pure debouncer: only handles timing and event coalescing.
/// No business logic, no global state access.
pub struct Debouncer {
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    changes: FxHashMap<std::path::PathBuf, ChangeKind>,
    last_event: Option<std::time::Instant>,
    last_trigger: Option<std::time::Instant>,
    debounce: Duration,
    cooldown: Duration,
}

impl Debouncer {
    pub fn new(debounce_ms: u64, cooldown_ms: u64) -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            last_trigger: None,
            debounce: Duration::from_millis(debounce_ms),
            cooldown: Duration::from_millis(cooldown_ms),
        }
    }

    /// Add a filtered event, applying coalescing rules:
    /// - Removed + Created/Modified → restored, use the new event
    /// - Modified + Removed → deleted, upgrade to Removed
    /// - Created + Removed → appeared then vanished, discard (no-op)
    /// - Same type events: first event wins
    pub fn add(&mut self, event: &WatchEvent) {
        if is_temp_file(&event.path) {
            return;
        }

        let path = normalize_path(&event.path);
        let kind = event.kind;

        if let Some(&existing) = self.changes.get(&path) {
            match (existing, kind) {
                (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                    crate::debug!("watch"; "restore {}->{}: {}", existing.label(), kind.label(), path.display());
                    self.changes.insert(path, kind);
                }
                (ChangeKind::Modified, ChangeKind::Removed) => {
                    crate::debug!("watch"; "upgrade modified->removed: {}", path.display());
                    self.changes.insert(path, ChangeKind::Removed);
                }
                (ChangeKind::Created, ChangeKind::Removed) => {
                    crate::debug!("watch"; "discard created+removed: {}", path.display());
                    self.changes.remove(&path);
                }
                _ => {
                    // Same kind or other combos (Created+Modified, etc.) → first wins
                    return;
                }
            }
            self.last_event = Some(std::time::Instant::now());
            return;
        }

        crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
        self.changes.insert(path, kind);
        self.last_event = Some(std::time::Instant::now());
    }

    /// Take the coalesced batch if debounce + cooldown elapsed.
    ///
    /// The batch is sorted by path so its first entry (the trigger label)
    /// is deterministic.
    pub fn take_if_ready(&mut self) -> Option<Vec<WatchEvent>> {
        if !self.is_ready() {
            return None;
        }

        let changes = std::mem::take(&mut self.changes);
        self.last_event = None;

        if changes.is_empty() {
            return None;
        }

        self.last_trigger = Some(std::time::Instant::now());

        let mut batch: Vec<WatchEvent> = changes
            .into_iter()
            .map(|(path, kind)| WatchEvent { path, kind })
            .collect();
        batch.sort_by(|a, b| a.path.cmp(&b.path));
        Some(batch)
    }

    pub fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };

        if last_event.elapsed() < self.debounce {
            return false;
        }

        if let Some(last_trigger) = self.last_trigger
            && last_trigger.elapsed() < self.cooldown
        {
            return false;
        }

        !self.changes.is_empty()
    }

    /// Precise sleep duration until next possible ready time.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let debounce_remaining = self.debounce.saturating_sub(last_event.elapsed());

        let cooldown_remaining = self
            .last_trigger
            .map(|t| self.cooldown.saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        debounce_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }

    #[cfg(test)]
    pub(super) fn pending(&self) -> &FxHashMap<std::path::PathBuf, ChangeKind> {
        &self.changes
    }

    #[cfg(test)]
    pub(super) fn force_ready(&mut self) {
        self.last_event = Some(std::time::Instant::now() - self.debounce * 2);
        self.last_trigger = None;
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
