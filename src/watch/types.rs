use std::path::PathBuf;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// A single filtered filesystem change. Ephemeral: produced by the change
/// detector, consumed immediately by the reload loop, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Map a raw notify kind to a change kind, dropping noise.
///
/// Metadata-only modifications (mtime/atime/chmod) are ignored - they would
/// trigger endless rebuild loops.
pub(super) fn map_kind(kind: &notify::EventKind) -> Option<ChangeKind> {
    use notify::EventKind;

    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Modify(modify) => {
            if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                None
            } else {
                Some(ChangeKind::Modified)
            }
        }
        _ => None,
    }
}
