use std::path::{Path, PathBuf};
use std::time::Duration;

use super::debouncer::Debouncer;
use super::types::{ChangeKind, WatchEvent, map_kind};
use super::{IgnoreRules, batch_label};

const DEBOUNCE_MS: u64 = 300;
const COOLDOWN_MS: u64 = 800;

fn make_debouncer() -> Debouncer {
    Debouncer::new(DEBOUNCE_MS, COOLDOWN_MS)
}

fn event(path: &str, kind: ChangeKind) -> WatchEvent {
    WatchEvent {
        path: PathBuf::from(path),
        kind,
    }
}

#[test]
fn test_debouncer_empty() {
    let debouncer = make_debouncer();
    assert!(!debouncer.is_ready());
}

#[test]
fn test_event_coalescing_by_kind() {
    let mut debouncer = make_debouncer();

    debouncer.add(&event("/tmp/a.rs", ChangeKind::Created));
    debouncer.add(&event("/tmp/b.rs", ChangeKind::Modified));
    debouncer.add(&event("/tmp/c.rs", ChangeKind::Removed));

    assert_eq!(debouncer.pending().len(), 3);
    assert_eq!(
        debouncer.pending()[&PathBuf::from("/tmp/a.rs")],
        ChangeKind::Created
    );
    assert_eq!(
        debouncer.pending()[&PathBuf::from("/tmp/b.rs")],
        ChangeKind::Modified
    );
    assert_eq!(
        debouncer.pending()[&PathBuf::from("/tmp/c.rs")],
        ChangeKind::Removed
    );
}

#[test]
fn test_temp_file_ignored() {
    let mut debouncer = make_debouncer();

    debouncer.add(&event("/tmp/real.rs", ChangeKind::Modified));
    assert_eq!(debouncer.pending().len(), 1);

    // Editor artifacts — should not be tracked at all
    debouncer.add(&event("/tmp/.app.rs.swp", ChangeKind::Modified));
    debouncer.add(&event("/tmp/app.rs~", ChangeKind::Modified));
    debouncer.add(&event("/tmp/app.rs.bak", ChangeKind::Modified));
    assert_eq!(debouncer.pending().len(), 1);
}

#[test]
fn test_dedup_first_event_wins() {
    let mut debouncer = make_debouncer();

    // Same path: create then modify — first one (create) wins
    debouncer.add(&event("/tmp/a.rs", ChangeKind::Created));
    debouncer.add(&event("/tmp/a.rs", ChangeKind::Modified));

    assert_eq!(debouncer.pending().len(), 1);
    assert_eq!(
        debouncer.pending()[&PathBuf::from("/tmp/a.rs")],
        ChangeKind::Created
    );
}

#[test]
fn test_remove_then_create_restores() {
    let mut debouncer = make_debouncer();

    // File removed, then restored (created) — should become Created
    debouncer.add(&event("/tmp/a.rs", ChangeKind::Removed));
    debouncer.add(&event("/tmp/a.rs", ChangeKind::Created));

    assert_eq!(debouncer.pending().len(), 1);
    assert_eq!(
        debouncer.pending()[&PathBuf::from("/tmp/a.rs")],
        ChangeKind::Created
    );
}

#[test]
fn test_create_then_remove_discards() {
    let mut debouncer = make_debouncer();

    // File created, then removed — net no-op, should be discarded entirely
    debouncer.add(&event("/tmp/a.rs", ChangeKind::Created));
    debouncer.add(&event("/tmp/a.rs", ChangeKind::Removed));
    assert!(debouncer.pending().is_empty(), "created+removed should discard");
}

#[test]
fn test_modify_then_remove_upgrades() {
    let mut debouncer = make_debouncer();

    debouncer.add(&event("/tmp/a.rs", ChangeKind::Modified));
    debouncer.add(&event("/tmp/a.rs", ChangeKind::Removed));
    assert_eq!(debouncer.pending().len(), 1);
    assert_eq!(
        debouncer.pending()[&PathBuf::from("/tmp/a.rs")],
        ChangeKind::Removed
    );
}

#[test]
fn test_sleep_duration_no_events() {
    let debouncer = make_debouncer();
    assert!(debouncer.sleep_duration() >= Duration::from_secs(3600));
}

#[test]
fn test_sleep_duration_after_event() {
    let mut debouncer = make_debouncer();
    debouncer.add(&event("/tmp/a.rs", ChangeKind::Modified));

    let dur = debouncer.sleep_duration();
    assert!(dur <= Duration::from_millis(DEBOUNCE_MS + 10));
    assert!(dur >= Duration::from_millis(DEBOUNCE_MS - 50));
}

#[test]
fn test_take_if_ready_respects_debounce() {
    let mut debouncer = make_debouncer();
    debouncer.add(&event("/tmp/a.rs", ChangeKind::Modified));

    // Fresh event: still inside the debounce window
    assert!(debouncer.take_if_ready().is_none());

    debouncer.force_ready();
    let batch = debouncer.take_if_ready().expect("batch ready");
    assert_eq!(batch.len(), 1);

    // Batch taken: nothing pending
    assert!(debouncer.take_if_ready().is_none());
}

#[test]
fn test_batch_sorted_for_stable_label() {
    let mut debouncer = make_debouncer();
    debouncer.add(&event("/proj/src/zz.rs", ChangeKind::Modified));
    debouncer.add(&event("/proj/src/aa.rs", ChangeKind::Modified));
    debouncer.force_ready();

    let batch = debouncer.take_if_ready().expect("batch ready");
    assert_eq!(batch[0].path, PathBuf::from("/proj/src/aa.rs"));

    let label = batch_label(&batch, Path::new("/proj"));
    assert_eq!(label, "src/aa.rs (modified)");
}

#[test]
fn test_map_kind_drops_metadata_noise() {
    use notify::EventKind;
    use notify::event::{DataChange, MetadataKind, ModifyKind};

    assert_eq!(
        map_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Any))),
        Some(ChangeKind::Modified)
    );
    assert_eq!(
        map_kind(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))),
        None
    );
    assert_eq!(
        map_kind(&EventKind::Create(notify::event::CreateKind::File)),
        Some(ChangeKind::Created)
    );
    assert_eq!(
        map_kind(&EventKind::Remove(notify::event::RemoveKind::File)),
        Some(ChangeKind::Removed)
    );
    assert_eq!(map_kind(&EventKind::Access(notify::event::AccessKind::Any)), None);
}

#[test]
fn test_subscription_filters_and_unsubscribes() {
    let temp = tempfile::TempDir::new().unwrap();
    let root = temp.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::create_dir_all(root.join("target")).unwrap();

    let rules = IgnoreRules::new(".hotshell", &[], &[]);
    let (subscription, mut rx) = super::subscribe(&root, rules).unwrap();

    // A relevant change arrives; an ignored one does not
    std::fs::write(root.join("src/app.rs"), "pub fn app() {}").unwrap();
    std::fs::write(root.join("target/junk.so"), b"x").unwrap();

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    let mut seen_relevant = false;
    while std::time::Instant::now() < deadline {
        match rx.try_recv() {
            Ok(event) => {
                assert!(
                    !event.path.components().any(|c| c.as_os_str() == "target"),
                    "ignored path delivered: {}",
                    event.path.display()
                );
                if event.path.ends_with("src/app.rs") {
                    seen_relevant = true;
                    break;
                }
            }
            Err(_) => std::thread::sleep(Duration::from_millis(20)),
        }
    }
    assert!(seen_relevant, "expected change event for src/app.rs");

    // Unsubscription joins the bridge thread and must complete
    subscription.unsubscribe();
}
