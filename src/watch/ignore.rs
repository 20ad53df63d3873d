//! Ignore rules for filesystem subscriptions.
//!
//! A fixed set of directory-name and suffix patterns, immutable after
//! configuration. The predicate is pure: a path matching *any* rule is
//! dropped, so evaluation order never matters.

use regex::Regex;
use std::path::Path;

/// Directory names that never trigger rebuilds.
const IGNORED_DIRS: &[&str] = &[
    "target",
    "node_modules",
    ".git",
    ".cache",
    "dist",
    "build",
    "tmp",
    ".tmp",
];

/// File suffixes that never trigger rebuilds.
const IGNORED_EXTENSIONS: &[&str] = &[".log", ".db", ".sqlite", ".lock"];

/// Database sidecar files (`foo.db-wal`, `bar.sqlite-journal`).
const JOURNAL_PATTERN: &str = r"\.db-|\.sqlite-";

/// Immutable ignore-rule set applied to every raw watch event.
pub struct IgnoreRules {
    dirs: Vec<String>,
    suffixes: Vec<String>,
    journal: Regex,
}

impl IgnoreRules {
    /// Build the rule set: built-ins, the scratch directory (its artifacts
    /// must never re-trigger the build that wrote them), and any extras
    /// from the config file.
    pub fn new(scratch_dir: &str, extra_dirs: &[String], extra_suffixes: &[String]) -> Self {
        let mut dirs: Vec<String> = IGNORED_DIRS.iter().map(|d| (*d).to_owned()).collect();
        dirs.push(scratch_dir.to_owned());
        dirs.extend(extra_dirs.iter().cloned());

        let mut suffixes: Vec<String> =
            IGNORED_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect();
        suffixes.extend(extra_suffixes.iter().cloned());

        Self {
            dirs,
            suffixes,
            journal: Regex::new(JOURNAL_PATTERN).expect("valid pattern"),
        }
    }

    /// Check a path against every rule. `true` means the event is dropped.
    pub fn is_ignored(&self, path: &Path, root: &Path) -> bool {
        // Events outside the watch root never trigger anything
        let Ok(relative) = path.strip_prefix(root) else {
            return true;
        };

        // Directory-segment membership
        let in_ignored_dir = relative.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|name| self.dirs.iter().any(|d| d == name))
        });
        if in_ignored_dir {
            return true;
        }

        // Suffix match + database sidecars
        let name = relative
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        self.suffixes.iter().any(|s| name.ends_with(s.as_str())) || self.journal.is_match(name)
    }
}
