//! Cargo-driven artifact production.
//!
//! The view crate is never compiled in place: its sources are staged into a
//! shadow tree under the scratch directory with the refresh instrumentation
//! applied, the manifest rewritten to a `cdylib` target, and cargo is driven
//! over the shadow manifest. Only files whose content actually changed are
//! rewritten, so cargo's own freshness tracking keeps rebuilds incremental.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::transform::RefreshTransform;
use super::{BuildResult, Bundler};
use crate::utils::exec::{Cmd, strip_ansi};

/// Directory names never staged into the shadow tree.
const UNSTAGED_DIRS: &[&str] = &["target", "node_modules"];

/// Bundler implementation backed by the `cargo` toolchain.
pub struct CargoBundler {
    cargo: PathBuf,
    profile: String,
    transform: RefreshTransform,
}

impl CargoBundler {
    /// Locate `cargo` on PATH and set up the instrumentation transform.
    pub fn new(profile: &str, scratch_dir: &str) -> Result<Self> {
        let cargo = which::which("cargo").context("`cargo` not found on PATH")?;
        Ok(Self {
            cargo,
            profile: profile.to_owned(),
            transform: RefreshTransform::new(scratch_dir),
        })
    }

    fn try_build(&self, entry: &Path, out_dir: &Path) -> Result<BuildResult> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create {}", out_dir.display()))?;

        let Some(package_dir) = find_package_dir(entry) else {
            return Ok(BuildResult::fail(format!(
                "no Cargo.toml found above {}",
                entry.display()
            )));
        };

        let shadow_dir = out_dir.join("shadow");
        self.stage_shadow(&package_dir, entry, &shadow_dir)?;

        let output = Cmd::new(&self.cargo)
            .arg("build")
            .arg("--manifest-path")
            .arg(shadow_dir.join("Cargo.toml"))
            .arg("--target-dir")
            .arg(out_dir.join("target"))
            .args(["--profile", &self.profile])
            .args(["--message-format", "json-render-diagnostics"])
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (diagnostics, built_dylib) = parse_cargo_messages(&stdout);

        if !output.status.success() {
            let mut message = diagnostics.join("\n");
            if message.trim().is_empty() {
                message = strip_ansi(&String::from_utf8_lossy(&output.stderr)).into_owned();
            }
            return Ok(BuildResult::fail(message));
        }

        let Some(built) = built_dylib else {
            return Ok(BuildResult::fail(
                "build produced no dynamic-library artifact",
            ));
        };

        // Fixed output name, overwritten every build: `<entry stem>.so`.
        // Cache-busting is the loader's job, not ours.
        let fixed = out_dir.join(artifact_name(entry));
        std::fs::copy(&built, &fixed).with_context(|| {
            format!("failed to stage {} as {}", built.display(), fixed.display())
        })?;

        Ok(BuildResult::ok(fixed))
    }

    /// Stage the package into the shadow tree with instrumentation applied.
    ///
    /// Files are only rewritten when their staged content differs, and files
    /// that vanished from the package are pruned, so the shadow tree tracks
    /// the package exactly without churning mtimes.
    fn stage_shadow(&self, package_dir: &Path, entry: &Path, shadow_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(shadow_dir)?;

        let entry = crate::utils::normalize_path(entry);
        let mut staged: HashSet<PathBuf> = HashSet::new();
        self.stage_dir(package_dir, package_dir, entry.as_path(), shadow_dir, &mut staged)?;
        prune_stale(shadow_dir, shadow_dir, &staged)?;
        Ok(())
    }

    fn stage_dir(
        &self,
        dir: &Path,
        package_dir: &Path,
        entry: &Path,
        shadow_dir: &Path,
        staged: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        for dir_entry in std::fs::read_dir(dir)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            let name = dir_entry.file_name();
            let name = name.to_string_lossy();

            if dir_entry.file_type()?.is_dir() {
                // Build output, dependencies, and dotted trees (VCS, the
                // scratch dir itself) never enter the shadow
                if UNSTAGED_DIRS.contains(&name.as_ref()) || name.starts_with('.') {
                    continue;
                }
                self.stage_dir(&path, package_dir, entry, shadow_dir, staged)?;
                continue;
            }

            let relative = path.strip_prefix(package_dir).expect("inside package");
            let destination = shadow_dir.join(relative);
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let content = self.stage_file(&path, entry, package_dir)?;
            write_if_changed(&destination, &content)?;
            staged.insert(relative.to_path_buf());
        }
        Ok(())
    }

    /// Produce the staged content for one file.
    fn stage_file(&self, path: &Path, entry: &Path, package_dir: &Path) -> Result<Vec<u8>> {
        if path.file_name().is_some_and(|n| n == "Cargo.toml")
            && path.parent() == Some(package_dir)
        {
            let raw = std::fs::read_to_string(path)?;
            return Ok(rewrite_manifest(&raw, package_dir)?.into_bytes());
        }

        let is_entry = crate::utils::normalize_path(path) == entry;
        if !is_entry && !self.transform.is_eligible(path) {
            return Ok(std::fs::read(path)?);
        }

        let source = std::fs::read_to_string(path)?;
        let Some(transformed) = self.transform.transform(&source, path) else {
            return Ok(source.into_bytes());
        };

        let mut text = transformed.text;
        if is_entry {
            text.push('\n');
            text.push_str(&self.transform.registration_shim(&transformed.components));
        }
        Ok(text.into_bytes())
    }
}

impl Bundler for CargoBundler {
    fn build(&self, entry: &Path, out_dir: &Path) -> BuildResult {
        match self.try_build(entry, out_dir) {
            Ok(result) => result,
            Err(e) => BuildResult::fail(format!("{e:#}")),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Walk up from the entry file to the directory holding its `Cargo.toml`.
pub(super) fn find_package_dir(entry: &Path) -> Option<PathBuf> {
    entry
        .parent()?
        .ancestors()
        .find(|dir| dir.join("Cargo.toml").is_file())
        .map(Path::to_path_buf)
}

/// Fixed artifact file name: the entry's base name plus the platform's
/// dynamic-library suffix.
pub(super) fn artifact_name(entry: &Path) -> String {
    let stem = entry
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("view");
    format!("{stem}{}", std::env::consts::DLL_SUFFIX)
}

/// Rewrite the package manifest for shadow builds:
/// - detach from any enclosing workspace (the shadow must build standalone)
/// - force a `cdylib` lib target
/// - absolutize relative path dependencies against the original package dir
fn rewrite_manifest(raw: &str, package_dir: &Path) -> Result<String> {
    let mut doc: toml::Value = raw.parse()?;
    let table = doc
        .as_table_mut()
        .context("manifest root is not a table")?;

    table
        .entry("workspace")
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));

    let lib = table
        .entry("lib")
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    if let Some(lib) = lib.as_table_mut() {
        lib.insert(
            "crate-type".into(),
            toml::Value::Array(vec![toml::Value::String("cdylib".into())]),
        );
    }

    for section in ["dependencies", "dev-dependencies", "build-dependencies"] {
        let Some(deps) = table.get_mut(section).and_then(|v| v.as_table_mut()) else {
            continue;
        };
        for (_, dep) in deps.iter_mut() {
            if let Some(dep) = dep.as_table_mut()
                && let Some(path) = dep.get("path").and_then(|p| p.as_str())
                && !Path::new(path).is_absolute()
            {
                let absolute = crate::utils::normalize_path(&package_dir.join(path));
                dep.insert(
                    "path".into(),
                    toml::Value::String(absolute.to_string_lossy().into_owned()),
                );
            }
        }
    }

    Ok(toml::to_string(&doc)?)
}

/// Write only when content differs, preserving mtimes for cargo freshness.
fn write_if_changed(path: &Path, content: &[u8]) -> Result<bool> {
    if let Ok(existing) = std::fs::read(path)
        && existing == content
    {
        return Ok(false);
    }
    std::fs::write(path, content)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

/// Remove shadow files whose package counterpart vanished.
fn prune_stale(dir: &Path, shadow_dir: &Path, staged: &HashSet<PathBuf>) -> Result<()> {
    for dir_entry in std::fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        let path = dir_entry.path();
        if dir_entry.file_type()?.is_dir() {
            prune_stale(&path, shadow_dir, staged)?;
            continue;
        }
        let relative = path.strip_prefix(shadow_dir).expect("inside shadow");
        if !staged.contains(relative) {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Parse cargo's JSON message stream: rendered diagnostics plus the last
/// dynamic-library artifact built.
fn parse_cargo_messages(stdout: &str) -> (Vec<String>, Option<PathBuf>) {
    let mut diagnostics = Vec::new();
    let mut dylib = None;

    for line in stdout.lines() {
        let Ok(message) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };
        match message.get("reason").and_then(|r| r.as_str()) {
            Some("compiler-message") => {
                if let Some(rendered) = message
                    .pointer("/message/rendered")
                    .and_then(|r| r.as_str())
                {
                    diagnostics.push(strip_ansi(rendered).into_owned());
                }
            }
            Some("compiler-artifact") => {
                let filenames = message
                    .get("filenames")
                    .and_then(|f| f.as_array())
                    .into_iter()
                    .flatten();
                for filename in filenames {
                    if let Some(name) = filename.as_str()
                        && name.ends_with(std::env::consts::DLL_SUFFIX)
                    {
                        dylib = Some(PathBuf::from(name));
                    }
                }
            }
            _ => {}
        }
    }

    (diagnostics, dylib)
}

// ============================================================================
// Tests
// ============================================================================
