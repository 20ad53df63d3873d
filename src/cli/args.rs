//! Command-line interface definitions.

use clap::{ColorChoice, Parser};
use std::path::{Path, PathBuf};

use crate::utils::path::{normalize_path, resolve_path};

/// hotshell development harness CLI
///
/// One optional positional argument: the root UI component source file.
/// Everything else is cosmetics.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the root UI component source file
    #[arg(value_hint = clap::ValueHint::FilePath, default_value = "src/app.rs")]
    pub component: PathBuf,

    /// Watch root (default: current directory)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolved watch root, absolute.
    pub fn root_path(&self) -> PathBuf {
        match &self.root {
            Some(root) => normalize_path(&expand(root)),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Resolved entry component path, absolute. Relative paths resolve
    /// against the cwd first, then the watch root.
    pub fn component_path(&self, root: &Path) -> PathBuf {
        resolve_path(&expand(&self.component), root)
    }
}

/// Expand `~` in user-provided paths.
fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}
