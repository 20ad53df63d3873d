//! hotshell - development-mode hot-reload harness for ratatui terminal UIs.

#![allow(dead_code)]

mod build;
mod cli;
mod config;
mod core;
mod error;
mod host;
mod logger;
mod reload;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::Cli;
use config::HarnessConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    logger::set_verbose(cli.verbose);

    let root = cli.root_path();
    let config = HarnessConfig::load(&root)?;
    let entry = cli.component_path(&root);

    // Runs until a shutdown signal or the surface is destroyed; startup
    // failures propagate out of main for a non-zero exit.
    host::run(&entry, &root, &config)
}
