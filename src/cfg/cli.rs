// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

pub fn resolve_config_path(rel: &str) -> Result<PathBuf> {
    let p = Path::new(rel);

    let abs = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir().context("cannot get current working dir")?.join(p)
    };

    let canon = abs
        .canonicalize()
        .with_context(|| format!("failed to canonicalize path {abs:?}"))?;

    Ok(canon)
}

/// Harness CLI surfacing the Control API (spec.md §6) without a desktop shell.
#[derive(Debug, Parser)]
#[command(name = "modscope", about = "Passive network observer and module optimizer")]
pub struct Cli {
    /// Path to the runtime config YAML.
    #[arg(long, default_value = "config.yaml")]
    pub config: String,

    /// Path to the logger config YAML.
    #[arg(long, default_value = "config.logger.yaml")]
    pub log_config: String,

    /// List capture interfaces and exit.
    #[arg(long)]
    pub list_interfaces: bool,

    /// Interface to capture on; overrides the config's default.
    #[arg(long)]
    pub interface: Option<String>,

    /// Category filter: Attack, Guard, Support, or All.
    #[arg(long)]
    pub category: Option<String>,

    /// Attribute names to include (repeatable).
    #[arg(long = "attr")]
    pub attrs: Vec<String>,

    /// Prioritized attribute names, at most 6 (repeatable).
    #[arg(long = "prioritized-attr")]
    pub prioritized_attrs: Vec<String>,

    /// Sort by lexicographic priority-order key instead of combat power.
    #[arg(long)]
    pub priority_order: bool,
}
