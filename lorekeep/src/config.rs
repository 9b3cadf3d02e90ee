use std::path::PathBuf;

use anyhow::{Context, Result};
use lorekeep_core::{IndexPolicy, StoreConfig};
use tracing::debug;

use crate::cli::Cli;

/// Resolves the store configuration from the command line.
///
/// `--base-path` (or `LOREKEEP_BASE_PATH`, possibly from a `.env` file) wins; otherwise
/// the current directory is used.
pub fn store_config(cli: &Cli) -> Result<StoreConfig> {
    let base_path = match &cli.base_path {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("Cannot determine the current directory")?,
    };
    Ok(resolve(base_path, cli.strict_index))
}

fn resolve(base_path: PathBuf, strict_index: bool) -> StoreConfig {
    let policy = if strict_index { IndexPolicy::Strict } else { IndexPolicy::Lenient };
    debug!("Using knowledge base at {} ({:?} index policy)", base_path.display(), policy);
    StoreConfig::new(base_path).with_index_policy(policy)
}
