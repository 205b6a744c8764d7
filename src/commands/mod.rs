pub mod crawl;
pub mod stats;

use anyhow::{Context, Result};
use std::path::Path;

use portada::config::Config;

/// Load the configuration file when given, otherwise defaults plus environment
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Config::from_env(),
    }
}
