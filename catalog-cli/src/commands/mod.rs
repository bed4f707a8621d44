//! Command implementations for the catalog CLI

pub mod probe;
pub mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog_server::CatalogConfig;
use clap::Args;

// Re-export dispatcher functions for flat access from main.rs
pub use probe::run_probe;
pub use serve::run_serve;

/// Config file and database override shared by `serve` and `probe`
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Config file (default: ~/.catalog/config.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Database URL tried before every configured candidate
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

impl DatabaseArgs {
    /// Load the config file and apply `--database-url`.
    pub fn load_config(&self) -> Result<CatalogConfig> {
        let mut config = CatalogConfig::load(self.config.as_deref()).context("Failed to load config")?;

        if let Some(url) = self.database_url.as_deref().filter(|u| !u.trim().is_empty()) {
            config.database.prepend_candidate(url);
        }

        Ok(config)
    }
}
