//! Shared command utilities
//!
//! This module contains:
//! - `load_config` - Resolve configuration (flag, user file, built-in defaults)
//! - `Workspace` - Records file, profile and the analysis manager wired together

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use aura_core::{AnalysisManager, Config, JsonFileRecordStore, StaticProfile};

/// Load configuration, falling back to built-in defaults
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).context("Failed to load configuration")
}

/// Everything a command needs to work on one records file
pub struct Workspace {
    pub config: Config,
    pub store: Arc<JsonFileRecordStore>,
    pub manager: Arc<AnalysisManager>,
}

impl Workspace {
    pub fn open(records: &Path, profile: Option<&Path>, config: Config) -> Result<Self> {
        let store = Arc::new(
            JsonFileRecordStore::open(records)
                .with_context(|| format!("Failed to open records file {}", records.display()))?,
        );

        let profile = match profile {
            Some(path) => StaticProfile::from_file(path)
                .with_context(|| format!("Failed to read profile {}", path.display()))?,
            None => StaticProfile::none(),
        };

        let manager = Arc::new(AnalysisManager::from_config(
            &config,
            store.clone(),
            Arc::new(profile),
        ));

        Ok(Self {
            config,
            store,
            manager,
        })
    }
}
