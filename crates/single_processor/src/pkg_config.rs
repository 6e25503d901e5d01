use serde::Deserialize;
use std::path::PathBuf;

/// `[repair]` section of config.toml
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Repair completions allowed after the initial translation.
    pub max_retries: usize,
    pub target_language: String,
    /// One audit file per translation attempt is written here when set.
    pub artifact_dir: Option<PathBuf>,
    /// Files translated at the same time by the batch driver.
    pub concurrent_limit: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            target_language: "Rust".to_string(),
            artifact_dir: None,
            concurrent_limit: 4,
        }
    }
}
