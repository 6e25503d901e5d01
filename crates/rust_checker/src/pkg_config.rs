use serde::Deserialize;
use std::path::PathBuf;

/// `[checker]` section of config.toml
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub compiler: String,
    pub edition: String,
    /// `bin` or `lib`
    pub crate_type: String,
    pub timeout_secs: u64,
    /// Parent directory for the per-check temp dirs. System temp dir when unset.
    pub workspace_root: Option<PathBuf>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            compiler: "rustc".to_string(),
            edition: "2021".to_string(),
            crate_type: "bin".to_string(),
            timeout_secs: 10,
            workspace_root: None,
        }
    }
}
