use config::{Config, ConfigError, Environment, File};
use db_services::RetrievalConfig;
use llm_requester::LlmConfig;
use prompt_builder::FunctionContext;
use rust_checker::CheckerConfig;
use serde::Deserialize;
use single_processor::RepairConfig;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "TRANSREPAIR";

/// Whole config.toml. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub checker: CheckerConfig,
    pub repair: RepairConfig,
}

fn locate(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }
    // Relative paths are also tried from the crate directories.
    if path.is_relative() {
        for prefix in ["..", "../.."] {
            let candidate = Path::new(prefix).join(path);
            if candidate.exists() {
                log::debug!("Using config file {}", candidate.display());
                return Some(candidate);
            }
        }
    }
    None
}

/// Read `path` (TOML) and overlay `TRANSREPAIR_` environment variables, e.g.
/// `TRANSREPAIR_LLM__API_KEYS=k1,k2` or `TRANSREPAIR_REPAIR__MAX_RETRIES=3`.
///
/// A missing file is not an error; defaults apply.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    match locate(path) {
        Some(found) => builder = builder.add_source(File::from(found.as_path())),
        None => log::warn!(
            "Config file {} not found, using defaults and environment",
            path.display()
        ),
    }

    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("llm.api_keys")
                .with_list_parse_key("llm.supported_models")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

/// Target-side context for one translation, e.g.
///
/// ```toml
/// signature = "fn add(a: i32, b: i32) -> i32"
/// libraries = ["use std::ops::Add;"]
/// ```
pub fn load_function_context(path: &Path) -> Result<FunctionContext, ConfigError> {
    Config::builder()
        .add_source(File::from(path))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let cfg = load_config(Path::new("/nonexistent/transrepair.toml")).unwrap();
        assert_eq!(cfg.repair.max_retries, 5);
        assert_eq!(cfg.checker.compiler, "rustc");
        assert_eq!(cfg.retrieval.collection_name, "function_pair");
    }

    #[test]
    fn test_file_sections_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[llm]
api_keys = ["sk-a", "sk-b"]
model = "deepseek-v3"

[repair]
max_retries = 2

[checker]
timeout_secs = 30

[retrieval]
enabled = false
"#
        )
        .unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.llm.usable_api_keys(), vec!["sk-a", "sk-b"]);
        assert_eq!(cfg.llm.model.as_deref(), Some("deepseek-v3"));
        assert_eq!(cfg.repair.max_retries, 2);
        assert_eq!(cfg.repair.target_language, "Rust");
        assert_eq!(cfg.checker.timeout_secs, 30);
        assert!(!cfg.retrieval.enabled);
    }

    #[test]
    fn test_function_context_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
signature = "fn add(a: i32, b: i32) -> i32"
libraries = ["use std::ops::Add;"]
"#
        )
        .unwrap();

        let context = load_function_context(file.path()).unwrap();
        assert_eq!(context.signature.as_deref(), Some("fn add(a: i32, b: i32) -> i32"));
        assert_eq!(context.libraries, vec!["use std::ops::Add;"]);
        assert!(context.dependencies.is_empty());
    }

    #[test]
    fn test_function_context_file_must_exist() {
        assert!(load_function_context(Path::new("/nonexistent/context.toml")).is_err());
    }
}
