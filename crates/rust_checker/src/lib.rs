//! Compile-only validation of a single Rust source text.
//!
//! [`CompilationChecker::check`] never fails: timeouts and tool failures come
//! back as an unsuccessful [`CompilationResult`] carrying the reason as its
//! diagnostic text.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;

pub mod diagnostics;
pub mod pkg_config;

pub use diagnostics::{DiagnosticSummary, extract_key_errors, is_warnings_only, summarize};
pub use pkg_config::CheckerConfig;

/// Name of the file written into each check directory.
pub const SOURCE_FILE_NAME: &str = "temp_check.rs";

pub const TIMEOUT_MESSAGE: &str = "Compilation timed out.";

#[derive(Debug, Error)]
pub enum RustCheckError {
    #[error("Compilation timed out after {0:?}")]
    CompilationTimeout(Duration),
    #[error("{0}")]
    CompilationToolFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CompilationResult {
    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn timed_out() -> Self {
        Self::failure(TIMEOUT_MESSAGE)
    }

    pub fn is_timeout(&self) -> bool {
        !self.success && self.stderr == TIMEOUT_MESSAGE
    }

    pub fn summary(&self) -> DiagnosticSummary {
        summarize(&self.stderr)
    }
}

impl From<RustCheckError> for CompilationResult {
    fn from(err: RustCheckError) -> Self {
        match err {
            RustCheckError::CompilationTimeout(_) => Self::timed_out(),
            RustCheckError::CompilationToolFailure(msg) => Self::failure(msg),
        }
    }
}

#[async_trait]
pub trait CodeChecker: Send + Sync {
    async fn check(&self, code: &str) -> CompilationResult;
}

pub struct CompilationChecker {
    compiler: PathBuf,
    edition: String,
    crate_type: String,
    timeout: Duration,
    workspace_root: Option<PathBuf>,
}

impl Default for CompilationChecker {
    fn default() -> Self {
        Self::from_config(&CheckerConfig::default())
    }
}

impl CompilationChecker {
    pub fn from_config(cfg: &CheckerConfig) -> Self {
        Self {
            compiler: PathBuf::from(&cfg.compiler),
            edition: cfg.edition.clone(),
            crate_type: cfg.crate_type.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            workspace_root: cfg.workspace_root.clone(),
        }
    }

    pub fn with_compiler(mut self, compiler: impl AsRef<Path>) -> Self {
        self.compiler = compiler.as_ref().to_path_buf();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_workspace_root(mut self, root: impl AsRef<Path>) -> Self {
        self.workspace_root = Some(root.as_ref().to_path_buf());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn scratch_dir(&self) -> Result<TempDir, RustCheckError> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("rust_check_");
            b
        };
        let dir = match &self.workspace_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(|e| {
            RustCheckError::CompilationToolFailure(format!(
                "Failed to create temp directory: {}",
                e
            ))
        })
    }

    /// Compile `code` in a fresh directory. The directory is removed when this
    /// returns, on every path.
    async fn run_compiler(&self, code: &str) -> Result<CompilationResult, RustCheckError> {
        let dir = self.scratch_dir()?;
        let source = dir.path().join(SOURCE_FILE_NAME);
        tokio::fs::write(&source, code).await.map_err(|e| {
            RustCheckError::CompilationToolFailure(format!(
                "Failed to write {}: {}",
                source.display(),
                e
            ))
        })?;

        // 只生成元数据，不做代码生成
        let mut command = Command::new(&self.compiler);
        command
            .arg("--emit=metadata")
            .arg(format!("--edition={}", self.edition))
            .arg(format!("--crate-type={}", self.crate_type))
            .arg("--out-dir")
            .arg(dir.path())
            .arg(&source)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running {} on {}", self.compiler.display(), source.display());

        // Dropping the output future on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|e| {
                RustCheckError::CompilationToolFailure(format!(
                    "Failed to execute {}: {}",
                    self.compiler.display(),
                    e
                ))
            })?,
            Err(_) => return Err(RustCheckError::CompilationTimeout(self.timeout)),
        };

        Ok(CompilationResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl CodeChecker for CompilationChecker {
    async fn check(&self, code: &str) -> CompilationResult {
        match self.run_compiler(code).await {
            Ok(result) if result.success => {
                info!("Compilation succeeded");
                result
            }
            Ok(result) => {
                // 编译失败：记录错误和警告数量
                let summary = result.summary();
                warn!(
                    "Compilation failed ({} errors, {} warnings)",
                    summary.errors, summary.warnings
                );
                debug!("Key errors:\n{}", extract_key_errors(&result.stderr));
                result
            }
            Err(e) => {
                error!("{}", e);
                e.into()
            }
        }
    }
}
