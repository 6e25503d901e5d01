//! Audit files, one per translation attempt.
//!
//! Layout:
//! ```text
//! <message>
//! {prompt}
//! </message>
//! <response>
//! {raw response}
//! </response>
//! <function>
//! {source function}
//! </function>
//! <translated function>
//! {extracted code}</translated function>
//! ```

use anyhow::{Context, Result};
use llm_requester::CodeExtractor;
use log::{debug, error, info, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Placeholder contents that mark a file without a usable translation.
const INVALID_CONTENT: [&str; 2] = ["Too long", "None"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationArtifact {
    pub message: String,
    pub response: String,
    pub function: String,
    pub translated_function: String,
}

impl TranslationArtifact {
    pub fn render(&self) -> String {
        format!(
            "<message>\n{}\n</message>\n<response>\n{}\n</response>\n<function>\n{}\n</function>\n<translated function>\n{}</translated function>",
            self.message, self.response, self.function, self.translated_function
        )
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.render())
            .with_context(|| format!("Failed to write artifact {}", path.display()))?;
        debug!("Artifact saved: {}", path.display());
        Ok(())
    }
}

/// `{dir}/{label}_attempt_{n}.txt`
pub fn artifact_path(dir: &Path, label: &str, attempt_index: usize) -> PathBuf {
    dir.join(format!("{}_attempt_{}.txt", sanitize(label), attempt_index))
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

fn translated_section() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)<translated function>(.*?)</translated function>").ok())
        .as_ref()
}

/// Translated code stored in an artifact file.
///
/// `None` for placeholder files, files without the translated section, or
/// unreadable files. A code fence inside the section is unwrapped.
pub fn read_translated_function(path: &Path) -> Option<String> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Error processing {}: {}", path.display(), e);
            return None;
        }
    };
    let content = String::from_utf8_lossy(&bytes);
    let content = content.trim();

    if INVALID_CONTENT.contains(&content) {
        return None;
    }

    let section = translated_section()?
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());
    let Some(section) = section else {
        warn!("No translation tag found in {}", path.display());
        return None;
    };

    let code = match CodeExtractor::rust() {
        Ok(extractor) => extractor.try_extract(section),
        Err(_) => None,
    };
    Some(code.unwrap_or_else(|| section.trim().to_string()))
}

/// Write `artifact` when an artifact directory is configured. Failures are
/// logged; auditing never interrupts a session.
pub fn save_artifact(
    dir: Option<&Path>,
    label: &str,
    attempt_index: usize,
    artifact: &TranslationArtifact,
) -> Option<PathBuf> {
    let dir = dir?;
    let path = artifact_path(dir, label, attempt_index);
    match artifact.write_to(&path) {
        Ok(()) => {
            info!("Translation attempt {} recorded in {}", attempt_index, path.display());
            Some(path)
        }
        Err(e) => {
            error!("{:#}", e);
            None
        }
    }
}
