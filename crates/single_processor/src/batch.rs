//! Translate every source file of a directory.
//!
//! Full-repair mode runs one repair session per file, at most
//! `concurrent_limit` at a time. Generation-only mode sends all prompts
//! through the credential pool and stores one artifact per file.

use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use llm_requester::{CodeExtractor, CompletionJob};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::artifact::TranslationArtifact;
use crate::repair_loop::RepairEngine;
use crate::session::{SessionState, TranslationRequest};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub source_lang: String,
    pub target_lang: String,
    /// File extension without the dot, e.g. `c`.
    pub extension: String,
    pub output_dir: PathBuf,
    /// Compile and repair each translation. Generation only when false.
    pub repair: bool,
    pub concurrent_limit: usize,
    pub show_progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Compiled,
    NotCompiled,
    Generated,
    NoTranslation,
    Error(String),
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub status: FileStatus,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub files: Vec<FileOutcome>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn count(&self, status: &FileStatus) -> usize {
        self.files.iter().filter(|f| &f.status == status).count()
    }

    pub fn errors(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Error(_)))
            .count()
    }
}

fn progress_style_spinner() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

fn progress_style_bar() -> ProgressStyle {
    ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Source files under `dir` with the given extension, sorted.
pub fn collect_sources(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow!("Input directory does not exist: {}", dir.display()));
    }
    let extension = extension.trim_start_matches('.');
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(10)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == extension))
        .collect();
    files.sort();
    Ok(files)
}

/// Label for a source file: its path relative to the input dir, without the
/// extension.
fn file_label(input_dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(input_dir).unwrap_or(path);
    relative
        .with_extension("")
        .to_string_lossy()
        .replace(['/', '\\'], "_")
}

/// File extension for translated code in `target_lang`.
pub fn target_extension(target_lang: &str) -> String {
    let lang = target_lang.trim().to_lowercase();
    match lang.as_str() {
        "rust" => "rs".to_string(),
        "python" => "py".to_string(),
        "c++" | "cpp" => "cpp".to_string(),
        "javascript" => "js".to_string(),
        "typescript" => "ts".to_string(),
        "go" | "golang" => "go".to_string(),
        _ => lang.chars().filter(|c| c.is_ascii_alphanumeric()).collect(),
    }
}

pub async fn run_batch(engine: Arc<RepairEngine>, opts: &BatchOptions) -> Result<BatchSummary> {
    // Fail once for a bad model instead of once per file.
    engine.pool().resolve_model(None)?;

    let sources = collect_sources(&opts.input_dir, &opts.extension)?;
    info!(
        "Found {} .{} file(s) in {}",
        sources.len(),
        opts.extension,
        opts.input_dir.display()
    );
    std::fs::create_dir_all(&opts.output_dir)
        .with_context(|| format!("Failed to create {}", opts.output_dir.display()))?;

    if sources.is_empty() {
        warn!("No source files found in {}", opts.input_dir.display());
        return Ok(BatchSummary::default());
    }

    if opts.repair {
        repair_all(engine, opts, sources).await
    } else {
        generate_all(&engine, opts, sources).await
    }
}

async fn repair_all(
    engine: Arc<RepairEngine>,
    opts: &BatchOptions,
    sources: Vec<PathBuf>,
) -> Result<BatchSummary> {
    let m = MultiProgress::new();
    if !opts.show_progress {
        m.set_draw_target(ProgressDrawTarget::hidden());
    }
    let overall = m.add(ProgressBar::new(sources.len() as u64));
    overall.set_style(progress_style_bar());
    overall.set_message("overall progress");

    let sem = Arc::new(Semaphore::new(opts.concurrent_limit.max(1)));
    let mut set = JoinSet::new();

    for path in sources {
        let pb = m.add(ProgressBar::new_spinner());
        pb.set_style(progress_style_spinner());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("queued: {}", path.display()));

        let engine = engine.clone();
        let sem = sem.clone();
        let overall = overall.clone();
        let label = file_label(&opts.input_dir, &path);
        let output_dir = opts.output_dir.clone();
        let source_lang = opts.source_lang.clone();
        let target_lang = opts.target_lang.clone();

        set.spawn(async move {
            let outcome = match sem.acquire_owned().await {
                Ok(_permit) => {
                    pb.set_message(format!("translating: {}", path.display()));
                    repair_one(&engine, &path, &label, &source_lang, &target_lang, &output_dir)
                        .await
                }
                Err(e) => FileOutcome {
                    source: path.clone(),
                    status: FileStatus::Error(format!("semaphore error: {}", e)),
                    output: None,
                },
            };
            match &outcome.status {
                FileStatus::Compiled => {
                    pb.finish_with_message(format!("compiled: {}", path.display()))
                }
                status => pb.abandon_with_message(format!("{:?}: {}", status, path.display())),
            }
            overall.inc(1);
            outcome
        });
    }

    let mut summary = BatchSummary::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(outcome) => summary.files.push(outcome),
            Err(e) => error!("Batch task failed: {}", e),
        }
    }
    overall.finish_with_message("all tasks finished");
    summary.files.sort_by(|a, b| a.source.cmp(&b.source));

    info!(
        "Batch finished: {} compiled, {} not compiled, {} without translation, {} errors",
        summary.count(&FileStatus::Compiled),
        summary.count(&FileStatus::NotCompiled),
        summary.count(&FileStatus::NoTranslation),
        summary.errors()
    );
    Ok(summary)
}

async fn repair_one(
    engine: &RepairEngine,
    path: &Path,
    label: &str,
    source_lang: &str,
    target_lang: &str,
    output_dir: &Path,
) -> FileOutcome {
    let failed = |status: FileStatus| FileOutcome {
        source: path.to_path_buf(),
        status,
        output: None,
    };

    let source = match tokio::fs::read_to_string(path).await {
        Ok(source) => source,
        Err(e) => return failed(FileStatus::Error(format!("read failed: {}", e))),
    };
    let request = TranslationRequest::new(source_lang, source)
        .with_target_language(target_lang)
        .with_label(label);

    let outcome = match engine.translate_and_repair(&request).await {
        Ok(outcome) => outcome,
        Err(e) => return failed(FileStatus::Error(e.to_string())),
    };

    let Some(code) = outcome.code else {
        return failed(FileStatus::NoTranslation);
    };
    let output = output_dir.join(format!("{}.{}", label, target_extension(target_lang)));
    if let Err(e) = tokio::fs::write(&output, &code).await {
        return failed(FileStatus::Error(format!("write {} failed: {}", output.display(), e)));
    }

    let status = if outcome.state == SessionState::Success {
        FileStatus::Compiled
    } else {
        FileStatus::NotCompiled
    };
    FileOutcome {
        source: path.to_path_buf(),
        status,
        output: Some(output),
    }
}

async fn generate_all(
    engine: &RepairEngine,
    opts: &BatchOptions,
    sources: Vec<PathBuf>,
) -> Result<BatchSummary> {
    let extractor = CodeExtractor::for_language(&opts.target_lang)?;
    let mut summary = BatchSummary::default();
    let mut jobs = Vec::with_capacity(sources.len());

    for path in sources {
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) => {
                summary.files.push(FileOutcome {
                    source: path,
                    status: FileStatus::Error(format!("read failed: {}", e)),
                    output: None,
                });
                continue;
            }
        };
        let request = TranslationRequest::new(&opts.source_lang, source.clone())
            .with_target_language(&opts.target_lang);
        let prompt = engine.translation_prompt(&request).await;
        jobs.push(CompletionJob {
            prompt,
            payload: (path, source),
        });
    }

    for result in engine.pool().generate_jobs_in_parallel(jobs, None).await? {
        let (path, source) = result.payload;
        let response = match result.response {
            Ok(response) => response,
            Err(e) => {
                error!("Generation for {} failed: {}", path.display(), e);
                summary.files.push(FileOutcome {
                    source: path,
                    status: FileStatus::NoTranslation,
                    output: None,
                });
                continue;
            }
        };

        let artifact = TranslationArtifact {
            translated_function: extractor.extract_code(&response),
            message: result.prompt,
            response,
            function: source,
        };
        let output = opts
            .output_dir
            .join(format!("{}.txt", file_label(&opts.input_dir, &path)));
        let status = match artifact.write_to(&output) {
            Ok(()) => FileStatus::Generated,
            Err(e) => FileStatus::Error(format!("{:#}", e)),
        };
        summary.files.push(FileOutcome {
            source: path,
            output: (status == FileStatus::Generated).then_some(output),
            status,
        });
    }

    summary.files.sort_by(|a, b| a.source.cmp(&b.source));
    info!(
        "Generation finished: {} of {} file(s) produced an artifact",
        summary.count(&FileStatus::Generated),
        summary.total()
    );
    Ok(summary)
}
