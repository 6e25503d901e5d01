use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use commandline_tool::{Cli, Commands, build_engine, load_config, load_function_context, parse_args};
use db_services::{ExampleRetriever, load_pairs_jsonl};
use log::{error, info};
use rust_checker::{CodeChecker, CompilationChecker, extract_key_errors};
use single_processor::{BatchOptions, FileStatus, TranslationRequest, run_batch};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing_appender::rolling;
use tracing_log::LogTracer;
use tracing_subscriber::filter::LevelFilter as SubLevel;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const LOG_FILE: &str = "translate_repair.log";

/// Rename the previous run's log to its modification time so the current run
/// always writes a fresh `LOG_FILE`.
fn archive_previous_log(log_dir: &Path) {
    let latest = log_dir.join(LOG_FILE);
    let Ok(modified) = fs::metadata(&latest).and_then(|m| m.modified()) else {
        return;
    };
    let stamp = DateTime::<Local>::from(modified).format("%y%m%d%H%M%S").to_string();
    let mut target = log_dir.join(format!("{}.log", stamp));
    let mut idx = 1;
    while target.exists() {
        target = log_dir.join(format!("{}-{}.log", stamp, idx));
        idx += 1;
    }
    let _ = fs::rename(&latest, &target);
}

fn init_logging(debug: bool) {
    // 将 log 宏的输出转发到 tracing
    let _ = LogTracer::init();

    let log_dir = Path::new("log");
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("Failed to create log directory: {}", e);
    }
    archive_previous_log(log_dir);

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::uptime());

    let file_appender = rolling::never(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Must outlive main or buffered lines are lost.
    let _guard: &'static _ = Box::leak(Box::new(guard));

    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(non_blocking);

    // Terminal: WARN and above unless --debug. File: INFO, or DEBUG with --debug.
    let (stdout_filter, file_filter) = if debug {
        (SubLevel::DEBUG, SubLevel::DEBUG)
    } else {
        (SubLevel::WARN, SubLevel::INFO)
    };

    let subscriber = tracing_subscriber::registry()
        .with(stdout_layer.with_filter(stdout_filter))
        .with(file_layer.with_filter(file_filter));
    let _ = subscriber.try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_args();
    init_logging(cli.debug);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    match cli.command {
        Commands::Translate {
            input,
            source_lang,
            target_lang,
            model,
            output,
            no_repair,
            context,
        } => {
            let source = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let label = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "translation".to_string());

            // 未指定目标语言时使用配置中的默认值
            let target_lang = target_lang.unwrap_or_else(|| cfg.repair.target_language.clone());
            let mut request = TranslationRequest::new(source_lang, source)
                .with_target_language(target_lang)
                .with_label(label);
            if let Some(model) = model {
                request = request.with_model(model);
            }
            if let Some(path) = context {
                let context = load_function_context(&path)
                    .with_context(|| format!("Failed to load context {}", path.display()))?;
                request = request.with_context(context);
            }

            let engine = build_engine(&cfg).await?.with_callback(Arc::new(|stage: &str| {
                info!("stage {}", stage);
            }));

            // --no-repair 只生成译文，不编译也不修复
            let (code, success) = if no_repair {
                match engine.translate(&request).await? {
                    Some(generated) => (Some(generated.code), true),
                    None => (None, false),
                }
            } else {
                engine.translate_and_repair(&request).await?.into_pair()
            };

            let Some(code) = code else {
                println!("No translation was produced for {}", input.display());
                std::process::exit(1);
            };
            match output {
                Some(path) => {
                    fs::write(&path, &code)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Translation written to {}", path.display());
                }
                None => println!("{}", code),
            }
            if !no_repair && !success {
                println!("Warning: the translation still does not compile");
                std::process::exit(2);
            }
            Ok(())
        }

        Commands::Batch {
            input_dir,
            output_dir,
            source_lang,
            extension,
            generate_only,
            concurrent_limit,
        } => {
            let engine = Arc::new(build_engine(&cfg).await?);
            let opts = BatchOptions {
                input_dir,
                source_lang,
                target_lang: cfg.repair.target_language.clone(),
                extension,
                output_dir,
                repair: !generate_only,
                concurrent_limit: concurrent_limit.unwrap_or(cfg.repair.concurrent_limit),
                show_progress: true,
            };
            let summary = run_batch(engine, &opts).await?;

            // 打印批处理统计
            println!("Processed {} file(s)", summary.total());
            if opts.repair {
                println!("  compiled:       {}", summary.count(&FileStatus::Compiled));
                println!("  not compiled:   {}", summary.count(&FileStatus::NotCompiled));
            } else {
                println!("  generated:      {}", summary.count(&FileStatus::Generated));
            }
            println!("  no translation: {}", summary.count(&FileStatus::NoTranslation));
            println!("  errors:         {}", summary.errors());
            for file in summary.files.iter() {
                if let FileStatus::Error(msg) = &file.status {
                    println!("  {}: {}", file.source.display(), msg);
                }
            }
            println!("Results saved in {}", opts.output_dir.display());
            Ok(())
        }

        Commands::Check { input } => {
            let code = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let result = CompilationChecker::from_config(&cfg.checker).check(&code).await;
            let summary = result.summary();
            if result.success {
                println!(
                    "{} compiles ({} warning(s))",
                    input.display(),
                    summary.warnings
                );
                Ok(())
            } else {
                println!(
                    "{} does not compile: {} error(s), {} warning(s)\n{}",
                    input.display(),
                    summary.errors,
                    summary.warnings,
                    extract_key_errors(&result.stderr)
                );
                std::process::exit(1);
            }
        }

        Commands::Index { pairs } => {
            let pairs = load_pairs_jsonl(&pairs)?;
            let retriever = db_services::connect(&cfg.retrieval).await?;
            let stored = retriever.index_pairs(&pairs).await?;
            println!(
                "Stored {} translation pair(s) in {}",
                stored, cfg.retrieval.collection_name
            );
            Ok(())
        }

        Commands::Retrieve { input, top_k } => {
            let code = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let retriever = db_services::connect(&cfg.retrieval).await?;
            let examples = retriever
                .retrieve(&code, top_k.unwrap_or(cfg.retrieval.top_k))
                .await?;
            if examples.is_empty() {
                println!("No similar examples found");
            }
            for (i, example) in examples.iter().enumerate() {
                println!(
                    "#{} score {:.4}\n[source code]\n{}\n[translation result]\n{}\n",
                    i + 1,
                    example.score,
                    example.source_snippet,
                    example.translated_snippet
                );
            }
            Ok(())
        }
    }
}
