//! sitepurge CLI
//!
//! Replays recorded static site builds through the per-page purge pipeline
//! and inspects cache keys.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod errors;
mod manifest;
mod tracing;

use crate::cli::{Cli, Command};
use crate::errors::CliError;
use crate::manifest::BuildManifest;
use crate::tracing::{TracingConfig, correlation_id};
use sitepurge_core::{BuildReport, BuildSession, CommandPurgeEngine, PurgeOptions, TaskStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options file picked up from the project root when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "sitepurge.toml";

#[tokio::main]
async fn main() {
    // NOTE: Using eprintln! in panic hook is intentional - tracing infrastructure
    // may be corrupted during a panic, so we use the most reliable output method.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    if let Err(error) = run_main().await {
        eprintln!("{error:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> miette::Result<()> {
    let cli = cli::parse();
    crate::tracing::init_tracing(&TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        filter: None,
    })?;

    match cli.command {
        Command::Run {
            manifest,
            config,
            root,
            engine_command,
            engine_args,
        } => {
            let engine = CommandPurgeEngine::new(engine_command, engine_args);
            run_build(&manifest, config.as_deref(), root, engine).await?;
        }
        Command::Key { files } => {
            let key = sitepurge_cache::derive_cache_key(&files).map_err(CliError::from)?;
            println!("{key}");
        }
    }
    Ok(())
}

fn load_options(config: Option<&Path>, root: &Path) -> Result<PurgeOptions, CliError> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => {
            let default = root.join(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                return Ok(PurgeOptions::default());
            }
            default
        }
    };
    Ok(PurgeOptions::from_file(&path)?)
}

async fn run_build(
    manifest_path: &Path,
    config: Option<&Path>,
    root: Option<PathBuf>,
    engine: CommandPurgeEngine,
) -> Result<(), CliError> {
    let root = match root {
        Some(root) => root,
        None => std::env::current_dir().map_err(|e| {
            sitepurge_core::Error::io_no_path(e, "resolve current directory")
        })?,
    };

    let manifest = BuildManifest::load(manifest_path)?.rooted(&root);
    let project_root = manifest
        .config
        .project_root
        .clone()
        .unwrap_or_else(|| root.clone());
    let options = load_options(config, &project_root)?;

    ::tracing::info!(
        correlation_id = %correlation_id(),
        manifest = %manifest_path.display(),
        root = %project_root.display(),
        "Replaying build"
    );

    let mut session = BuildSession::new(project_root, options, Arc::new(engine));
    let report = manifest.replay(&mut session).await?;
    print_report(&report);

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::PagesFailed {
            failed: report.failed(),
            total: report.outcomes.len(),
        })
    }
}

fn print_report(report: &BuildReport) {
    if report.skipped {
        println!("skipped: output mode isn't static");
        return;
    }
    for outcome in &report.outcomes {
        let status = match &outcome.status {
            TaskStatus::CacheHit => "cached",
            TaskStatus::Purged => "purged",
            TaskStatus::Failed { .. } => "failed",
        };
        println!("{status:>7} {}", outcome.output_path.display());
    }
    println!(
        "{} pages: {} purged, {} cached, {} failed, {} bundles emptied",
        report.outcomes.len(),
        report.purged(),
        report.cache_hits(),
        report.failed(),
        report.truncated.len()
    );
}
