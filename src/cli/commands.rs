//! CLI command definitions and handlers

use clap::Subcommand;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use crate::cli::progress::ConsoleProgress;
use crate::core::config::SyncConfig;
use crate::sync::locales::scaffold_locales;
use crate::sync::orchestrator::{ExecutionReport, PullReport, TranslationOrchestrator};

/// Commands for docs-translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a translation plan and show what would be translated (dry run)
    Plan {
        /// Print the submitted plan request as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit a plan, create the translation job, wait for it and pull results
    Translate {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Download the project's current translations
    Pull,

    /// Copy content directories into per-locale folders under the i18n directory
    Scaffold,
}

/// Handle plan command
pub async fn handle_plan(config: SyncConfig, json: bool) -> anyhow::Result<()> {
    let orchestrator = TranslationOrchestrator::from_config(&config)?;
    info!(
        "Planning {} files for {} target locales",
        orchestrator.settings().source_files.len(),
        orchestrator.settings().target_locales.len()
    );

    let report = orchestrator.plan().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.request)?);
    }

    println!("\n📋 Translation plan for project {}", config.project_id);
    println!("   Files: {}", report.request.files_metadata.len());
    println!("   Added: {}", report.diff.added);
    println!("   Changed: {}", report.diff.changed);
    println!("   Unchanged: {}", report.diff.unchanged);

    Ok(())
}

/// Handle translate command
pub async fn handle_translate(config: SyncConfig, yes: bool) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let orchestrator = TranslationOrchestrator::from_config(&config)?;

    let report = orchestrator.plan().await?;
    println!("\n📋 Plan: {}", report.diff);

    if !yes && !confirm("Create translation job?")? {
        println!("Aborted, no job created.");
        return Ok(());
    }

    let cancel = orchestrator.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping translation run");
            cancel.cancel();
        }
    });

    let mut progress = ConsoleProgress::new(&config.project_id);
    let result = orchestrator.execute_plan(&report, &mut progress).await;
    interrupt.abort();

    let ExecutionReport {
        job_id,
        progress: counts,
        pull,
        ..
    } = result?;

    let duration = start_time.elapsed();
    info!("Job {} completed in {:?}", job_id, duration);

    println!("\n✅ Translation completed!");
    println!("   Job: {}", job_id);
    println!("   Translations: {}", counts.translations_completed);
    print_pull(&pull);
    println!("   Time: {:?}", duration);

    Ok(())
}

/// Handle pull command
pub async fn handle_pull(config: SyncConfig) -> anyhow::Result<()> {
    let orchestrator = TranslationOrchestrator::from_config(&config)?;
    let pull = orchestrator.pull().await?;

    println!("✅ Translations pulled");
    print_pull(&pull);
    Ok(())
}

fn print_pull(pull: &PullReport) {
    println!("   Saved to: {}", pull.saved_to.display());
    if !pull.changed_locales.is_empty() {
        println!("   Changed locales: {}", pull.changed_locales.join(", "));
    }
}

/// Handle scaffold command
pub async fn handle_scaffold(config: SyncConfig) -> anyhow::Result<()> {
    config.validate()?;
    let targets = config.target_locales();
    if config.content_dirs.is_empty() {
        anyhow::bail!("No content_dirs configured");
    }

    let content_dirs: Vec<PathBuf> = config.content_dirs.clone();
    let i18n_dir = config.i18n_dir.clone();
    let report = tokio::task::spawn_blocking(move || {
        scaffold_locales(&content_dirs, &i18n_dir, &targets)
    })
    .await??;

    println!(
        "✅ Scaffolded {} locales into {}",
        config.target_locales().len(),
        config.i18n_dir.display()
    );
    println!("   Copied: {}", report.copied);
    println!("   Skipped (already present): {}", report.skipped);
    if report.unreadable > 0 {
        println!("   ⚠️  Unreadable entries: {}", report.unreadable);
    }

    Ok(())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
