//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `domain_rankings` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting

use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use domain_rankings::config::{resolve_day, Command};
use domain_rankings::initialization::{init_list_store, init_logger_with, init_storage};
use domain_rankings::{
    daily_config, AppConfig, DatabaseError, EnsureOutcome, Generator, ListConfig, ListId,
    ListSize, RawListConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env from the working directory, then from next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let config = AppConfig::parse();
    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    if let Err(e) = run(config).await {
        eprintln!("domain_rankings error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}

async fn run(config: AppConfig) -> Result<()> {
    let storages = init_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    let store = Arc::new(
        init_list_store(&config)
            .await
            .context("Failed to open list database")?,
    );
    let generator = Generator::new(store, storages.sources, storages.outputs);

    match config.command {
        Command::Generate {
            config,
            request,
            dry_run,
        } => {
            let list_config = match config {
                Some(path) => load_request(&path)?,
                None => ListConfig::try_from(RawListConfig::from(request))
                    .context("Invalid list request flags")?,
            };
            if dry_run {
                let domains = generator
                    .compute(&list_config)
                    .await
                    .context("Failed to compute list")?;
                let mut out = BufWriter::new(io::stdout().lock());
                for (index, domain) in domains.iter().enumerate() {
                    writeln!(out, "{},{}", index + 1, domain)?;
                }
                out.flush()?;
            } else {
                let outcome = generator
                    .ensure_generated(&list_config)
                    .await
                    .context("List generation failed")?;
                print_outcome(&outcome);
            }
        }
        Command::Daily { day } => {
            let day = resolve_day(&day, Utc::now().date_naive())?;
            let outcome = generator
                .ensure_generated(&daily_config(day))
                .await
                .with_context(|| format!("Daily list generation for {day} failed"))?;
            print_outcome(&outcome);
        }
        Command::Status { list_id } => {
            let id = ListId::new(list_id);
            match generator.store().record_for(&id).await {
                Ok(record) => println!(
                    "{}: {} (created {})",
                    id,
                    record.status(),
                    record.creation_time
                ),
                Err(DatabaseError::NotFound(_)) => println!("{}: unavailable (unknown list)", id),
                Err(e) => return Err(e).context("Failed to look up list"),
            }
        }
        Command::Config { list_id } => {
            let id = ListId::new(list_id);
            let list_config = generator
                .store()
                .config_for(&id)
                .await
                .with_context(|| format!("No configuration for list {id}"))?;
            println!("{}", serde_json::to_string_pretty(&list_config)?);
        }
        Command::Download {
            list_id,
            size,
            output,
        } => {
            let id = ListId::new(list_id);
            if !generator.store().is_available(&id).await? {
                anyhow::bail!("List {id} is not available");
            }
            let lines = generator
                .outputs()
                .read_list(&id, ListSize::parse_lenient(&size))
                .await
                .with_context(|| format!("Failed to read list {id}"))?;
            match output {
                Some(path) => {
                    let mut body = lines.join("\n");
                    body.push('\n');
                    std::fs::write(&path, body)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Saved {} entries to {}", lines.len(), path.display());
                }
                None => {
                    let mut out = BufWriter::new(io::stdout().lock());
                    for line in &lines {
                        writeln!(out, "{line}")?;
                    }
                    out.flush()?;
                }
            }
        }
    }
    Ok(())
}

/// Reads a JSON list request (web form field names) and validates it.
fn load_request(path: &Path) -> Result<ListConfig> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let raw: RawListConfig = serde_json::from_str(&body)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    ListConfig::try_from(raw).with_context(|| format!("Invalid list request in {}", path.display()))
}

fn print_outcome(outcome: &EnsureOutcome) {
    match outcome {
        EnsureOutcome::Available(id) => println!("List {id} is available"),
        EnsureOutcome::Generated(report) => println!(
            "Generated list {} with {} entries from {} source lists{}",
            report.list_id,
            report.entries,
            report.sources,
            if report.republished {
                " (republished as daily archive)"
            } else {
                ""
            }
        ),
    }
}
