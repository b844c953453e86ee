//! Batch processing command for multiple email files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use cardmail_core::{ExtractionReport, TransactionExtractor};

use super::process::{describe_outcome, format_transaction, OutputFormat};
use super::{is_email_file, load_config, load_email};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    index: usize,
    path: PathBuf,
    report: Result<ExtractionReport, String>,
    processing_time_ms: u64,
}

impl ProcessResult {
    fn status(&self) -> &'static str {
        match &self.report {
            Ok(report) => report.outcome.status(),
            Err(_) => "error",
        }
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_email_file(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let extractor = Arc::new(TransactionExtractor::new(config));
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut tasks = JoinSet::new();

    for (index, path) in files.into_iter().enumerate() {
        let extractor = Arc::clone(&extractor);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let result = tokio::task::spawn_blocking(move || {
                let file_start = Instant::now();
                let report = process_single_file(&path, &extractor).map_err(|e| e.to_string());
                ProcessResult {
                    index,
                    path,
                    report,
                    processing_time_ms: file_start.elapsed().as_millis() as u64,
                }
            })
            .await?;
            anyhow::Ok(result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let result = joined??;
        overall_pb.inc(1);

        if let Err(error_msg) = &result.report {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", result.path.display(), error_msg);
            } else {
                error!("Failed to process {}: {}", result.path.display(), error_msg);
                tasks.abort_all();
                overall_pb.abandon();
                anyhow::bail!("Processing failed: {}: {}", result.path.display(), error_msg);
            }
        }
        results.push(result);
    }

    overall_pb.finish_with_message("Complete");
    results.sort_by_key(|r| r.index);

    // Write outputs
    if let Some(output_dir) = &args.output_dir {
        for result in &results {
            let Ok(report) = &result.report else {
                continue;
            };
            let Some(tx) = report.outcome.transaction() else {
                continue;
            };

            let output_name = result
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("email");
            let output_path =
                output_dir.join(format!("{}.{}", output_name, args.format.extension()));

            fs::write(&output_path, format_transaction(tx, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let count = |status: &str| results.iter().filter(|r| r.status() == status).count();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} matched, {} no match, {} statements, {} irrelevant, {} failed",
        style(count("matched")).green(),
        count("no_match"),
        count("statement"),
        count("irrelevant"),
        style(count("error")).red()
    );

    let failed: Vec<_> = results.iter().filter(|r| r.report.is_err()).collect();
    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.report.as_ref().err().map_or("unknown error", String::as_str)
            );
        }
    }

    Ok(())
}

fn process_single_file(
    path: &Path,
    extractor: &TransactionExtractor,
) -> anyhow::Result<ExtractionReport> {
    let email = load_email(path)?;
    Ok(extractor.explain(&email)?)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "message_id",
        "occurred_at",
        "merchant",
        "amount",
        "currency",
        "confidence",
        "processing_time_ms",
        "detail",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let time_ms = result.processing_time_ms.to_string();

        match &result.report {
            Ok(report) => match report.outcome.transaction() {
                Some(tx) => wtr.write_record([
                    filename,
                    result.status(),
                    &tx.message_id,
                    &tx.occurred_at.to_string(),
                    &tx.merchant_raw,
                    &tx.amount.to_string(),
                    &tx.currency,
                    &format!("{:.2}", tx.confidence),
                    &time_ms,
                    "",
                ])?,
                None => wtr.write_record([
                    filename,
                    result.status(),
                    &report.message_id,
                    "",
                    "",
                    "",
                    "",
                    "",
                    &time_ms,
                    &describe_outcome(&report.outcome),
                ])?,
            },
            Err(error_msg) => wtr.write_record([
                filename,
                result.status(),
                "",
                "",
                "",
                "",
                "",
                "",
                &time_ms,
                error_msg,
            ])?,
        }
    }

    wtr.flush()?;
    Ok(())
}
