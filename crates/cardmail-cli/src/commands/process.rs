//! Process command - extract a transaction from a single email file.

use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Datelike;
use clap::Args;
use console::style;
use tracing::{debug, info};

use cardmail_core::{
    ExtractionField, ExtractionOutcome, ExtractionReport, Transaction, TransactionExtractor,
};

use super::{load_config, load_email};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (.json or .eml)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,

    /// Print every extraction decision instead of the transaction
    #[arg(long)]
    explain: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let email = load_email(&args.input)?;
    let extractor = TransactionExtractor::new(config);
    let report = extractor.explain(&email)?;

    let output = if args.explain {
        format_report(&report, args.format)?
    } else {
        match &report.outcome {
            ExtractionOutcome::Matched(tx) => format_transaction(tx, args.format)?,
            outcome => {
                println!(
                    "{} No transaction found ({})",
                    style("ℹ").blue(),
                    describe_outcome(outcome)
                );
                debug!("Total processing time: {:?}", start.elapsed());
                return Ok(());
            }
        }
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        if let Some(tx) = report.outcome.transaction() {
            println!();
            println!(
                "{} Extraction confidence: {:.1}%",
                style("ℹ").blue(),
                tx.confidence * 100.0
            );
            for issue in tx.validate() {
                eprintln!("  {} {}", style("!").yellow(), issue);
            }
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Human-readable reason for an outcome.
pub fn describe_outcome(outcome: &ExtractionOutcome) -> String {
    match outcome {
        ExtractionOutcome::Irrelevant => "not from a known card issuer".to_string(),
        ExtractionOutcome::Statement => "statement summary".to_string(),
        ExtractionOutcome::NoMatch { missing } => format!("missing {}", missing.join(", ")),
        ExtractionOutcome::Matched(_) => "matched".to_string(),
    }
}

pub fn format_transaction(tx: &Transaction, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(tx)?),
        OutputFormat::Csv => format_csv(tx),
        OutputFormat::Text => Ok(format_text(tx)),
    }
}

fn format_report(report: &ExtractionReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => match report.outcome.transaction() {
            Some(tx) => format_csv(tx),
            None => anyhow::bail!("CSV output needs a matched transaction"),
        },
        OutputFormat::Text => Ok(format_report_text(report)),
    }
}

fn format_csv(tx: &Transaction) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "message_id",
        "occurred_at",
        "merchant_raw",
        "merchant_normalized",
        "amount",
        "currency",
        "card_label",
        "is_subscription",
        "confidence",
        "issuer",
    ])?;

    wtr.write_record([
        &tx.message_id,
        &tx.occurred_at.to_string(),
        &tx.merchant_raw,
        &tx.merchant_normalized.clone().unwrap_or_default(),
        &tx.amount.to_string(),
        &tx.currency,
        &tx.card_label.clone().unwrap_or_default(),
        &tx.is_subscription.to_string(),
        &format!("{:.2}", tx.confidence),
        &tx.issuer.clone().unwrap_or_default(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

pub fn format_text(tx: &Transaction) -> String {
    let mut output = String::new();

    output.push_str(&format!("Merchant: {}\n", tx.merchant_raw));
    output.push_str(&format!("Amount:   {} {}\n", tx.amount, tx.currency));
    output.push_str(&format!(
        "Date:     {} ({})\n",
        tx.occurred_at,
        tx.occurred_at.date().weekday()
    ));
    if let Some(card) = &tx.card_label {
        output.push_str(&format!("Card:     {}\n", card));
    }
    if tx.is_subscription {
        output.push_str("Recurring charge\n");
    }
    output.push_str(&format!("Message:  {}\n", tx.message_id));

    output
}

fn format_field<T: Display>(field: &ExtractionField<T>) -> String {
    match field {
        ExtractionField::Present {
            value,
            specificity,
            line,
        } => format!("{} [{}, line {}]", value, specificity.as_str(), line + 1),
        ExtractionField::Absent => "-".to_string(),
    }
}

fn format_report_text(report: &ExtractionReport) -> String {
    let amount = match &report.amount {
        ExtractionField::Present {
            value,
            specificity,
            line,
        } => format!(
            "{} {} [{}, line {}]",
            value.value,
            value.currency.as_deref().unwrap_or("?"),
            specificity.as_str(),
            line + 1
        ),
        ExtractionField::Absent => "-".to_string(),
    };

    let mut output = String::new();
    output.push_str(&format!("Message:        {}\n", report.message_id));
    output.push_str(&format!(
        "Classification: {}\n",
        report.classification.as_str()
    ));
    output.push_str(&format!(
        "Issuer:         {}\n",
        report.issuer.as_deref().unwrap_or("-")
    ));
    output.push_str(&format!("Merchant:       {}\n", format_field(&report.merchant)));
    output.push_str(&format!("Date:           {}\n", format_field(&report.occurred_at)));
    output.push_str(&format!("Amount:         {}\n", amount));
    output.push_str(&format!("Subscription:   {}\n", report.is_subscription));
    if let Some(score) = report.score {
        output.push_str(&format!("Score:          {:.2}\n", score));
    }
    output.push_str(&format!(
        "Outcome:        {} ({})\n",
        report.outcome.status(),
        describe_outcome(&report.outcome)
    ));

    output
}
