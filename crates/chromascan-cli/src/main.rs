//! Chromascan command-line interface.
//!
//! ```bash
//! # Extract one report and print the result with its validation verdict
//! chromascan process report.png
//!
//! # Process a folder of scans concurrently
//! chromascan batch scans/*.png --max-concurrent 4 --timeout-ms 60000
//!
//! # Re-validate a saved result against a stricter floor
//! chromascan validate result.json --min-confidence 0.8
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chromascan::{ChromascanConfig, Pipeline, ProcessingResult, RawImage, validate_and_bridge};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Extract peak tables and method details from chromatogram report images
#[derive(Parser, Debug)]
#[command(name = "chromascan")]
#[command(author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON); `chromascan.toml` is discovered otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process a single report image
    Process {
        /// Image file (PNG, JPEG, TIFF, BMP, WebP or GIF)
        path: PathBuf,

        /// Skip skew correction
        #[arg(long)]
        no_deskew: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Process many report images concurrently
    Batch {
        /// Image files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Maximum images processed at once
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Per-image deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Validate a saved processing result
    Validate {
        /// JSON file holding a processing result
        path: PathBuf,

        /// Override the minimum overall confidence
        #[arg(long)]
        min_confidence: Option<f64>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Process {
            path,
            no_deskew,
            format,
        } => {
            if no_deskew {
                config.preprocessing.deskew.enabled = false;
            }
            let pipeline = Pipeline::from_config(&config).context("Failed to set up the pipeline")?;
            let raw = RawImage::from_path(&path).with_context(|| format!("Failed to read {}", path.display()))?;
            let options = config.preprocessing.clone();
            let result = tokio::task::spawn_blocking(move || pipeline.process(raw, &options))
                .await
                .context("Processing task failed")?
                .with_context(|| format!("Failed to process {}", path.display()))?;

            let outcome = validate_and_bridge(&result, &config.validation);
            tracing::info!(
                path = %path.display(),
                peaks = result.peaks.len(),
                valid = outcome.is_valid(),
                "Report processed"
            );
            match format {
                OutputFormat::Json => {
                    let mut report = serde_json::Map::new();
                    report.insert("result".to_string(), serde_json::to_value(&result)?);
                    report.insert("validation".to_string(), serde_json::to_value(&outcome.validation)?);
                    if let Some(request) = &outcome.request {
                        report.insert("request".to_string(), serde_json::to_value(request)?);
                    }
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                OutputFormat::Text => print_text_summary(&path, &result, &outcome.validation),
            }
            Ok(exit_code(outcome.is_valid()))
        }

        Commands::Batch {
            paths,
            max_concurrent,
            timeout_ms,
        } => {
            if max_concurrent.is_some() {
                config.batch.max_concurrent = max_concurrent;
            }
            if timeout_ms.is_some() {
                config.batch.timeout_ms = timeout_ms;
            }
            config.validate().context("Invalid batch options")?;

            let pipeline = Pipeline::from_config(&config).context("Failed to set up the pipeline")?;
            let items = pipeline.batch_process_files(paths).await.context("Batch processing failed")?;
            println!("{}", serde_json::to_string_pretty(&items)?);

            let accepted = items.iter().filter(|item| item.outcome.status() == "accepted").count();
            tracing::info!(total = items.len(), accepted, "Batch finished");
            Ok(exit_code(accepted == items.len()))
        }

        Commands::Validate { path, min_confidence } => {
            if let Some(floor) = min_confidence {
                config.validation.min_overall_confidence = floor;
            }
            config.validation.validate().context("Invalid validation options")?;

            let result = read_result(&path)?;
            let outcome = validate_and_bridge(&result, &config.validation);
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(exit_code(outcome.is_valid()))
        }
    }
}

/// Explicit path, then discovery, then defaults.
#[tracing::instrument]
fn load_config(path: Option<&Path>) -> Result<ChromascanConfig> {
    match path {
        Some(path) => ChromascanConfig::from_file(path).with_context(|| format!("Failed to load {}", path.display())),
        None => {
            let discovered = ChromascanConfig::discover().context("Failed to load discovered chromascan.toml")?;
            if discovered.is_none() {
                tracing::debug!("No chromascan.toml found, using defaults");
            }
            Ok(discovered.unwrap_or_default())
        }
    }
}

fn read_result(path: &Path) -> Result<ProcessingResult> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not a processing result", path.display()))
}

fn exit_code(valid: bool) -> ExitCode {
    if valid { ExitCode::SUCCESS } else { ExitCode::from(2) }
}

fn print_text_summary(path: &Path, result: &ProcessingResult, validation: &chromascan::ValidationOutcome) {
    println!("{}", path.display());
    println!(
        "  overall confidence: {:.3} ({} ms)",
        result.overall_confidence, result.processing_time_ms
    );
    for (group, score) in &result.per_field_confidence {
        println!("  {:<18} {:.3}", group.as_str(), score);
    }

    println!("  peaks: {}", result.peaks.len());
    for peak in &result.peaks {
        let area = peak.area.map(|a| format!("{:.2}", a)).unwrap_or_else(|| "-".to_string());
        let marker = if peak.out_of_order { " (out of order)" } else { "" };
        println!("    RT {:>8.3}  area {:>12}{}", peak.retention_time, area, marker);
    }

    for (name, value) in result.method_parameters.iter().chain(&result.sample_info) {
        println!("  {}: {}", name, serde_json::to_string(value).unwrap_or_default());
    }
    for warning in &result.warnings {
        println!("  warning: {}", warning);
    }

    if validation.is_valid {
        println!("  valid");
    } else {
        for issue in &validation.issues {
            println!("  issue: {}", issue);
        }
    }
    for recommendation in &validation.recommendations {
        println!("  recommendation: {}", recommendation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_batch_options() {
        let cli = Cli::parse_from(["chromascan", "batch", "a.png", "b.png", "--max-concurrent", "3"]);
        match cli.command {
            Commands::Batch {
                paths, max_concurrent, ..
            } => {
                assert_eq!(paths.len(), 2);
                assert_eq!(max_concurrent, Some(3));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_load_config_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[validation]\nmin_overall_confidence = 0.75\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.validation.min_overall_confidence, 0.75);
    }

    #[test]
    fn test_read_result_rejects_other_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.json");
        std::fs::write(&path, r#"{"hello": "world"}"#).unwrap();
        assert!(read_result(&path).is_err());
    }
}
