//! Command-line interface
//!
//! Generate synthetic data, run the training pipeline, or score one event.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{AppConfig, PathsConfig};
use crate::inference::PredictionService;
use crate::pipeline::TrainingPipeline;
use crate::schema::PredictionRequest;
use crate::synthetic::MaintenanceDataGenerator;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

fn step_run(msg: &str) {
    println!("  {} {}...", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("  {} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "maintenance-cost")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Predict machine maintenance cost from event features")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON configuration file; missing sections use defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Put raw data, splits and artifacts under this directory
    #[arg(long, global = true)]
    pub workdir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a synthetic maintenance dataset
    Generate {
        /// Number of rows
        #[arg(short = 'n', long)]
        rows: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output CSV (defaults to the configured raw data path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ingest, train every candidate and persist the winner
    Train,

    /// Predict the cost of one maintenance event
    Predict(PredictArgs),
}

/// Feature values for a single prediction, as typed on the command line
#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    /// Machine age in years
    #[arg(long)]
    pub age: String,

    #[arg(long)]
    pub usage_hours: String,

    /// Routine, Preventive or Corrective
    #[arg(long)]
    pub maintenance_type: String,

    #[arg(long)]
    pub last_maintenance_days: String,

    /// 0 or 1
    #[arg(long)]
    pub part_replacement: String,

    /// Technician experience in years
    #[arg(long)]
    pub technician_experience: String,
}

impl From<PredictArgs> for PredictionRequest {
    fn from(args: PredictArgs) -> Self {
        PredictionRequest {
            age: args.age,
            usage_hours: args.usage_hours,
            maintenance_type: args.maintenance_type,
            last_maintenance_days: args.last_maintenance_days,
            part_replacement: args.part_replacement,
            technician_experience: args.technician_experience,
        }
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Resolve the configuration from the optional file and work directory
pub fn load_config(path: Option<&Path>, workdir: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    Ok(match workdir {
        Some(dir) => config.with_paths(PathsConfig::under(dir)),
        None => config,
    })
}

pub fn cmd_generate(
    config: &AppConfig,
    rows: Option<usize>,
    seed: Option<u64>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Generate");

    let mut generator_config = config.generator.clone();
    if let Some(rows) = rows {
        generator_config = generator_config.with_n_samples(rows);
    }
    if let Some(seed) = seed {
        generator_config = generator_config.with_seed(seed);
    }
    let output = output.unwrap_or(config.paths.raw_data.as_path());

    step_run(&format!("Writing {} rows", generator_config.n_samples));
    let start = Instant::now();
    let df = MaintenanceDataGenerator::new(generator_config).write_csv(output)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    kv("Output", &output.display().to_string());
    println!();
    Ok(())
}

pub fn cmd_train(config: &AppConfig) -> anyhow::Result<()> {
    section("Train");

    step_run("Running pipeline");
    let mut pipeline = TrainingPipeline::from_config(config);
    let outcome = pipeline.run()?;
    step_done(&format!("{:.2}s", outcome.elapsed_secs));

    println!();
    for line in outcome.report.summary().lines() {
        println!("  {}", line);
    }
    println!();

    let best = outcome.report.winner_score();
    kv("Best model", best.name());
    kv("Test R²", &format!("{:.4}", best.test.r2));
    kv("Artifacts", &outcome.artifact_dir.display().to_string());
    if outcome.report.low_confidence {
        println!(
            "  {}",
            format!("Test R² is below {:.2}; predictions may be unreliable", outcome.report.min_r2)
                .yellow()
        );
    }
    println!();
    Ok(())
}

pub fn cmd_predict(config: &AppConfig, args: PredictArgs) -> anyhow::Result<()> {
    section("Predict");

    let service = PredictionService::new(config.inference.clone());
    let cost = service.predict_request(&args.into())?;

    kv("Predicted cost", &format!("{:.2}", cost).bold().to_string());
    println!();
    Ok(())
}

/// Generate data if none exists, train, then score a sample event
pub fn cmd_demo(config: &AppConfig) -> anyhow::Result<()> {
    if !config.paths.raw_data.exists() {
        cmd_generate(config, None, None, None)?;
    }
    cmd_train(config)?;
    cmd_predict(
        config,
        PredictArgs {
            age: "5.0".to_string(),
            usage_hours: "5000.0".to_string(),
            maintenance_type: "Routine".to_string(),
            last_maintenance_days: "100".to_string(),
            part_replacement: "0".to_string(),
            technician_experience: "10.0".to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_predict() {
        let cli = Cli::try_parse_from([
            "maintenance-cost",
            "predict",
            "--age",
            "5",
            "--usage-hours",
            "5000",
            "--maintenance-type",
            "Routine",
            "--last-maintenance-days",
            "100",
            "--part-replacement",
            "0",
            "--technician-experience",
            "10",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Predict(args)) => {
                let record = PredictionRequest::from(args).parse().unwrap();
                assert_eq!(record.maintenance_type, "Routine");
                assert_eq!(record.last_maintenance_days, 100);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_workdir_overrides_paths() {
        let config = load_config(None, Some(Path::new("/tmp/mc"))).unwrap();
        assert_eq!(config.paths.artifact_dir, PathBuf::from("/tmp/mc/artifacts"));
        assert_eq!(config.inference.artifact_dir, config.paths.artifact_dir);
    }
}
