//! Obesity classifier CLI
//!
//! Command-line interface for training, one-off prediction, serving and
//! dataset inspection.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::dataset::generate_sample_dataset;
use crate::export::{load_metadata, load_model, save_model, ModelMetadata};
use crate::inference::validate_payload;
use crate::optimizer::{ConfigSpace, SweepDriver, TrainingConfig, TrainingOutcome};
use crate::server::{run_server, ServerConfig, DEFAULT_MODEL_PATH};
use crate::utils::{DataLoader, DEFAULT_DATA_FILE};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn fmt_score(score: Option<f64>) -> String {
    score.map(|s| format!("{:.4}", s)).unwrap_or_else(|| "-".to_string())
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "obesity")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stacked-ensemble obesity category classifier")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sweep the candidate configurations and save the best model
    Train {
        /// Labelled CSV file
        #[arg(short, long, default_value = DEFAULT_DATA_FILE)]
        data: PathBuf,

        /// Output artifact
        #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
        output: PathBuf,

        /// Training settings (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Candidate configurations (JSON)
        #[arg(long)]
        candidates: Option<PathBuf>,

        /// Random seed, overrides the config file
        #[arg(long)]
        seed: Option<u64>,

        /// Train on N generated rows instead of a CSV file
        #[arg(long)]
        sample: Option<usize>,

        /// Write the sweep and hold-out report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Predict one record with a saved model
    Predict {
        /// Trained model file
        #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,

        /// JSON file holding one record
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Serve predictions over HTTP
    Serve {
        /// Server host
        #[arg(long, env = "API_HOST")]
        host: Option<String>,

        /// Server port
        #[arg(short, long, env = "API_PORT")]
        port: Option<u16>,

        /// Trained model file
        #[arg(short, long, env = "MODEL_PATH")]
        model: Option<PathBuf>,
    },

    /// Show dataset or model information
    Info {
        /// Labelled CSV file
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Trained model file
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub struct TrainArgs<'a> {
    pub data: &'a Path,
    pub output: &'a Path,
    pub config: Option<&'a Path>,
    pub candidates: Option<&'a Path>,
    pub seed: Option<u64>,
    pub sample: Option<usize>,
    pub report: Option<&'a Path>,
}

pub fn cmd_train(args: TrainArgs<'_>) -> anyhow::Result<()> {
    section("Train");

    let mut config = match args.config {
        Some(path) => TrainingConfig::from_json_file(path)?,
        None => TrainingConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    let space = match args.candidates {
        Some(path) => ConfigSpace::from_json_file(path)?,
        None => ConfigSpace::default_space(),
    };

    let start = Instant::now();
    let dataset = match args.sample {
        Some(n) => {
            step_run(&format!("Generating {} sample rows", n));
            generate_sample_dataset(n, config.seed)?
        }
        None => {
            step_run(&format!("Loading {}", args.data.display()));
            DataLoader::new().load_csv(args.data)?
        }
    };
    step_done(&format!("{} rows × {} cols in {:.2?}", dataset.len(), dataset.columns().len(), start.elapsed()));

    println!();
    println!("  {:<16} {}", muted("Candidates"), space.len());
    println!("  {:<16} {}", muted("CV folds"), config.cv_folds);
    println!("  {:<16} {}", muted("Hold-out"), format!("{:.0}%", config.test_size * 100.0));
    println!("  {:<16} {}", muted("Seed"), config.seed);
    println!();

    step_run("Sweeping candidates");
    let start = Instant::now();
    let mut driver = SweepDriver::new(config, space);
    let outcome = driver.run(&dataset)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    print_sweep(&outcome);

    let metadata = ModelMetadata::from_outcome("obesity-stack", &outcome);
    step_run(&format!("Saving → {}", args.output.display()));
    save_model(&outcome.pipeline, metadata, args.output)?;
    step_done("");

    if let Some(path) = args.report {
        let report = serde_json::json!({
            "sweep": outcome.sweep,
            "best_candidate": outcome.best_candidate,
            "holdout": outcome.holdout,
        });
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        step_ok(&format!("Report written to {}", path.display()));
    }

    println!();
    Ok(())
}

fn print_sweep(outcome: &TrainingOutcome) {
    section("Sweep");
    println!("  {:<28} {:>10} {:>10} {:>9}", muted("Candidate"), muted("CV mean"), muted("CV std"), muted("Time"));
    println!("  {}", dim(&"─".repeat(60)));

    for (i, trial) in outcome.sweep.trials.iter().enumerate() {
        let marker = if i == outcome.sweep.best_trial_idx { ok("best") } else { dim("") };
        if trial.is_failed() {
            let reason = trial.error.as_deref().unwrap_or("failed");
            println!("  {:<28} {}", trial.name, format!("err: {}", reason).red());
        } else {
            println!(
                "  {:<28} {:>10} {:>10} {:>8.1}s {}",
                trial.name,
                fmt_score(trial.mean_score()),
                fmt_score(trial.std_score()),
                trial.duration_secs,
                marker
            );
        }
    }

    section("Hold-out");
    println!("  {:<16} {}", muted("Winner"), outcome.best_candidate.name.white().bold());
    println!("  {:<16} {}", muted("Accuracy"), format!("{:.4}", outcome.holdout.accuracy).white().bold());
    println!("  {:<16} {:.4}", muted("Macro F1"), outcome.holdout.macro_avg.f1_score);
    println!();
    for line in outcome.holdout.to_string().lines() {
        println!("  {}", line);
    }
    println!();
}

pub fn cmd_predict(model_path: &Path, input_path: &Path) -> anyhow::Result<()> {
    let (pipeline, _) = load_model(model_path)?;

    let text = std::fs::read_to_string(input_path)?;
    let payload: serde_json::Value = serde_json::from_str(&text)?;
    let record = validate_payload(&payload)?;

    let (label, confidence) = pipeline.predict_one(&record)?;
    let response = serde_json::json!({
        "prediction": label,
        "confidence": confidence.is_finite().then_some(confidence),
    });
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

pub fn cmd_info(data: Option<&Path>, model: Option<&Path>) -> anyhow::Result<()> {
    if data.is_none() && model.is_none() {
        anyhow::bail!("Pass --data and/or --model");
    }

    if let Some(path) = data {
        section("Data Info");
        let dataset = DataLoader::new().load_csv(path)?;

        println!("  {:<12} {}", muted("File"), path.display());
        println!("  {:<12} {}", muted("Rows"), dataset.len());
        println!("  {:<12} {}", muted("Columns"), dataset.columns().len() + 1);
        println!();

        println!("  {:<24} {:>8} {:>8}", muted("Class"), muted("Count"), muted("Share"));
        println!("  {}", dim(&"─".repeat(42)));
        let total = dataset.len().max(1) as f64;
        for (label, count) in dataset.class_distribution() {
            println!("  {:<24} {:>8} {:>7.1}%", label, count, 100.0 * count as f64 / total);
        }
        println!();
    }

    if let Some(path) = model {
        section("Model Info");
        let metadata = load_metadata(path)?;

        println!("  {:<16} {}", muted("File"), path.display());
        println!("  {:<16} {}", muted("Version"), metadata.version);
        println!("  {:<16} {}", muted("Trained"), metadata.trained_at);
        println!("  {:<16} {}", muted("Candidate"), metadata.candidate.name.white().bold());
        println!("  {:<16} {}", muted("Features"), metadata.feature_names.len());
        println!("  {:<16} {}", muted("CV accuracy"), fmt_score(metadata.cv_mean_accuracy));
        println!("  {:<16} {}", muted("Hold-out"), fmt_score(metadata.holdout_accuracy));
        for (key, value) in &metadata.metrics {
            println!("  {:<16} {:.4}", muted(key), value);
        }
        println!("  {:<16} {}", muted("Labels"), metadata.labels.join(", "));
        println!();
    }

    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(host: Option<String>, port: Option<u16>, model: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(model) = model {
        config = config.with_model_path(model);
    }

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Obesity Prediction API".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("API    ", &format!("http://{}:{}/predict", config.host, config.port)));
    line_box(&kv("Health ", &format!("http://{}:{}/health", config.host, config.port)));
    line_box(&kv("Model  ", &config.model_path.display().to_string()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
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
    fn test_parse_train() {
        let cli = Cli::try_parse_from(["obesity", "train", "--sample", "200", "--seed", "7"]).unwrap();
        match cli.command {
            Commands::Train { sample, seed, output, .. } => {
                assert_eq!(sample, Some(200));
                assert_eq!(seed, Some(7));
                assert_eq!(output, PathBuf::from(DEFAULT_MODEL_PATH));
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_strip_ansi() {
        let colored = format!("{}", "hello".red());
        assert_eq!(strip_ansi(&colored), "hello");
    }
}
