//! Command-line interface: serving, offline prediction and data preparation

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::dataset::{self, SplitConfig};
use crate::inference::{InferenceConfig, InferenceEngine, FeatureSchema, ModelArtifact};
use crate::server::{run_server, ServerConfig};
use crate::utils::{DataLoader, DataSaver};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

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

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "satisfaction-serve")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve a pre-trained passenger satisfaction classifier")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// How `prepare` treats missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MissingStrategy {
    /// Drop rows with any missing value
    Drop,
    /// Carry the previous row's value forward
    Ffill,
    /// Leave missing values in place
    Keep,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Server host
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Server port
        #[arg(short, long, env = "API_PORT", default_value = "5001")]
        port: u16,

        /// Model artifact file
        #[arg(short, long, env = "MODEL_PATH", default_value = "./model.json")]
        model: PathBuf,
    },

    /// Print the input schema of a model artifact as JSON
    Schema {
        /// Model artifact file
        #[arg(short, long, env = "MODEL_PATH", default_value = "./model.json")]
        model: PathBuf,
    },

    /// Score a CSV file offline
    Predict {
        /// Model artifact file
        #[arg(short, long, env = "MODEL_PATH", default_value = "./model.json")]
        model: PathBuf,

        /// Input CSV file with a header row
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV file (prints a preview when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clean, encode and split a raw CSV into train.csv and test.csv
    Prepare {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long, default_value = "satisfaction")]
        target: String,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// Fraction of rows held out for testing
        #[arg(long, default_value = "0.2")]
        test_size: f64,

        /// Shuffle seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Missing value handling
        #[arg(long, value_enum, default_value = "drop")]
        missing: MissingStrategy,

        /// Drop the first indicator of each encoded column
        #[arg(long)]
        drop_first: bool,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_serve(host: &str, port: u16, model: &Path) -> anyhow::Result<()> {
    let config = ServerConfig {
        host: host.to_string(),
        port,
        model_path: model.to_path_buf(),
        ..ServerConfig::from_env()
    };
    run_server(config).await
}

pub fn cmd_schema(model: &Path) -> anyhow::Result<()> {
    let artifact = ModelArtifact::load(model)?;
    let schema = FeatureSchema::derive_or_empty(&artifact);
    let out = serde_json::json!({
        "features": schema,
        "target": artifact.target,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

pub fn cmd_predict(model: &Path, data: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let start = Instant::now();
    let engine = InferenceEngine::load(model, InferenceConfig::from_env())?;
    step_done(&format!("{} in {:?}", engine.model().kind(), start.elapsed()));

    step_run("Loading data");
    let df = DataLoader::new().load_csv(data)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Scoring");
    let start = Instant::now();
    let mut scored = engine.predict_table(df)?;
    step_done(&format!("{:?}", start.elapsed()));

    match output {
        Some(path) => {
            step_run(&format!("Saving → {}", path.display()));
            DataSaver::save_csv(&mut scored, path)?;
            step_done(&format!("{} rows", scored.height()));
        }
        None => {
            println!();
            println!("{}", scored.head(Some(engine.config().preview_rows)));
        }
    }

    println!();
    Ok(())
}

pub fn cmd_prepare(
    data: &Path,
    target: &str,
    out: &Path,
    split: &SplitConfig,
    missing: MissingStrategy,
    drop_first: bool,
) -> anyhow::Result<()> {
    section("Prepare");

    step_run("Loading data");
    let df = DataLoader::new().load_csv(data)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Handling missing values");
    let df = match missing {
        MissingStrategy::Drop => dataset::drop_missing(&df)?,
        MissingStrategy::Ffill => dataset::forward_fill(&df)?,
        MissingStrategy::Keep => df,
    };
    step_done(&format!("{} rows", df.height()));

    step_run("Encoding categorical columns");
    let categorical: Vec<String> = dataset::categorical_columns(&df)
        .into_iter()
        .filter(|c| c != target)
        .collect();
    let df = dataset::one_hot_encode(&df, Some(categorical.as_slice()), drop_first)?;
    step_done(&format!("{} columns encoded", categorical.len()));

    step_run("Splitting");
    let parts = dataset::train_test_split(&df, target, split)?;
    step_done(&format!(
        "{} train / {} test",
        parts.x_train.height(),
        parts.x_test.height()
    ));

    std::fs::create_dir_all(out)?;
    let train_path = out.join("train.csv");
    let test_path = out.join("test.csv");
    DataSaver::save_csv(&mut parts.train_frame()?, &train_path)?;
    DataSaver::save_csv(&mut parts.test_frame()?, &test_path)?;

    println!();
    kv("Train", &train_path.display().to_string());
    kv("Test", &test_path.display().to_string());
    kv("Features", &parts.x_train.width().to_string());
    println!();
    Ok(())
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
    fn test_parse_prepare() {
        let cli = Cli::try_parse_from([
            "satisfaction-serve",
            "prepare",
            "--data",
            "survey.csv",
            "--out",
            "prepared",
            "--missing",
            "ffill",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Prepare {
                target,
                test_size,
                seed,
                missing,
                drop_first,
                ..
            }) => {
                assert_eq!(target, "satisfaction");
                assert_eq!(test_size, 0.2);
                assert_eq!(seed, 42);
                assert_eq!(missing, MissingStrategy::Ffill);
                assert!(!drop_first);
            }
            _ => panic!("expected prepare"),
        }
    }

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::try_parse_from(["satisfaction-serve"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_prepare_writes_splits() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("survey.csv");
        let mut csv = String::from("Age,Class,satisfaction\n");
        for i in 0..10 {
            let class = if i % 2 == 0 { "Eco" } else { "Business" };
            csv.push_str(&format!("{},{},{}\n", 20 + i, class, i % 2));
        }
        std::fs::write(&data, csv).unwrap();

        let out = dir.path().join("prepared");
        cmd_prepare(
            &data,
            "satisfaction",
            &out,
            &SplitConfig::default(),
            MissingStrategy::Drop,
            false,
        )
        .unwrap();

        let train = DataLoader::new().load_csv(out.join("train.csv")).unwrap();
        let test = DataLoader::new().load_csv(out.join("test.csv")).unwrap();
        assert_eq!(train.height(), 8);
        assert_eq!(test.height(), 2);
        let names: Vec<&str> = train.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["Age", "Class_Business", "Class_Eco", "satisfaction"]);
    }
}
