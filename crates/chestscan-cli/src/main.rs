mod display;
mod export;
mod report;

use std::path::{Path, PathBuf};

use anyhow::Context;
use chestscan_ai::{OnnxModel, analyze, ensure_compatible};
use chestscan_core::{CLASS_COUNT, ClassLabel, ModelMetadata, ThresholdStore, VerdictSet};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use report::PatientInfo;

#[derive(Parser)]
#[command(
    name = "chestscan",
    version,
    about = "Multi-label chest X-ray disease screening (research use only)"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    artifacts: Artifacts,

    #[command(subcommand)]
    command: Command,
}

/// Locations of the model artifacts, loaded once at start-up.
#[derive(Args)]
struct Artifacts {
    /// Directory containing model.onnx.
    #[arg(
        long,
        env = "CHESTSCAN_MODEL_DIR",
        default_value = "models/densenet121-chestxray",
        global = true
    )]
    model_dir: PathBuf,

    /// Per-class decision thresholds (.npy or .json array of 14 values).
    #[arg(
        long,
        env = "CHESTSCAN_THRESHOLDS",
        default_value = "optimal_thresholds.npy",
        global = true
    )]
    thresholds: PathBuf,

    /// Optional temperature-scaling calibration (JSON).
    #[arg(long, env = "CHESTSCAN_CALIBRATION", global = true)]
    calibration: Option<PathBuf>,

    /// Optional model metadata (JSON with class_names) to check class order.
    #[arg(long, env = "CHESTSCAN_METADATA", global = true)]
    metadata: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Score one or more chest X-ray images.
    Predict {
        /// PNG or JPEG images.
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Which result views to print in text mode.
        #[arg(long, value_enum, default_value_t = View::All)]
        view: View,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Also write all verdicts to a Parquet file.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Show the loaded threshold table and calibration.
    Thresholds,
    /// Write a Markdown screening report for one image.
    Report {
        image: PathBuf,

        /// Output path for the report.
        #[arg(long, short)]
        out: PathBuf,

        #[command(flatten)]
        patient: PatientInfo,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum View {
    /// Predicted disease list only.
    Findings,
    /// All 14 classes with score, threshold, and status.
    Detailed,
    /// Score-vs-threshold bar chart.
    Scores,
    All,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct ImageResult<'a> {
    image: String,
    positive_count: usize,
    findings: Vec<ClassLabel>,
    verdicts: &'a VerdictSet,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    info!("chestscan v{}", env!("CARGO_PKG_VERSION"));

    let store = load_store(&cli.artifacts)?;

    match cli.command {
        Command::Thresholds => {
            print!("{}", display::threshold_table(&store)?);
        }
        Command::Predict {
            images,
            view,
            format,
            export,
        } => {
            let mut model = load_model(&cli.artifacts.model_dir, &store)?;

            let mut results = Vec::with_capacity(images.len());
            for path in &images {
                let verdicts = analyze_file(&mut model, &store, path)?;
                results.push((path.display().to_string(), verdicts));
            }

            match format {
                Format::Text => {
                    for (image, verdicts) in &results {
                        print_text(image, verdicts, view)?;
                    }
                }
                Format::Json => {
                    let out: Vec<ImageResult> = results
                        .iter()
                        .map(|(image, verdicts)| ImageResult {
                            image: image.clone(),
                            positive_count: verdicts.positive_count(),
                            findings: verdicts.positives().map(|r| r.label).collect(),
                            verdicts,
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
            }

            if let Some(path) = export {
                export::write_parquet(&path, &results)
                    .with_context(|| format!("exporting to {}", path.display()))?;
                eprintln!("Wrote {} verdict rows to {}", results.len() * CLASS_COUNT, path.display());
            }
        }
        Command::Report {
            image,
            out,
            patient,
        } => {
            let mut model = load_model(&cli.artifacts.model_dir, &store)?;
            let verdicts = analyze_file(&mut model, &store, &image)?;
            let generated = chrono::Local::now().naive_local();
            report::write_report(&out, &verdicts, &image, &patient, generated)?;
            eprintln!("Wrote report to {}", out.display());
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load thresholds, calibration, and (optionally) check the metadata class order.
fn load_store(artifacts: &Artifacts) -> anyhow::Result<ThresholdStore> {
    if let Some(path) = &artifacts.metadata {
        ModelMetadata::load(path)
            .with_context(|| format!("loading model metadata from {}", path.display()))?;
    }
    ThresholdStore::load(&artifacts.thresholds, artifacts.calibration.as_deref())
        .with_context(|| format!("loading thresholds from {}", artifacts.thresholds.display()))
}

fn load_model(model_dir: &Path, store: &ThresholdStore) -> anyhow::Result<OnnxModel> {
    let model = OnnxModel::load(model_dir).context("failed to load model")?;
    ensure_compatible(&model, store)?;
    Ok(model)
}

fn analyze_file(
    model: &mut OnnxModel,
    store: &ThresholdStore,
    path: &Path,
) -> anyhow::Result<VerdictSet> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    analyze(model, store, &bytes).with_context(|| format!("analysing {}", path.display()))
}

fn print_text(image: &str, verdicts: &VerdictSet, view: View) -> anyhow::Result<()> {
    println!("=== {image} ===");
    println!();
    if matches!(view, View::Findings | View::All) {
        print!("{}", display::findings(verdicts));
        println!();
    }
    if matches!(view, View::Detailed | View::All) {
        println!("Detailed Results (All 14 Classes)");
        println!("{}", display::detailed_table(verdicts)?);
        println!();
    }
    if matches!(view, View::Scores | View::All) {
        print!("{}", display::score_chart(verdicts));
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn artifact_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "chestscan",
            "predict",
            "a.png",
            "b.jpg",
            "--thresholds",
            "t.json",
            "--view",
            "detailed",
        ])
        .unwrap();
        assert_eq!(cli.artifacts.thresholds, PathBuf::from("t.json"));
        match cli.command {
            Command::Predict { images, view, .. } => {
                assert_eq!(images.len(), 2);
                assert!(view == View::Detailed);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn predict_requires_an_image() {
        assert!(Cli::try_parse_from(["chestscan", "predict"]).is_err());
    }

    #[test]
    fn load_store_fails_fast_on_missing_thresholds() {
        let artifacts = Artifacts {
            model_dir: PathBuf::from("unused"),
            thresholds: PathBuf::from("/nonexistent/optimal_thresholds.npy"),
            calibration: None,
            metadata: None,
        };
        let err = load_store(&artifacts).unwrap_err();
        assert!(err.to_string().contains("loading thresholds"), "got: {err}");
    }

    #[test]
    fn load_store_checks_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let thresholds = dir.path().join("t.json");
        std::fs::write(&thresholds, serde_json::to_string(&vec![0.5f32; 14]).unwrap()).unwrap();
        let metadata = dir.path().join("model_metadata.json");
        std::fs::write(&metadata, r#"{"class_names": ["Hernia"]}"#).unwrap();

        let mut artifacts = Artifacts {
            model_dir: PathBuf::from("unused"),
            thresholds,
            calibration: None,
            metadata: Some(metadata),
        };
        assert!(load_store(&artifacts).is_err());

        artifacts.metadata = None;
        let store = load_store(&artifacts).unwrap();
        assert_eq!(store.class_count(), 14);
    }
}
