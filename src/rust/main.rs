use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;
use stageview::artifacts::{DEFAULT_FEATURES_FILE, DEFAULT_MODEL_FILE, ROOT_ENV_VAR};
use stageview::dashboard::{DEFAULT_BINS, DEFAULT_DATASET_FILE, DEFAULT_PREVIEW_ROWS};
use stageview::views::{self, DashboardOptions, FieldSource, PresetValues, Prompter};
use stageview::{ArtifactPaths, ArtifactStore, RuntimeConfig};

#[derive(Parser)]
#[command(author, version, about = "Liver cirrhosis stage prediction and dataset insights", long_about = None)]
struct Args {
    /// Project root the artifact and dataset paths are resolved against
    #[arg(long, env = ROOT_ENV_VAR, default_value = ".")]
    root: PathBuf,

    /// Serialized classifier (ONNX)
    #[arg(long, default_value = DEFAULT_MODEL_FILE)]
    model: PathBuf,

    /// Feature descriptor (JSON)
    #[arg(long, default_value = DEFAULT_FEATURES_FILE)]
    features: PathBuf,

    /// Training dataset (CSV)
    #[arg(long, default_value = DEFAULT_DATASET_FILE)]
    dataset: PathBuf,

    /// Expected SHA-256 of the model file
    #[arg(long)]
    model_sha256: Option<String>,

    /// Intra-op threads for model execution (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enter patient details and predict the stage
    Predict {
        /// Field value as NAME=VALUE; prompts for every field when omitted
        #[arg(long = "set", value_parser = PresetValues::parse_pair)]
        values: Vec<(String, String)>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarize the training dataset
    Dashboard {
        /// Rows shown in the preview
        #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
        rows: usize,

        /// Numeric column for the histogram (defaults to the first one)
        #[arg(long)]
        column: Option<String>,

        /// Histogram bins
        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,
    },
}

fn main() -> anyhow::Result<()> {
    stageview::init_logger();
    let args = Args::parse();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Predict { values, json } => {
            let mut paths = ArtifactPaths {
                model: args.root.join(&args.model),
                descriptor: args.root.join(&args.features),
                model_sha256: None,
            };
            if let Some(digest) = args.model_sha256 {
                paths = paths.with_model_sha256(digest);
            }
            let store = ArtifactStore::with_runtime_config(paths, RuntimeConfig::with_threads(args.threads));

            let mut source: Box<dyn FieldSource> = if values.is_empty() {
                Box::new(Prompter::new(io::stdin().lock()))
            } else {
                Box::new(PresetValues::new(values))
            };
            let outcome = views::render_prediction(&mut out, &store, source.as_mut(), json)?;
            info!("Prediction view finished: {:?}", outcome);
        }
        Command::Dashboard { rows, column, bins } => {
            let options = DashboardOptions {
                preview_rows: rows,
                column,
                bins,
            };
            let outcome = views::render_dashboard(&mut out, &args.root.join(&args.dataset), &options)?;
            info!("Dashboard finished: {:?}", outcome);
        }
    }

    Ok(())
}
