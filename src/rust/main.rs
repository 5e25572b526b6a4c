use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use txcat::{CategoryClassifier, ClassifierConfig, ClassifierState, ModelInfo, ModelManager, OnnxModelProvider, PredictionResult};

#[derive(Parser)]
#[command(author, version, about = "Predict spending categories for transaction descriptions", long_about = None)]
struct Args {
    /// Transaction descriptions to classify
    #[arg(required = true)]
    descriptions: Vec<String>,

    /// Directory containing model.onnx, tokenizer.json and config.json
    #[arg(short, long, conflicts_with = "manifest")]
    model_dir: Option<PathBuf>,

    /// JSON manifest of a model bundle to download into the cache and use
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Force a fresh download of the model files
    #[arg(short, long, requires = "manifest")]
    fresh: bool,

    /// Number of ranked categories to show (defaults to TXCAT_TOP_K or 13)
    #[arg(short = 'k', long, value_parser = clap::value_parser!(u64).range(1..))]
    top_k: Option<u64>,

    /// Print one JSON object per description instead of text
    #[arg(long)]
    json: bool,
}

async fn resolve_model_dir(args: &Args) -> anyhow::Result<PathBuf> {
    if let Some(dir) = &args.model_dir {
        return Ok(dir.clone());
    }
    let Some(manifest) = &args.manifest else {
        bail!("either --model-dir or --manifest is required");
    };

    let info = ModelInfo::from_manifest(manifest)
        .with_context(|| format!("reading manifest {}", manifest.display()))?;
    let manager = ModelManager::new_default()?;

    if args.fresh {
        info!("Fresh download requested - removing any existing model files...");
        manager.remove_download(&info.name)?;
    }
    manager.ensure_model_downloaded(&info).await?;

    Ok(manager.get_model_dir(&info.name))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    txcat::init_logger();
    let args = Args::parse();

    let model_dir = resolve_model_dir(&args).await?;
    let mut config = ClassifierConfig::from_env();
    if let Some(k) = args.top_k {
        config = config.with_default_top_k(usize::try_from(k).context("--top-k is too large")?);
    }

    let start_time = Instant::now();
    let classifier = CategoryClassifier::with_config(OnnxModelProvider::from_dir(&model_dir), config);
    if classifier.initialize() != ClassifierState::Loaded {
        // Predictions still run and degrade to "unknown"; make the reason visible here.
        eprintln!("warning: model in {} could not be loaded; see log output", model_dir.display());
    }
    info!("Classifier ready (took {:.2?})", start_time.elapsed());

    let classify_start = Instant::now();
    for description in &args.descriptions {
        let result = classifier.predict(description);
        if args.json {
            println!("{}", serde_json::json!({ "description": description, "prediction": result }));
        } else {
            print_result(description, &result);
        }
    }
    info!(
        "Classified {} descriptions in {:.2?}",
        args.descriptions.len(),
        classify_start.elapsed()
    );

    Ok(())
}

fn print_result(description: &str, result: &PredictionResult) {
    println!("\n{}", description);
    println!("  Predicted category: {}", result.top_label);
    for hypothesis in &result.hypotheses {
        println!("    {}: {:.1}%", hypothesis.category, hypothesis.probability * 100.0);
    }
}
