use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use contract_tag_eval::embedded;
use contract_tag_eval::embedding::{Embedder, HashingEmbedder};
use contract_tag_eval::evaluator::{evaluate, load_collection, GROUND_TRUTH, PREDICTIONS};
use contract_tag_eval::report::{render_summary, save_report, Report};
use contract_tag_eval::template;
use contract_tag_eval::EvalConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Score predicted contract tags against a curated ground truth."
)]
struct Args {
    #[arg(long, env = "TAG_EVAL_CONFIG", help = "Optional TOML configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Ground truth JSON Lines file (overrides configuration)")]
    ground_truth: Option<PathBuf>,

    #[arg(long, help = "Predictions JSON Lines file (overrides configuration)")]
    predictions: Option<PathBuf>,

    #[arg(long, help = "Write the JSON report to this path (overrides configuration)")]
    output: Option<PathBuf>,

    #[arg(long, help = "Number of scoring threads")]
    workers: Option<usize>,

    #[arg(long, help = "Print build metadata and exit")]
    info: bool,

    #[arg(long, help = "Print the record template JSON and exit")]
    template: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tag_eval=info,contract_tag_eval=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if args.info {
        println!("{}", embedded::build_info_json());
        return Ok(());
    }

    if args.template {
        println!("{}", template::record_template_json());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => EvalConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => EvalConfig::default(),
    };
    if let Some(path) = args.ground_truth {
        config.paths.ground_truth = path;
    }
    if let Some(path) = args.predictions {
        config.paths.predictions = path;
    }
    if let Some(path) = args.output {
        config.paths.output = path;
    }
    if args.workers.is_some() {
        config.workers = args.workers;
    }
    config.validate().context("invalid configuration")?;

    let ground_truth = load_collection(&config.paths.ground_truth, GROUND_TRUTH).with_context(|| {
        format!(
            "failed to load ground truth from {}",
            config.paths.ground_truth.display()
        )
    })?;
    let predictions = load_collection(&config.paths.predictions, PREDICTIONS).with_context(|| {
        format!(
            "failed to load predictions from {}",
            config.paths.predictions.display()
        )
    })?;

    let embedder = HashingEmbedder::new(config.embedding.dimensions);
    let evaluation = evaluate(&ground_truth, &predictions, &config, &embedder)
        .context("failed to compute evaluation metrics")?;

    let report = Report::new(&config, embedder.name(), &evaluation, &ground_truth, &predictions);
    save_report(&config.paths.output, &report)
        .with_context(|| format!("failed to write {}", config.paths.output.display()))?;
    tracing::info!(path = %config.paths.output.display(), "report written");

    print!("{}", render_summary(&evaluation.metrics));
    println!(
        "\nDetailed results saved to '{}'",
        config.paths.output.display()
    );
    Ok(())
}
