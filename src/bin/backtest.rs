use anyhow::Context;
use clap::Parser;
use insider_detection::adapters::formats::parse_csv_trades;
use insider_detection::core::evaluation::{load_labels, DEFAULT_THRESHOLD};
use insider_detection::utils::logger;
use insider_detection::{build_pipeline, DetectionConfig, DetectionEngine, LocalStorage};

#[derive(Parser)]
#[command(name = "backtest")]
#[command(about = "Replay historical trades through the detection ensemble")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "insider-detection.toml")]
    config: String,

    /// Historical trades CSV
    #[arg(short, long)]
    trades: String,

    /// Ground-truth labels CSV (entity_id,label)
    #[arg(short, long)]
    labels: Option<String>,

    /// Score threshold used for evaluation
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = DetectionConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;
    logger::init_cli_logger(args.verbose, config.log_level());

    config
        .validate_for_backtest()
        .with_context(|| "configuration validation failed")?;

    let body = tokio::fs::read(&args.trades)
        .await
        .with_context(|| format!("failed to read trades file '{}'", args.trades))?;
    let trades = parse_csv_trades(&body).context("failed to parse trades CSV")?;

    let labels = match &args.labels {
        Some(path) => Some(
            load_labels(path).with_context(|| format!("failed to read labels file '{}'", path))?,
        ),
        None => None,
    };

    let pipeline = build_pipeline(&config)?;
    let storage = LocalStorage::new(config.output.output_path.clone());
    let monitor_enabled = config.monitoring_enabled();
    let mut engine = DetectionEngine::new_with_monitoring(pipeline, storage, config, monitor_enabled);

    let report = engine
        .run_backtest(&trades, labels.as_ref(), args.threshold)
        .await?;

    println!("✅ Backtest over {} trades", report.trades);
    for (name, value) in &report.metrics {
        println!("  {:<24} {:.4}", name, value);
    }
    if let Some(evaluation) = &report.evaluation {
        println!(
            "  precision={:.4} recall={:.4} f1={:.4} (threshold {})",
            evaluation.precision, evaluation.recall, evaluation.f1, report.threshold
        );
    }
    Ok(())
}
