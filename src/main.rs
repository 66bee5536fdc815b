use clap::Parser;
use insider_detection::utils::error::ErrorSeverity;
use insider_detection::utils::{logger, validation::Validate};
use insider_detection::{build_pipeline, CliConfig, DetectionConfig, DetectionEngine, LocalStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 載入 TOML 配置
    let mut config = match DetectionConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };
    cli.apply_overrides(&mut config);

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose, config.log_level());
    }

    tracing::info!("🚀 Starting insider-detection '{}'", config.pipeline.name);
    tracing::debug!("CLI config: {:?}", cli);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }
    tracing::info!("✅ Configuration loaded and validated successfully");

    if cli.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No scoring will occur");
        print_dry_run(&config);
        return Ok(());
    }

    let monitor_enabled = config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = match build_pipeline(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => exit_with(e),
    };
    let storage = LocalStorage::new(config.output.output_path.clone());
    let mut engine = DetectionEngine::new_with_monitoring(pipeline, storage, config, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            let alerts = engine.pipeline().alerts().len();
            println!("✅ Detection run completed: {} alerts", alerts);
            println!("📁 Report saved to: {}", output_path);
        }
        Err(e) => exit_with(e),
    }

    Ok(())
}

fn print_dry_run(config: &DetectionConfig) {
    println!("Pipeline: {} {}", config.pipeline.name, config.pipeline.version);
    for source in &config.sources {
        let location = source
            .path
            .as_deref()
            .or(source.endpoint.as_deref())
            .unwrap_or("-");
        println!(
            "  source {:<16} {:?}/{:?} {}",
            source.name, source.r#type, source.kind, location
        );
    }
    for model in &config.models {
        println!("  model  {:<16} {:?}", model.name, model.kind);
    }
    for detector in &config.detectors {
        println!("  detector {:<14} {:?}", detector.name, detector.kind);
    }
    println!("  output {}", config.output.output_path);
}

fn exit_with(e: insider_detection::DetectionError) -> ! {
    tracing::error!(
        "❌ Detection run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // 依錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}
