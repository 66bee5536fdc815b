use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "insider_detection=info";
const VERBOSE_FILTER: &str = "insider_detection=debug,info";

fn env_filter(verbose: bool, fallback: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match fallback {
        Some(level) => EnvFilter::new(format!("insider_detection={}", level)),
        None if verbose => EnvFilter::new(VERBOSE_FILTER),
        None => EnvFilter::new(DEFAULT_FILTER),
    })
}

/// 初始化 CLI 日誌；`log_level` 來自設定檔 [monitoring]，RUST_LOG 優先
pub fn init_cli_logger(verbose: bool, log_level: Option<&str>) {
    let level = if verbose { None } else { log_level };

    // 重複初始化（例如測試中）時忽略錯誤
    let _ = tracing_subscriber::registry()
        .with(env_filter(verbose, level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}

/// JSON 格式日誌，適合送進集中式日誌系統
pub fn init_json_logger() {
    let _ = tracing_subscriber::registry()
        .with(env_filter(false, None))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .try_init();
}
