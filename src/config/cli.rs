use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "insider-detection")]
#[command(about = "Detect potential insider trading on prediction markets")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "insider-detection.toml")]
    pub config: String,

    /// Override output directory from config
    #[arg(long)]
    pub output_path: Option<String>,

    /// Restrict scoring to these markets (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub markets: Vec<String>,

    /// Override monitoring setting from config
    #[arg(long)]
    pub monitor: Option<bool>,

    /// Validate the configuration and list sources without scoring
    #[arg(long)]
    pub dry_run: bool,

    /// Emit JSON logs instead of compact text
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 把命令列覆蓋套用到設定檔
    pub fn apply_overrides(&self, config: &mut super::DetectionConfig) {
        if let Some(output_path) = &self.output_path {
            config.output.output_path = output_path.clone();
        }
        if !self.markets.is_empty() {
            config.features.markets_of_interest = Some(self.markets.clone());
        }
        if let Some(monitor) = self.monitor {
            let monitoring = config
                .monitoring
                .get_or_insert_with(|| super::toml_config::MonitoringConfig {
                    enabled: monitor,
                    log_level: None,
                });
            monitoring.enabled = monitor;
        }
    }
}
