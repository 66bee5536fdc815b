use anyhow::Result;
use insider_detection::{build_pipeline, DetectionConfig, DetectionEngine, LocalStorage};
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

const TRADES: &str = "\
trade_id,account_id,market_id,timestamp,outcome,size,price
t1,0xwhale,election,2024-11-01T09:00:00Z,yes,5000,0.15
t2,0xretail,election,2024-11-01T09:00:30Z,no,40,0.85
t3,0xwhale,election,2024-11-02T09:00:00Z,yes,6000,0.20
t4,0xretail,sports,2024-11-02T12:00:00Z,yes,25,0.55
t5,0xfriend,election,2024-11-02T09:00:00Z,yes,5900,0.20
";

const RESOLUTIONS: &str = "\
market_id,resolution_time,resolved_outcome
election,2024-11-03T00:00:00Z,yes
";

fn normalized(path: &Path) -> String {
    path.to_str().unwrap().replace('\\', "/")
}

fn write_inputs(dir: &Path) -> Result<(String, String)> {
    let trades = dir.join("trades.csv");
    let resolutions = dir.join("resolutions.csv");
    std::fs::write(&trades, TRADES)?;
    std::fs::write(&resolutions, RESOLUTIONS)?;
    Ok((normalized(&trades), normalized(&resolutions)))
}

fn config_toml(trades: &str, resolutions: &str, output: &str, extra: &str) -> String {
    format!(
        r#"
[pipeline]
name = "e2e"
version = "0.1.0"

[[sources]]
name = "trades"
type = "csv"
kind = "trades"
path = "{trades}"

[[sources]]
name = "resolutions"
type = "csv"
kind = "resolutions"
path = "{resolutions}"

[[models]]
name = "size"
kind = "rule"
rules = {{ avg_trade_size = 1000.0 }}

[[models]]
name = "profit"
kind = "logistic"
bias = -2.0
weights = {{ profit_proxy = 8.0 }}

[ensemble]
weights = {{ size = 1.0, profit = 1.0 }}

[[detectors]]
name = "size-z"
kind = "zscore"
features = ["avg_trade_size"]

[sequence]
enabled = true
embedding_dim = 4

{extra}

[output]
output_path = "{output}"
"#
    )
}

#[tokio::test]
async fn test_inference_writes_zip_report() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (trades, resolutions) = write_inputs(temp_dir.path())?;
    let output = normalized(&temp_dir.path().join("out"));
    let jsonl = normalized(&temp_dir.path().join("out/alerts.jsonl"));

    let extra = format!(
        r#"
[[alerts.sinks]]
type = "jsonl"
path = "{jsonl}"
"#
    );
    let config = DetectionConfig::from_toml_str(&config_toml(&trades, &resolutions, &output, &extra))?;
    config.validate_config()?;

    let pipeline = build_pipeline(&config)?;
    let storage = LocalStorage::new(output.clone());
    let mut engine = DetectionEngine::new(pipeline, storage, config);

    let output_path = engine.run().await?;
    assert!(output_path.ends_with("detection_report.zip"));

    // whale 與 friend 都是大額且押中結果
    let flagged: Vec<&str> = engine
        .pipeline()
        .alerts()
        .iter()
        .map(|a| a.entity_id.as_str())
        .collect();
    assert_eq!(flagged, vec!["0xwhale", "0xfriend"]);
    assert_eq!(engine.pipeline().explanations().len(), 3);
    assert_eq!(engine.pipeline().anomaly_scores().len(), 5);
    assert_eq!(engine.pipeline().last_dispatch().delivered, 1);

    let zip_data = std::fs::read(Path::new(&output).join("detection_report.zip"))?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data))?;
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).map(|f| f.name().to_string()))
        .collect::<std::result::Result<_, _>>()?;
    assert_eq!(
        names,
        vec!["alerts.csv", "explanations.json", "anomaly_scores.csv", "summary.json"]
    );

    let mut alerts_csv = String::new();
    archive.by_name("alerts.csv")?.read_to_string(&mut alerts_csv)?;
    assert!(alerts_csv.starts_with("entity_id,score,severity,message"));
    assert!(alerts_csv.contains("0xwhale"));
    assert!(!alerts_csv.contains("0xretail"));

    let mut summary = String::new();
    archive.by_name("summary.json")?.read_to_string(&mut summary)?;
    let summary: serde_json::Value = serde_json::from_str(&summary)?;
    assert_eq!(summary["alerts"], 2);
    assert_eq!(summary["anomaly_scores"], 5);

    let sink_lines = std::fs::read_to_string(&jsonl)?;
    assert_eq!(sink_lines.lines().count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_uncompressed_report_and_market_filter() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (trades, resolutions) = write_inputs(temp_dir.path())?;
    let output = normalized(&temp_dir.path().join("plain"));

    let extra = r#"
[features]
markets_of_interest = ["sports"]
"#;
    let mut config = DetectionConfig::from_toml_str(&config_toml(&trades, &resolutions, &output, extra))?;
    config.output.compress = false;

    let pipeline = build_pipeline(&config)?;
    let mut engine = DetectionEngine::new(pipeline, LocalStorage::new(output.clone()), config);
    let output_path = engine.run().await?;
    assert_eq!(output_path, output);

    assert!(engine.pipeline().alerts().is_empty());
    assert_eq!(engine.pipeline().feature_store().len(), 1);

    for file in ["alerts.csv", "explanations.json", "anomaly_scores.csv", "summary.json"] {
        assert!(Path::new(&output).join(file).exists(), "missing {}", file);
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_source_file_fails_the_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = normalized(temp_dir.path());
    let config = DetectionConfig::from_toml_str(&config_toml(
        "/nonexistent/trades.csv",
        "/nonexistent/resolutions.csv",
        &output,
        "",
    ))?;

    let pipeline = build_pipeline(&config)?;
    let mut engine = DetectionEngine::new(pipeline, LocalStorage::new(output), config);
    let err = engine.run().await.unwrap_err();
    assert!(matches!(
        err,
        insider_detection::DetectionError::SourceError { .. }
    ));
    Ok(())
}
