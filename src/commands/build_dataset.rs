use crate::aggregator::{BuildSummary, DatasetBuild};
use crate::config::PipelineSettings;
use crate::context::AppContext;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::build_universal_dataset;
use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildReport<'a> {
    succeeded: bool,
    output: Option<String>,
    device: String,
    lookback: usize,
    windows: usize,
    positive_labels: usize,
    summary: &'a BuildSummary,
}

pub async fn run(
    app: &AppContext,
    data_file: Option<&Path>,
    output_path: &Path,
    settings: &PipelineSettings,
) -> Result<()> {
    info!(
        "Building dataset (lookback={}, horizon={}, symbols<={}, device={})",
        settings.lookback, settings.horizon, settings.symbol_limit, settings.device
    );

    let source = app.bar_source(data_file).await?;
    let result = build_universal_dataset(&source, settings, Utc::now(), true).await;
    if let Err(PipelineError::EmptyDataset { summary, .. }) = &result {
        println!("{}", report_line(&result, None, settings)?);
        info!(
            "No dataset written; {} of {} symbols skipped",
            summary.skipped(),
            summary.attempted
        );
    }
    let build = result.context("Dataset build failed")?;

    build.dataset.save_to_file(output_path)?;
    info!(
        "Dataset with {} windows written to {}",
        build.dataset.len(),
        output_path.display()
    );
    println!("{}", report_line(&Ok(build), Some(output_path), settings)?);

    Ok(())
}

/// One JSON line describing the build outcome. Failed builds that still produced per-symbol
/// outcomes report them with zero windows.
fn report_line(
    result: &PipelineResult<DatasetBuild>,
    output_path: Option<&Path>,
    settings: &PipelineSettings,
) -> Result<String> {
    let empty_summary = BuildSummary::default();
    let report = match result {
        Ok(build) => BuildReport {
            succeeded: true,
            output: output_path.map(|path| path.display().to_string()),
            device: build.dataset.device().to_string(),
            lookback: build.dataset.lookback(),
            windows: build.dataset.len(),
            positive_labels: build.dataset.positive_count(),
            summary: &build.summary,
        },
        Err(err) => BuildReport {
            succeeded: false,
            output: None,
            device: settings.device.to_string(),
            lookback: settings.lookback,
            windows: 0,
            positive_labels: 0,
            summary: match err {
                PipelineError::EmptyDataset { summary, .. } => &**summary,
                _ => &empty_summary,
            },
        },
    };
    Ok(serde_json::to_string(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{SymbolOutcome, SymbolReport};
    use crate::dataset::Dataset;
    use crate::windows::WindowBatch;
    use serde_json::Value;

    fn summary() -> BuildSummary {
        BuildSummary {
            attempted: 2,
            contributed: 0,
            windows: 0,
            symbols: vec![
                SymbolReport {
                    option_symbol: "OPT000001".to_string(),
                    outcome: SymbolOutcome::Insufficient {
                        future_symbol: "FUT000001".to_string(),
                        aligned_rows: 12,
                    },
                },
                SymbolReport {
                    option_symbol: "OPT000002".to_string(),
                    outcome: SymbolOutcome::Skipped {
                        reason: "not found: option OPT000002 has no bars".to_string(),
                    },
                },
            ],
        }
    }

    #[test]
    fn empty_dataset_report_keeps_symbol_outcomes() {
        let result: PipelineResult<DatasetBuild> = Err(PipelineError::EmptyDataset {
            attempted: 2,
            summary: Box::new(summary()),
        });
        let line = report_line(&result, None, &PipelineSettings::default()).unwrap();
        let json: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(json["succeeded"], Value::Bool(false));
        assert_eq!(json["windows"], 0);
        assert_eq!(json["summary"]["attempted"], 2);
        assert_eq!(json["summary"]["contributed"], 0);
        assert_eq!(json["summary"]["symbols"][0]["outcome"]["status"], "insufficient");
        assert_eq!(json["summary"]["symbols"][1]["outcome"]["status"], "skipped");
        assert_eq!(json["summary"]["symbols"][1]["optionSymbol"], "OPT000002");
    }

    #[test]
    fn successful_report_describes_the_dataset() {
        let batch = WindowBatch {
            lookback: 2,
            features: vec![0.0; 2 * 2 * 4],
            labels: vec![1.0, 0.0],
        };
        let build = DatasetBuild {
            dataset: Dataset::concat(2, [&batch]).unwrap(),
            summary: BuildSummary {
                attempted: 1,
                contributed: 1,
                windows: 2,
                symbols: Vec::new(),
            },
        };
        let line = report_line(
            &Ok(build),
            Some(Path::new("out/dataset.bin")),
            &PipelineSettings::default(),
        )
        .unwrap();
        let json: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(json["succeeded"], Value::Bool(true));
        assert_eq!(json["output"], "out/dataset.bin");
        assert_eq!(json["windows"], 2);
        assert_eq!(json["positiveLabels"], 1);
        assert_eq!(json["device"], "cpu");
    }
}
