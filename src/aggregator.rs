use crate::dataset::Dataset;
use crate::error::{PipelineError, PipelineResult};
use crate::features::FeatureEngine;
use crate::join::SeriesJoiner;
use crate::pairing::PairFinder;
use crate::store::BarStore;
use crate::windows::{WindowBatch, WindowBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::Serialize;

/// What one option symbol added to the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum SymbolOutcome {
    Contributed {
        future_symbol: String,
        aligned_rows: usize,
        windows: usize,
    },
    /// Paired and joined, but too few aligned rows for a single window.
    Insufficient {
        future_symbol: String,
        aligned_rows: usize,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolReport {
    pub option_symbol: String,
    pub outcome: SymbolOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSummary {
    pub attempted: usize,
    pub contributed: usize,
    pub windows: usize,
    pub symbols: Vec<SymbolReport>,
}

impl BuildSummary {
    pub fn skipped(&self) -> usize {
        self.symbols
            .iter()
            .filter(|report| matches!(report.outcome, SymbolOutcome::Skipped { .. }))
            .count()
    }
}

#[derive(Debug)]
pub struct DatasetBuild {
    pub dataset: Dataset,
    pub summary: BuildSummary,
}

struct PairedSeries {
    future_symbol: String,
    aligned_rows: usize,
    batch: WindowBatch,
}

/// Builds the universal dataset one option symbol at a time.
///
/// A symbol that cannot be paired, read, or featurized is reported and skipped; the others
/// still contribute, in input order.
pub struct DatasetAggregator<'a, S> {
    store: &'a S,
    pair_finder: PairFinder<'a, S>,
    joiner: SeriesJoiner,
    feature_engine: FeatureEngine,
    window_builder: WindowBuilder,
    show_progress: bool,
}

impl<'a, S: BarStore> DatasetAggregator<'a, S> {
    pub fn new(
        store: &'a S,
        pair_finder: PairFinder<'a, S>,
        joiner: SeriesJoiner,
        feature_engine: FeatureEngine,
        window_builder: WindowBuilder,
    ) -> Self {
        Self {
            store,
            pair_finder,
            joiner,
            feature_engine,
            window_builder,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub async fn build(&self, option_symbols: &[String]) -> PipelineResult<DatasetBuild> {
        info!("Loading {} option symbols...", option_symbols.len());
        let progress = self.progress_bar(option_symbols.len());

        let mut summary = BuildSummary {
            attempted: option_symbols.len(),
            ..BuildSummary::default()
        };
        let mut batches = Vec::new();

        for option_symbol in option_symbols {
            let outcome = match self.load_symbol(option_symbol).await {
                Ok(paired) if paired.batch.is_empty() => SymbolOutcome::Insufficient {
                    future_symbol: paired.future_symbol,
                    aligned_rows: paired.aligned_rows,
                },
                Ok(paired) => {
                    let windows = paired.batch.len();
                    summary.contributed += 1;
                    summary.windows += windows;
                    batches.push(paired.batch);
                    SymbolOutcome::Contributed {
                        future_symbol: paired.future_symbol,
                        aligned_rows: paired.aligned_rows,
                        windows,
                    }
                }
                Err(err) if err.is_symbol_local() => {
                    warn!("Skipping {}: {}", option_symbol, err);
                    SymbolOutcome::Skipped {
                        reason: err.to_string(),
                    }
                }
                Err(err) => {
                    progress.abandon();
                    return Err(err);
                }
            };
            summary.symbols.push(SymbolReport {
                option_symbol: option_symbol.clone(),
                outcome,
            });
            progress.inc(1);
        }
        progress.finish_and_clear();

        info!(
            "Loaded {}/{} symbols ({} skipped, {} windows)",
            summary.contributed,
            summary.attempted,
            summary.skipped(),
            summary.windows
        );

        if summary.contributed == 0 {
            return Err(PipelineError::EmptyDataset {
                attempted: summary.attempted,
                summary: Box::new(summary),
            });
        }

        let dataset = Dataset::concat(self.window_builder.lookback(), &batches)?;
        let [windows, lookback, width] = dataset.feature_shape();
        let [label_rows, label_cols] = dataset.label_shape();
        info!(
            "Dataset shape: X=({}, {}, {}), Y=({}, {})",
            windows, lookback, width, label_rows, label_cols
        );

        Ok(DatasetBuild { dataset, summary })
    }

    async fn load_symbol(&self, option_symbol: &str) -> PipelineResult<PairedSeries> {
        let future_symbol = self.pair_finder.matching_future(option_symbol).await?;

        let (future_bars, option_bars) = futures::try_join!(
            self.store.future_bars(&future_symbol, None),
            self.store.option_bars(option_symbol, None)
        )?;

        let rows = self.joiner.join(future_bars, option_bars);
        if rows.len() < self.window_builder.min_aligned_rows() {
            return Ok(PairedSeries {
                future_symbol,
                aligned_rows: rows.len(),
                batch: WindowBatch::empty(self.window_builder.lookback()),
            });
        }

        let features = self.feature_engine.compute(&rows)?;
        let batch = self.window_builder.build(&features, &rows);
        Ok(PairedSeries {
            future_symbol,
            aligned_rows: rows.len(),
            batch,
        })
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            progress.set_style(style.progress_chars("#>-"));
        }
        progress
    }
}
