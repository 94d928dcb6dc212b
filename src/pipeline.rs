use crate::aggregator::{DatasetAggregator, DatasetBuild};
use crate::config::PipelineSettings;
use crate::error::PipelineResult;
use crate::features::FeatureEngine;
use crate::join::SeriesJoiner;
use crate::pairing::PairFinder;
use crate::ranker::SymbolRanker;
use crate::store::BarStore;
use crate::windows::WindowBuilder;
use chrono::{DateTime, Utc};
use log::info;

/// Ranks active options, builds the universal dataset from them and places it on the
/// configured device.
pub async fn build_universal_dataset<S: BarStore>(
    store: &S,
    settings: &PipelineSettings,
    now: DateTime<Utc>,
    show_progress: bool,
) -> PipelineResult<DatasetBuild> {
    let range = settings.ranking_range(now);
    info!("Ranking option symbols for {}", range);
    let symbols = SymbolRanker::new(store)
        .top_active_options(&range, settings.symbol_limit)
        .await?;
    info!(
        "Found {} active option symbols: {}",
        symbols.len(),
        symbols.join(", ")
    );

    build_dataset_for_symbols(store, settings, &symbols, show_progress).await
}

/// Builds the dataset for an already chosen symbol list.
pub async fn build_dataset_for_symbols<S: BarStore>(
    store: &S,
    settings: &PipelineSettings,
    option_symbols: &[String],
    show_progress: bool,
) -> PipelineResult<DatasetBuild> {
    let window_builder = WindowBuilder::new(settings.lookback, settings.horizon)?;
    let aggregator = DatasetAggregator::new(
        store,
        PairFinder::new(store),
        SeriesJoiner::new(),
        FeatureEngine::new(),
        window_builder,
    )
    .with_progress(show_progress);

    let DatasetBuild { dataset, summary } = aggregator.build(option_symbols).await?;
    Ok(DatasetBuild {
        dataset: dataset.to_device(settings.device),
        summary,
    })
}
