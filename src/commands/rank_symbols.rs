use crate::config::PipelineSettings;
use crate::context::AppContext;
use crate::ranker::SymbolRanker;
use anyhow::Result;
use chrono::Utc;
use log::info;
use std::path::Path;

pub async fn run(
    app: &AppContext,
    data_file: Option<&Path>,
    settings: &PipelineSettings,
) -> Result<()> {
    let range = settings.ranking_range(Utc::now());
    info!(
        "Ranking up to {} option symbols by volume for {}",
        settings.symbol_limit, range
    );

    let source = app.bar_source(data_file).await?;
    let symbols = SymbolRanker::new(&source)
        .top_active_options(&range, settings.symbol_limit)
        .await?;

    for (rank, symbol) in symbols.iter().enumerate() {
        println!("{:>3}. {}", rank + 1, symbol);
    }
    Ok(())
}
