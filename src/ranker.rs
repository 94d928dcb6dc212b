use crate::error::{PipelineError, PipelineResult};
use crate::models::SymbolVolume;
use crate::store::{BarStore, TimeRange};
use log::{debug, info};

/// Sorts by descending total volume; equal totals fall back to ascending symbol code.
pub(crate) fn rank_by_volume(totals: &mut [SymbolVolume]) {
    totals.sort_by(|a, b| {
        b.total_volume
            .cmp(&a.total_volume)
            .then_with(|| a.symbol_code.cmp(&b.symbol_code))
    });
}

/// Picks the most actively traded option symbols in a time range.
pub struct SymbolRanker<'a, S> {
    store: &'a S,
}

impl<'a, S: BarStore> SymbolRanker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Up to `limit` option symbols with bars in `range`, most traded first.
    pub async fn top_active_options(
        &self,
        range: &TimeRange,
        limit: usize,
    ) -> PipelineResult<Vec<String>> {
        if limit == 0 {
            return Err(PipelineError::invalid_config(
                "symbol limit must be at least 1",
            ));
        }

        let mut totals = self.store.option_volume_totals(range).await?;
        if totals.is_empty() {
            return Err(PipelineError::NoData {
                start: range.start,
                end: range.end,
            });
        }

        rank_by_volume(&mut totals);
        totals.truncate(limit);
        for entry in &totals {
            debug!("{} traded {} contracts", entry.symbol_code, entry.total_volume);
        }
        info!(
            "Selected {} active option symbol{} for {}",
            totals.len(),
            if totals.len() == 1 { "" } else { "s" },
            range
        );

        Ok(totals.into_iter().map(|entry| entry.symbol_code).collect())
    }
}
