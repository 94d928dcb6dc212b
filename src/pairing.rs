use crate::error::{PipelineError, PipelineResult};
use crate::ranker::rank_by_volume;
use crate::store::BarStore;
use log::debug;

/// Resolves an option to the most liquid future of the same contract month.
///
/// Future liquidity is measured over each future's full stored history, independent of the
/// range used to rank options.
pub struct PairFinder<'a, S> {
    store: &'a S,
}

impl<'a, S: BarStore> PairFinder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn matching_future(&self, option_symbol: &str) -> PipelineResult<String> {
        let contract_month = self
            .store
            .option_contract_month(option_symbol)
            .await?
            .ok_or_else(|| PipelineError::not_found(format!("option {option_symbol} has no bars")))?;

        let mut candidates = self.store.future_volume_totals(contract_month).await?;
        rank_by_volume(&mut candidates);
        let best = candidates.into_iter().next().ok_or_else(|| {
            PipelineError::not_found(format!(
                "no future with contract month {contract_month} for option {option_symbol}"
            ))
        })?;

        debug!(
            "Paired {} with {} (contract month {}, {} contracts traded)",
            option_symbol, best.symbol_code, contract_month, best.total_volume
        );
        Ok(best.symbol_code)
    }
}
