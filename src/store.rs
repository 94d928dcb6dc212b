//! Read capability over the minute-bar store. [`crate::database::Database`] serves it from
//! PostgreSQL and [`crate::memory_store::MemoryBarStore`] from memory or a bar snapshot file.

use crate::models::{FutureBar, OptionBar, SymbolVolume};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days` days leading up to and including `end`.
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Ordered-bar reader used by every pipeline stage.
///
/// Bar reads return bars sorted ascending by timestamp with at most one bar per
/// timestamp. Volume totals come back in no particular order; ranking is the caller's job.
#[allow(async_fn_in_trait)]
pub trait BarStore {
    /// Summed option volume per symbol over bars inside `range`.
    async fn option_volume_totals(&self, range: &TimeRange) -> Result<Vec<SymbolVolume>>;

    /// Contract month recorded on the option's earliest bar, if it has any.
    async fn option_contract_month(&self, option_symbol: &str) -> Result<Option<i32>>;

    /// Summed future volume per symbol over full history for one contract month.
    async fn future_volume_totals(&self, contract_month: i32) -> Result<Vec<SymbolVolume>>;

    async fn future_bars(&self, symbol: &str, range: Option<&TimeRange>)
        -> Result<Vec<FutureBar>>;

    async fn option_bars(&self, symbol: &str, range: Option<&TimeRange>)
        -> Result<Vec<OptionBar>>;
}
