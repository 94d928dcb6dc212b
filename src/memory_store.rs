use crate::models::{FutureBar, OptionBar, SymbolVolume, TimeSeriesBar};
use crate::store::{BarStore, TimeRange};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

const BAR_SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct BarSnapshot {
    version: u32,
    generated_at: DateTime<Utc>,
    future_bars: Vec<FutureBar>,
    option_bars: Vec<OptionBar>,
}

/// In-memory bar store keyed by (symbol, timestamp).
///
/// Used for offline dataset builds from a bar snapshot and as the store behind tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryBarStore {
    futures: Series<FutureBar>,
    options: Series<OptionBar>,
}

impl MemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts a future bar; a bar with the same symbol and timestamp is replaced.
    pub fn insert_future(&mut self, bar: FutureBar) {
        upsert(&mut self.futures, bar);
    }

    /// Upserts an option bar; a bar with the same symbol and timestamp is replaced.
    pub fn insert_option(&mut self, bar: OptionBar) {
        upsert(&mut self.options, bar);
    }

    pub fn extend_futures<I: IntoIterator<Item = FutureBar>>(&mut self, bars: I) {
        for bar in bars {
            self.insert_future(bar);
        }
    }

    pub fn extend_options<I: IntoIterator<Item = OptionBar>>(&mut self, bars: I) {
        for bar in bars {
            self.insert_option(bar);
        }
    }

    pub fn future_bar_count(&self) -> usize {
        self.futures.values().map(BTreeMap::len).sum()
    }

    pub fn option_bar_count(&self) -> usize {
        self.options.values().map(BTreeMap::len).sum()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open bar snapshot at {}", path.display()))?;
        let snapshot: BarSnapshot = bincode::deserialize_from(BufReader::new(file))
            .context("Bar snapshot decode failed")?;

        if snapshot.version != BAR_SNAPSHOT_VERSION {
            return Err(anyhow!(
                "Bar snapshot version mismatch (found {}, expected {})",
                snapshot.version,
                BAR_SNAPSHOT_VERSION
            ));
        }

        let mut store = Self::new();
        store.extend_futures(snapshot.future_bars);
        store.extend_options(snapshot.option_bars);
        info!(
            "Loaded bar snapshot from {} generated at {} ({} future bars, {} option bars)",
            path.display(),
            snapshot.generated_at.format("%Y-%m-%d %H:%M:%S"),
            store.future_bar_count(),
            store.option_bar_count()
        );
        Ok(store)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create snapshot directory {}", parent.display())
                })?;
            }
        }

        let file = File::create(path)
            .with_context(|| format!("Unable to create bar snapshot at {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        let snapshot = BarSnapshot {
            version: BAR_SNAPSHOT_VERSION,
            generated_at: Utc::now(),
            future_bars: self
                .futures
                .values()
                .flat_map(|bars| bars.values().cloned())
                .collect(),
            option_bars: self
                .options
                .values()
                .flat_map(|bars| bars.values().cloned())
                .collect(),
        };
        bincode::serialize_into(&mut writer, &snapshot).context("Bar snapshot encode failed")?;
        writer.flush()?;
        Ok(())
    }
}

type Series<B> = BTreeMap<String, BTreeMap<DateTime<Utc>, B>>;

fn upsert<B: TimeSeriesBar>(series: &mut Series<B>, bar: B) {
    series
        .entry(bar.symbol_code().to_string())
        .or_default()
        .insert(bar.timestamp(), bar);
}

/// Summed volume per symbol over the bars `keep` accepts; symbols with no accepted bar are
/// left out.
fn volume_totals<B, P>(series: &Series<B>, keep: P) -> Vec<SymbolVolume>
where
    B: TimeSeriesBar,
    P: Fn(&B) -> bool,
{
    series
        .iter()
        .filter_map(|(symbol, bars)| {
            let mut kept = bars.values().filter(|bar| keep(bar)).peekable();
            kept.peek()?;
            Some(SymbolVolume::new(
                symbol.clone(),
                kept.map(TimeSeriesBar::volume).sum(),
            ))
        })
        .collect()
}

fn bars_in_range<B: TimeSeriesBar + Clone>(
    series: Option<&BTreeMap<DateTime<Utc>, B>>,
    range: Option<&TimeRange>,
) -> Vec<B> {
    let Some(series) = series else {
        return Vec::new();
    };
    match range {
        Some(range) if range.start > range.end => Vec::new(),
        Some(range) => series
            .range(range.start..=range.end)
            .map(|(_, bar)| bar.clone())
            .collect(),
        None => series.values().cloned().collect(),
    }
}

impl BarStore for MemoryBarStore {
    async fn option_volume_totals(&self, range: &TimeRange) -> Result<Vec<SymbolVolume>> {
        Ok(volume_totals(&self.options, |bar| {
            range.contains(bar.timestamp())
        }))
    }

    async fn option_contract_month(&self, option_symbol: &str) -> Result<Option<i32>> {
        Ok(self
            .options
            .get(option_symbol)
            .and_then(|series| series.values().next())
            .map(|bar| bar.contract_month))
    }

    async fn future_volume_totals(&self, contract_month: i32) -> Result<Vec<SymbolVolume>> {
        Ok(volume_totals(&self.futures, |bar| {
            bar.contract_month == contract_month
        }))
    }

    async fn future_bars(
        &self,
        symbol: &str,
        range: Option<&TimeRange>,
    ) -> Result<Vec<FutureBar>> {
        Ok(bars_in_range(self.futures.get(symbol), range))
    }

    async fn option_bars(
        &self,
        symbol: &str,
        range: Option<&TimeRange>,
    ) -> Result<Vec<OptionBar>> {
        Ok(bars_in_range(self.options.get(symbol), range))
    }
}
