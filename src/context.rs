use crate::database::Database;
use crate::memory_store::MemoryBarStore;
use crate::models::{FutureBar, OptionBar, SymbolVolume};
use crate::store::{BarStore, TimeRange};
use anyhow::{anyhow, Result};
use log::info;
use std::path::Path;

#[derive(Clone)]
pub struct AppContext {
    database_url: Option<String>,
}

impl AppContext {
    pub async fn initialize(database_url: Option<String>) -> Result<Self> {
        Ok(Self { database_url })
    }

    pub async fn database(&self) -> Result<Database> {
        let Some(database_url) = self.database_url.as_deref() else {
            return Err(anyhow!(
                "DATABASE_URL must be set to use database-backed pipeline commands."
            ));
        };
        Database::new(database_url).await
    }

    /// Opens the bar snapshot at `data_file` when given, otherwise connects to the database.
    pub async fn bar_source(&self, data_file: Option<&Path>) -> Result<BarSource> {
        match data_file {
            Some(path) => {
                info!("Using bar snapshot from {}", path.display());
                Ok(BarSource::Snapshot(MemoryBarStore::load_from_file(path)?))
            }
            None => Ok(BarSource::Database(self.database().await?)),
        }
    }
}

/// The store a command reads bars from.
pub enum BarSource {
    Database(Database),
    Snapshot(MemoryBarStore),
}

impl BarStore for BarSource {
    async fn option_volume_totals(&self, range: &TimeRange) -> Result<Vec<SymbolVolume>> {
        match self {
            BarSource::Database(db) => db.option_volume_totals(range).await,
            BarSource::Snapshot(store) => store.option_volume_totals(range).await,
        }
    }

    async fn option_contract_month(&self, option_symbol: &str) -> Result<Option<i32>> {
        match self {
            BarSource::Database(db) => db.option_contract_month(option_symbol).await,
            BarSource::Snapshot(store) => store.option_contract_month(option_symbol).await,
        }
    }

    async fn future_volume_totals(&self, contract_month: i32) -> Result<Vec<SymbolVolume>> {
        match self {
            BarSource::Database(db) => db.future_volume_totals(contract_month).await,
            BarSource::Snapshot(store) => store.future_volume_totals(contract_month).await,
        }
    }

    async fn future_bars(
        &self,
        symbol: &str,
        range: Option<&TimeRange>,
    ) -> Result<Vec<FutureBar>> {
        match self {
            BarSource::Database(db) => db.future_bars(symbol, range).await,
            BarSource::Snapshot(store) => store.future_bars(symbol, range).await,
        }
    }

    async fn option_bars(
        &self,
        symbol: &str,
        range: Option<&TimeRange>,
    ) -> Result<Vec<OptionBar>> {
        match self {
            BarSource::Database(db) => db.option_bars(symbol, range).await,
            BarSource::Snapshot(store) => store.option_bars(symbol, range).await,
        }
    }
}
