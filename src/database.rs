use crate::models::*;
use crate::retry::{retry_store_read, RetryPolicy};
use crate::store::{BarStore, TimeRange};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use log::error;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};

const FUTURE_BAR_COLUMNS: &str = "symbol_code, \"timestamp\", trade_date, execution_date, index_type, session_id,
        open::DOUBLE PRECISION, high::DOUBLE PRECISION, low::DOUBLE PRECISION, close::DOUBLE PRECISION,
        volume, vwap::DOUBLE PRECISION, number_of_trade, record_no, contract_month";

const OPTION_BAR_COLUMNS: &str = "symbol_code, \"timestamp\", trade_date, execution_date, underlying_code,
        put_call_type::SMALLINT, session_id,
        open::DOUBLE PRECISION, high::DOUBLE PRECISION, low::DOUBLE PRECISION, close::DOUBLE PRECISION,
        volume, vwap::DOUBLE PRECISION, number_of_trade, record_no, contract_month,
        exercise_price::DOUBLE PRECISION, cash_futures_type::SMALLINT";


/// PostgreSQL-backed bar store over the `future_bars_full` and `option_bars_full` tables.
///
/// Timestamps are stored without a zone and read as UTC.
pub struct Database {
    client: Client,
    retry_policy: RetryPolicy,
}

impl Database {
    pub async fn new<S: AsRef<str>>(database_url: S) -> Result<Self> {
        let database_url = database_url.as_ref().to_string();
        let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
            .await
            .with_context(|| format!("failed to connect to PostgreSQL at {}", database_url))?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!("PostgreSQL connection error: {}", err);
            }
        });

        Ok(Self {
            client,
            retry_policy: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Every future bar, optionally restricted to a range, ordered by symbol then time.
    pub async fn all_future_bars(&self, range: Option<&TimeRange>) -> Result<Vec<FutureBar>> {
        let (start, end) = range_bounds(range);
        let sql = format!(
            "SELECT {FUTURE_BAR_COLUMNS}
             FROM future_bars_full
             WHERE {}
             ORDER BY symbol_code, \"timestamp\"",
            range_filter(1)
        );
        let params: [&(dyn ToSql + Sync); 2] = [&start, &end];
        let rows = retry_store_read(self.retry_policy, "future bar export", || {
            self.client.query(sql.as_str(), &params)
        })
        .await?;
        rows.iter().map(future_bar_from_row).collect()
    }

    /// Every option bar, optionally restricted to a range, ordered by symbol then time.
    pub async fn all_option_bars(&self, range: Option<&TimeRange>) -> Result<Vec<OptionBar>> {
        let (start, end) = range_bounds(range);
        let sql = format!(
            "SELECT {OPTION_BAR_COLUMNS}
             FROM option_bars_full
             WHERE {}
             ORDER BY symbol_code, \"timestamp\"",
            range_filter(1)
        );
        let params: [&(dyn ToSql + Sync); 2] = [&start, &end];
        let rows = retry_store_read(self.retry_policy, "option bar export", || {
            self.client.query(sql.as_str(), &params)
        })
        .await?;
        rows.iter().map(option_bar_from_row).collect()
    }
}

impl BarStore for Database {
    async fn option_volume_totals(&self, range: &TimeRange) -> Result<Vec<SymbolVolume>> {
        let start = range.start.naive_utc();
        let end = range.end.naive_utc();
        let params: [&(dyn ToSql + Sync); 2] = [&start, &end];
        let rows = retry_store_read(self.retry_policy, "option volume totals", || {
            self.client.query(
                "SELECT symbol_code, SUM(volume)::BIGINT AS total_volume
                 FROM option_bars_full
                 WHERE \"timestamp\" >= $1 AND \"timestamp\" <= $2
                 GROUP BY symbol_code",
                &params,
            )
        })
        .await?;
        Ok(rows.iter().map(symbol_volume_from_row).collect())
    }

    async fn option_contract_month(&self, option_symbol: &str) -> Result<Option<i32>> {
        let context = format!("contract month lookup for {}", option_symbol);
        let params: [&(dyn ToSql + Sync); 1] = [&option_symbol];
        let row = retry_store_read(self.retry_policy, &context, || {
            self.client.query_opt(
                "SELECT contract_month
                 FROM option_bars_full
                 WHERE symbol_code = $1
                 ORDER BY \"timestamp\"
                 LIMIT 1",
                &params,
            )
        })
        .await?;
        Ok(row.map(|row| row.get::<_, i32>(0)))
    }

    async fn future_volume_totals(&self, contract_month: i32) -> Result<Vec<SymbolVolume>> {
        let context = format!("future volume totals for contract month {}", contract_month);
        let params: [&(dyn ToSql + Sync); 1] = [&contract_month];
        let rows = retry_store_read(self.retry_policy, &context, || {
            self.client.query(
                "SELECT symbol_code, SUM(volume)::BIGINT AS total_volume
                 FROM future_bars_full
                 WHERE contract_month = $1
                 GROUP BY symbol_code",
                &params,
            )
        })
        .await?;
        Ok(rows.iter().map(symbol_volume_from_row).collect())
    }

    async fn future_bars(
        &self,
        symbol: &str,
        range: Option<&TimeRange>,
    ) -> Result<Vec<FutureBar>> {
        let (start, end) = range_bounds(range);
        let sql = format!(
            "SELECT {FUTURE_BAR_COLUMNS}
             FROM future_bars_full
             WHERE symbol_code = $1 AND {}
             ORDER BY \"timestamp\"",
            range_filter(2)
        );
        let context = format!("future bars for {}", symbol);
        let params: [&(dyn ToSql + Sync); 3] = [&symbol, &start, &end];
        let rows = retry_store_read(self.retry_policy, &context, || {
            self.client.query(sql.as_str(), &params)
        })
        .await?;
        rows.iter().map(future_bar_from_row).collect()
    }

    async fn option_bars(
        &self,
        symbol: &str,
        range: Option<&TimeRange>,
    ) -> Result<Vec<OptionBar>> {
        let (start, end) = range_bounds(range);
        let sql = format!(
            "SELECT {OPTION_BAR_COLUMNS}
             FROM option_bars_full
             WHERE symbol_code = $1 AND {}
             ORDER BY \"timestamp\"",
            range_filter(2)
        );
        let context = format!("option bars for {}", symbol);
        let params: [&(dyn ToSql + Sync); 3] = [&symbol, &start, &end];
        let rows = retry_store_read(self.retry_policy, &context, || {
            self.client.query(sql.as_str(), &params)
        })
        .await?;
        rows.iter().map(option_bar_from_row).collect()
    }
}

fn range_bounds(range: Option<&TimeRange>) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    match range {
        Some(range) => (Some(range.start.naive_utc()), Some(range.end.naive_utc())),
        None => (None, None),
    }
}

/// Optional inclusive bounds on "timestamp" bound to `$first` and `$first + 1`; a NULL
/// parameter disables that bound.
fn range_filter(first: usize) -> String {
    let second = first + 1;
    format!(
        "(${first}::TIMESTAMP IS NULL OR \"timestamp\" >= ${first})
         AND (${second}::TIMESTAMP IS NULL OR \"timestamp\" <= ${second})"
    )
}

// Fixed-width CHAR columns come back space padded.
fn trimmed(row: &Row, idx: usize) -> String {
    row.get::<_, String>(idx).trim_end().to_string()
}

fn symbol_volume_from_row(row: &Row) -> SymbolVolume {
    SymbolVolume {
        symbol_code: trimmed(row, 0),
        total_volume: row.get::<_, Option<i64>>(1).unwrap_or(0),
    }
}

fn future_bar_from_row(row: &Row) -> Result<FutureBar> {
    Ok(FutureBar {
        symbol_code: trimmed(row, 0),
        timestamp: row.get::<_, NaiveDateTime>(1).and_utc(),
        trade_date: row.get::<_, NaiveDate>(2),
        execution_date: row.get::<_, Option<NaiveDate>>(3),
        index_type: trimmed(row, 4),
        session_id: row.get(5),
        open: row.get(6),
        high: row.get(7),
        low: row.get(8),
        close: row.get(9),
        volume: row.get(10),
        vwap: row.get(11),
        trade_count: row.get(12),
        record_no: row.get(13),
        contract_month: row.get(14),
    })
}

fn option_bar_from_row(row: &Row) -> Result<OptionBar> {
    let symbol_code = trimmed(row, 0);
    let put_call_type = PutCallType::from_code(row.get(5))
        .with_context(|| format!("invalid put/call type on {}", symbol_code))?;
    let cash_futures_type = CashFuturesType::from_code(row.get(17))
        .with_context(|| format!("invalid cash/futures type on {}", symbol_code))?;

    Ok(OptionBar {
        timestamp: row.get::<_, NaiveDateTime>(1).and_utc(),
        trade_date: row.get::<_, NaiveDate>(2),
        execution_date: row.get::<_, Option<NaiveDate>>(3),
        underlying_code: trimmed(row, 4),
        put_call_type,
        session_id: row.get(6),
        open: row.get(7),
        high: row.get(8),
        low: row.get(9),
        close: row.get(10),
        volume: row.get(11),
        vwap: row.get(12),
        trade_count: row.get(13),
        record_no: row.get(14),
        contract_month: row.get(15),
        exercise_price: row.get(16),
        cash_futures_type,
        symbol_code,
    })
}
