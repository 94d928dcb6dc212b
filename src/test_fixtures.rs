use crate::models::{AlignedRow, CashFuturesType, FutureBar, OptionBar, PutCallType};
use chrono::{DateTime, Duration, TimeZone, Utc};

pub fn minute(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap() + Duration::minutes(offset)
}

pub fn future_bar(
    symbol: &str,
    timestamp: DateTime<Utc>,
    close: f64,
    volume: i64,
    contract_month: i32,
) -> FutureBar {
    FutureBar {
        symbol_code: symbol.to_string(),
        timestamp,
        trade_date: timestamp.date_naive(),
        execution_date: Some(timestamp.date_naive()),
        index_type: "NK2".to_string(),
        session_id: 999,
        open: close,
        high: close,
        low: close,
        close,
        volume,
        vwap: close,
        trade_count: 1,
        record_no: 0,
        contract_month,
    }
}

pub fn option_bar(
    symbol: &str,
    timestamp: DateTime<Utc>,
    close: f64,
    volume: i64,
    contract_month: i32,
) -> OptionBar {
    OptionBar {
        symbol_code: symbol.to_string(),
        timestamp,
        trade_date: timestamp.date_naive(),
        execution_date: Some(timestamp.date_naive()),
        underlying_code: "NK22".to_string(),
        put_call_type: PutCallType::Call,
        session_id: 999,
        open: close,
        high: close,
        low: close,
        close,
        volume,
        vwap: close,
        trade_count: 1,
        record_no: 0,
        contract_month,
        exercise_price: 38_000.0,
        cash_futures_type: CashFuturesType::Futures,
    }
}

/// Aligned rows at consecutive minutes built from (future close, future volume,
/// option close, option volume) tuples.
pub fn aligned_rows(values: &[(f64, i64, f64, i64)]) -> Vec<AlignedRow> {
    values
        .iter()
        .enumerate()
        .map(|(idx, &(future_close, future_volume, option_close, option_volume))| {
            let timestamp = minute(idx as i64);
            AlignedRow {
                future: future_bar("FUT000001", timestamp, future_close, future_volume, 202501),
                option: option_bar("OPT000001", timestamp, option_close, option_volume, 202501),
            }
        })
        .collect()
}

/// Aligned rows whose option close rises by `step` every minute.
pub fn rising_rows(count: usize, step: f64) -> Vec<AlignedRow> {
    let values: Vec<(f64, i64, f64, i64)> = (0..count)
        .map(|idx| {
            let t = idx as f64;
            (38_000.0 + t * 10.0, 1_000 + idx as i64, 100.0 + t * step, 50 + idx as i64)
        })
        .collect();
    aligned_rows(&values)
}
