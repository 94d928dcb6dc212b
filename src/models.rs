use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Key and volume accessors shared by future and option minute bars.
pub trait TimeSeriesBar {
    fn symbol_code(&self) -> &str;
    fn timestamp(&self) -> DateTime<Utc>;
    fn volume(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PutCallType {
    Put,
    Call,
}

impl PutCallType {
    pub fn from_code(code: i16) -> Result<Self> {
        match code {
            1 => Ok(PutCallType::Put),
            2 => Ok(PutCallType::Call),
            other => Err(anyhow!("unknown put/call type code {}", other)),
        }
    }

    pub fn code(self) -> i16 {
        match self {
            PutCallType::Put => 1,
            PutCallType::Call => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CashFuturesType {
    Cash,
    Futures,
}

impl CashFuturesType {
    pub fn from_code(code: i16) -> Result<Self> {
        match code {
            1 => Ok(CashFuturesType::Cash),
            2 => Ok(CashFuturesType::Futures),
            other => Err(anyhow!("unknown cash/futures type code {}", other)),
        }
    }

    pub fn code(self) -> i16 {
        match self {
            CashFuturesType::Cash => 1,
            CashFuturesType::Futures => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FutureBar {
    pub symbol_code: String,
    pub timestamp: DateTime<Utc>,
    pub trade_date: NaiveDate,
    pub execution_date: Option<NaiveDate>,
    pub index_type: String,
    pub session_id: i32,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub vwap: f64,
    pub trade_count: i32,
    pub record_no: i64,
    pub contract_month: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionBar {
    pub symbol_code: String,
    pub timestamp: DateTime<Utc>,
    pub trade_date: NaiveDate,
    pub execution_date: Option<NaiveDate>,
    pub underlying_code: String,
    pub put_call_type: PutCallType,
    pub session_id: i32,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub vwap: f64,
    pub trade_count: i32,
    pub record_no: i64,
    pub contract_month: i32,
    pub exercise_price: f64,
    pub cash_futures_type: CashFuturesType,
}

impl TimeSeriesBar for FutureBar {
    fn symbol_code(&self) -> &str {
        &self.symbol_code
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn volume(&self) -> i64 {
        self.volume
    }
}

impl TimeSeriesBar for OptionBar {
    fn symbol_code(&self) -> &str {
        &self.symbol_code
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn volume(&self) -> i64 {
        self.volume
    }
}

/// A future bar and an option bar stamped with the same instant.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub future: FutureBar,
    pub option: OptionBar,
}

impl AlignedRow {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.future.timestamp
    }
}

/// Per-symbol traded volume aggregated by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolVolume {
    pub symbol_code: String,
    pub total_volume: i64,
}

impl SymbolVolume {
    pub fn new(symbol_code: impl Into<String>, total_volume: i64) -> Self {
        Self {
            symbol_code: symbol_code.into(),
            total_volume,
        }
    }
}
