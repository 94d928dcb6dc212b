use crate::aggregator::BuildSummary;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The option has no stored bar, or no future shares its contract month.
    #[error("not found: {0}")]
    NotFound(String),

    /// The ranking range contains no option symbols at all.
    #[error("no option bars between {start} and {end}")]
    NoData {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A close price that cannot feed a log return.
    #[error("{leg} close {close} at {timestamp} is not a positive finite price")]
    NumericDomain {
        leg: &'static str,
        close: f64,
        timestamp: DateTime<Utc>,
    },

    /// Every symbol failed or produced too few aligned rows.
    #[error("no symbol contributed training windows ({attempted} attempted)")]
    EmptyDataset {
        attempted: usize,
        summary: Box<BuildSummary>,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("store read failed: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        PipelineError::NotFound(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        PipelineError::InvalidConfig(msg.into())
    }

    /// Errors that only disqualify the symbol being processed.
    pub fn is_symbol_local(&self) -> bool {
        matches!(
            self,
            PipelineError::NotFound(_)
                | PipelineError::NumericDomain { .. }
                | PipelineError::Store(_)
        )
    }
}
