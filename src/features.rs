use crate::error::{PipelineError, PipelineResult};
use crate::models::AlignedRow;
use chrono::{DateTime, Utc};

/// Number of values in every feature vector.
pub const FEATURE_WIDTH: usize = 4;

/// `[future_log_return, option_log_return, future_volume_delta, option_volume_delta]`
pub type FeatureVector = [f32; FEATURE_WIDTH];

pub const FUTURE_LOG_RETURN: usize = 0;
pub const OPTION_LOG_RETURN: usize = 1;
pub const FUTURE_VOLUME_DELTA: usize = 2;
pub const OPTION_VOLUME_DELTA: usize = 3;

/// Turns consecutive aligned rows into transition features.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureEngine;

impl FeatureEngine {
    pub fn new() -> Self {
        Self
    }

    /// One vector per adjacent pair of rows: `features[i]` describes `rows[i] -> rows[i + 1]`.
    ///
    /// All arithmetic is `f32`. Both volume deltas are zero when the previous future volume is
    /// zero, and both are divided by the previous *future* volume.
    pub fn compute(&self, rows: &[AlignedRow]) -> PipelineResult<Vec<FeatureVector>> {
        rows.windows(2)
            .map(|pair| transition_features(&pair[0], &pair[1]))
            .collect()
    }
}

fn transition_features(prev: &AlignedRow, cur: &AlignedRow) -> PipelineResult<FeatureVector> {
    let future_log_return = log_return(
        "future",
        prev.future.close,
        cur.future.close,
        prev.timestamp(),
        cur.timestamp(),
    )?;
    let option_log_return = log_return(
        "option",
        prev.option.close,
        cur.option.close,
        prev.timestamp(),
        cur.timestamp(),
    )?;

    let (future_volume_delta, option_volume_delta) = if prev.future.volume == 0 {
        (0.0, 0.0)
    } else {
        let denominator = prev.future.volume as f32;
        (
            (cur.future.volume as f32 - prev.future.volume as f32) / denominator,
            (cur.option.volume as f32 - prev.option.volume as f32) / denominator,
        )
    };

    Ok([
        future_log_return,
        option_log_return,
        future_volume_delta,
        option_volume_delta,
    ])
}

fn log_return(
    leg: &'static str,
    prev_close: f64,
    cur_close: f64,
    prev_timestamp: DateTime<Utc>,
    cur_timestamp: DateTime<Utc>,
) -> PipelineResult<f32> {
    let prev = checked_price(leg, prev_close, prev_timestamp)?;
    let cur = checked_price(leg, cur_close, cur_timestamp)?;
    Ok((cur / prev).ln())
}

fn checked_price(leg: &'static str, close: f64, timestamp: DateTime<Utc>) -> PipelineResult<f32> {
    let price = close as f32;
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(PipelineError::NumericDomain {
            leg,
            close,
            timestamp,
        })
    }
}
