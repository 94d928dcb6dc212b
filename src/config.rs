use crate::dataset::Device;
use crate::store::TimeRange;
use crate::windows::{DEFAULT_HORIZON, DEFAULT_LOOKBACK};
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::env;

pub const LOOKBACK_KEY: &str = "DATASET_LOOKBACK";
pub const HORIZON_KEY: &str = "DATASET_HORIZON";
pub const DEVICE_KEY: &str = "DATASET_DEVICE";
pub const DAYS_TO_LOOKBACK_KEY: &str = "TRAINING_DAYS_TO_LOOKBACK";
pub const SYMBOL_LIMIT_KEY: &str = "TRAINING_SYMBOL_LIMIT";

const SETTING_KEYS: [&str; 5] = [
    LOOKBACK_KEY,
    HORIZON_KEY,
    DEVICE_KEY,
    DAYS_TO_LOOKBACK_KEY,
    SYMBOL_LIMIT_KEY,
];

pub const DEFAULT_DAYS_TO_LOOKBACK: u32 = 365;
pub const DEFAULT_SYMBOL_LIMIT: usize = 10;

/// Knobs for one dataset build.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub lookback: usize,
    pub horizon: usize,
    pub days_to_lookback: u32,
    pub symbol_limit: usize,
    pub device: Device,
    /// Explicit ranking range; when unset the range trails `days_to_lookback` days from now.
    pub ranking_range: Option<TimeRange>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
            horizon: DEFAULT_HORIZON,
            days_to_lookback: DEFAULT_DAYS_TO_LOOKBACK,
            symbol_limit: DEFAULT_SYMBOL_LIMIT,
            device: Device::Cpu,
            ranking_range: None,
        }
    }
}

impl PipelineSettings {
    /// Reads settings from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let settings: HashMap<String, String> = SETTING_KEYS
            .iter()
            .filter_map(|key| env::var(key).ok().map(|value| (key.to_string(), value)))
            .collect();
        Self::from_settings_map(&settings)
    }

    pub fn from_settings_map(settings: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();
        let lookback = optional_setting_usize(settings, LOOKBACK_KEY, 1)?.unwrap_or(defaults.lookback);
        let horizon = optional_setting_usize(settings, HORIZON_KEY, 0)?.unwrap_or(defaults.horizon);
        let symbol_limit =
            optional_setting_usize(settings, SYMBOL_LIMIT_KEY, 1)?.unwrap_or(defaults.symbol_limit);
        let days_to_lookback = optional_setting_usize(settings, DAYS_TO_LOOKBACK_KEY, 1)?
            .map(|days| {
                u32::try_from(days).map_err(|_| {
                    anyhow!("Setting {} is too large (value: {})", DAYS_TO_LOOKBACK_KEY, days)
                })
            })
            .transpose()?
            .unwrap_or(defaults.days_to_lookback);
        let device = match optional_setting(settings, DEVICE_KEY) {
            Some(raw) => raw.parse::<Device>()?,
            None => defaults.device,
        };

        Ok(Self {
            lookback,
            horizon,
            days_to_lookback,
            symbol_limit,
            device,
            ranking_range: None,
        })
    }

    pub fn ranking_range(&self, now: DateTime<Utc>) -> TimeRange {
        self.ranking_range
            .unwrap_or_else(|| TimeRange::trailing_days(now, self.days_to_lookback))
    }
}

/// Builds a ranking range from optional calendar dates. The end date is inclusive through
/// its last second; a missing start trails `days` days from the end.
pub fn range_from_dates(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Option<TimeRange>> {
    if start.is_none() && end.is_none() {
        return Ok(None);
    }

    let end_at = match end {
        Some(date) => date
            .and_hms_opt(23, 59, 59)
            .ok_or_else(|| anyhow!("Invalid end date {}", date))?
            .and_utc(),
        None => now,
    };
    let range = match start {
        Some(date) => TimeRange::new(
            date.and_hms_opt(0, 0, 0)
                .ok_or_else(|| anyhow!("Invalid start date {}", date))?
                .and_utc(),
            end_at,
        ),
        None => TimeRange::trailing_days(end_at, days),
    };

    if range.start > range.end {
        return Err(anyhow!(
            "Start {} is after end {}",
            range.start.date_naive(),
            range.end.date_naive()
        ));
    }
    Ok(Some(range))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow!("Date must be in YYYY-MM-DD format (value: {})", raw))
}

fn optional_setting<'a>(settings: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn optional_setting_usize(
    settings: &HashMap<String, String>,
    key: &str,
    min: usize,
) -> Result<Option<usize>> {
    let Some(raw) = optional_setting(settings, key) else {
        return Ok(None);
    };
    let value = raw
        .parse::<usize>()
        .map_err(|_| anyhow!("Setting {} must be a non-negative integer (value: {})", key, raw))?;
    if value < min {
        return Err(anyhow!(
            "Setting {} must be >= {} (value: {})",
            key,
            min,
            raw
        ));
    }
    Ok(Some(value))
}
