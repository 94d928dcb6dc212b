use crate::error::{PipelineError, PipelineResult};
use crate::features::{FeatureVector, FEATURE_WIDTH};
use crate::models::AlignedRow;

pub const DEFAULT_LOOKBACK: usize = 30;
pub const DEFAULT_HORIZON: usize = 5;

pub const LABEL_DOWN: f32 = 0.0;
pub const LABEL_UP: f32 = 1.0;

/// Windows cut from one symbol pair, flattened row-major.
///
/// `features` holds `len() * lookback * FEATURE_WIDTH` values and `labels` holds one value
/// per window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowBatch {
    pub lookback: usize,
    pub features: Vec<f32>,
    pub labels: Vec<f32>,
}

impl WindowBatch {
    pub fn empty(lookback: usize) -> Self {
        Self {
            lookback,
            features: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Slices lookback windows and assigns forward-horizon direction labels.
#[derive(Debug, Clone, Copy)]
pub struct WindowBuilder {
    lookback: usize,
    horizon: usize,
}

impl Default for WindowBuilder {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
            horizon: DEFAULT_HORIZON,
        }
    }
}

impl WindowBuilder {
    pub fn new(lookback: usize, horizon: usize) -> PipelineResult<Self> {
        if lookback == 0 {
            return Err(PipelineError::invalid_config("lookback must be at least 1"));
        }
        Ok(Self { lookback, horizon })
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Aligned rows a symbol needs before it can yield a single window.
    pub fn min_aligned_rows(&self) -> usize {
        self.lookback + self.horizon + 1
    }

    /// Builds every window over `features`, labelling from the option closes in `rows`.
    ///
    /// `features[i]` must describe `rows[i] -> rows[i + 1]`. For each `i` in
    /// `lookback..features.len() - horizon` the window is `features[i - lookback..i]` and the
    /// label is up when `rows[i + 1 + horizon]` closes strictly above `rows[i + 1]`.
    /// Windows whose label row is missing from `rows` are not built.
    pub fn build(&self, features: &[FeatureVector], rows: &[AlignedRow]) -> WindowBatch {
        let end = features
            .len()
            .min(rows.len().saturating_sub(1))
            .saturating_sub(self.horizon);
        if end <= self.lookback {
            return WindowBatch::empty(self.lookback);
        }

        let count = end - self.lookback;
        let mut batch = WindowBatch {
            lookback: self.lookback,
            features: Vec::with_capacity(count * self.lookback * FEATURE_WIDTH),
            labels: Vec::with_capacity(count),
        };

        for i in self.lookback..end {
            for vector in &features[i - self.lookback..i] {
                batch.features.extend_from_slice(vector);
            }

            let current_price = rows[i + 1].option.close as f32;
            let future_price = rows[i + 1 + self.horizon].option.close as f32;
            batch.labels.push(if future_price > current_price {
                LABEL_UP
            } else {
                LABEL_DOWN
            });
        }

        batch
    }
}
