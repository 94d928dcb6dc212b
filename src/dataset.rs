//! The concatenated multi-symbol training set handed to the learner.

use crate::error::{PipelineError, PipelineResult};
use crate::features::FEATURE_WIDTH;
use crate::windows::{WindowBatch, LABEL_UP};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

const DATASET_FILE_VERSION: u32 = 1;

/// Where the dataset buffers are meant to live when the learner picks them up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(u32),
}

impl FromStr for Device {
    type Err = PipelineError;

    fn from_str(raw: &str) -> PipelineResult<Self> {
        let value = raw.trim().to_ascii_lowercase();
        match value.as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse::<u32>().ok())
                .map(Device::Cuda)
                .ok_or_else(|| {
                    PipelineError::invalid_config(format!(
                        "device must be cpu, cuda or cuda:N (value: {})",
                        raw
                    ))
                }),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{}", ordinal),
        }
    }
}

/// Features of shape `(windows, lookback, 4)` and labels of shape `(windows, 1)`,
/// both stored flat in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    lookback: usize,
    features: Vec<f32>,
    labels: Vec<f32>,
    device: Device,
}

#[derive(Serialize, Deserialize)]
struct DatasetFile {
    version: u32,
    generated_at: DateTime<Utc>,
    dataset: Dataset,
}

impl Dataset {
    /// Concatenates per-symbol batches in the order given.
    pub fn concat<'a, I>(lookback: usize, batches: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = &'a WindowBatch>,
    {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for batch in batches {
            if batch.lookback != lookback {
                return Err(PipelineError::invalid_config(format!(
                    "cannot concatenate windows of length {} into a dataset of length {}",
                    batch.lookback, lookback
                )));
            }
            features.extend_from_slice(&batch.features);
            labels.extend_from_slice(&batch.labels);
        }

        Ok(Self {
            lookback,
            features,
            labels,
            device: Device::Cpu,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn feature_shape(&self) -> [usize; 3] {
        [self.len(), self.lookback, FEATURE_WIDTH]
    }

    pub fn label_shape(&self) -> [usize; 2] {
        [self.len(), 1]
    }

    pub fn features(&self) -> &[f32] {
        &self.features
    }

    pub fn labels(&self) -> &[f32] {
        &self.labels
    }

    /// One window as the `(1, lookback, 4)` input a signal consumer feeds to the model.
    pub fn window(&self, index: usize) -> Option<&[f32]> {
        let stride = self.lookback * FEATURE_WIDTH;
        let start = index.checked_mul(stride)?;
        let end = start.checked_add(stride)?;
        self.features.get(start..end)
    }

    pub fn positive_count(&self) -> usize {
        self.labels.iter().filter(|&&label| label == LABEL_UP).count()
    }

    /// Retargets the buffers to `device`. Values and ordering are untouched.
    pub fn to_device(mut self, device: Device) -> Self {
        if self.device != device {
            info!(
                "Placing dataset ({} windows) on {} (was {})",
                self.len(),
                device,
                self.device
            );
            self.device = device;
        }
        self
    }

    /// Writes the dataset next to `path` first and renames it into place.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create dataset directory {}", parent.display())
                })?;
            }
        }

        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow!("Dataset path {} has no file name", path.display()))?;
        let staging_path = path.with_file_name(format!(
            ".{}.{}.tmp",
            file_name.to_string_lossy(),
            Uuid::new_v4()
        ));

        let write_result = (|| -> Result<()> {
            let file = File::create(&staging_path).with_context(|| {
                format!("Unable to create dataset file {}", staging_path.display())
            })?;
            let mut writer = BufWriter::new(file);
            let payload = DatasetFile {
                version: DATASET_FILE_VERSION,
                generated_at: Utc::now(),
                dataset: self.clone(),
            };
            bincode::serialize_into(&mut writer, &payload).context("Dataset encode failed")?;
            writer.flush()?;
            Ok(())
        })();

        if let Err(err) = write_result {
            let _ = fs::remove_file(&staging_path);
            return Err(err);
        }

        fs::rename(&staging_path, path).with_context(|| {
            format!(
                "Failed to move dataset from {} to {}",
                staging_path.display(),
                path.display()
            )
        })?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open dataset file {}", path.display()))?;
        let payload: DatasetFile =
            bincode::deserialize_from(BufReader::new(file)).context("Dataset decode failed")?;
        if payload.version != DATASET_FILE_VERSION {
            return Err(anyhow!(
                "Dataset file version mismatch (found {}, expected {})",
                payload.version,
                DATASET_FILE_VERSION
            ));
        }

        let dataset = payload.dataset;
        let expected = dataset.len() * dataset.lookback * FEATURE_WIDTH;
        if dataset.features.len() != expected {
            return Err(anyhow!(
                "Dataset file {} holds {} feature values, expected {}",
                path.display(),
                dataset.features.len(),
                expected
            ));
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(lookback: usize, windows: usize, seed: f32) -> WindowBatch {
        WindowBatch {
            lookback,
            features: (0..windows * lookback * FEATURE_WIDTH)
                .map(|idx| seed + idx as f32)
                .collect(),
            labels: (0..windows).map(|idx| (idx % 2) as f32).collect(),
        }
    }

    #[test]
    fn concat_preserves_batch_order_and_shapes() {
        let first = batch(3, 2, 0.0);
        let second = batch(3, 1, 1_000.0);
        let dataset = Dataset::concat(3, [&first, &second]).unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.feature_shape(), [3, 3, FEATURE_WIDTH]);
        assert_eq!(dataset.label_shape(), [3, 1]);
        assert_eq!(dataset.window(2).unwrap(), second.features.as_slice());
        assert_eq!(dataset.labels(), &[0.0, 1.0, 0.0]);
        assert!(dataset.window(3).is_none());
    }

    #[test]
    fn window_index_past_the_end_is_none() {
        let dataset = Dataset::concat(2, [&batch(2, 1, 0.0)]).unwrap();
        let stride = 2 * FEATURE_WIDTH;
        assert!(dataset.window(usize::MAX / stride).is_none());
        assert!(dataset.window(usize::MAX).is_none());
        assert!(dataset.window(1).is_none());
    }

    #[test]
    fn concat_rejects_mismatched_lookback() {
        let err = Dataset::concat(3, [&batch(4, 1, 0.0)]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn device_placement_keeps_values() {
        let dataset = Dataset::concat(2, [&batch(2, 2, 0.5)]).unwrap();
        let placed = dataset.clone().to_device(Device::Cuda(1));
        assert_eq!(placed.device(), Device::Cuda(1));
        assert_eq!(placed.features(), dataset.features());
        assert_eq!(placed.labels(), dataset.labels());
    }

    #[test]
    fn device_parses_common_spellings() {
        assert_eq!("CPU".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("cuda".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:3".parse::<Device>().unwrap(), Device::Cuda(3));
        assert!("tpu".parse::<Device>().is_err());
        assert_eq!(Device::Cuda(2).to_string(), "cuda:2");
    }

    #[test]
    fn dataset_file_round_trip() {
        let dataset = Dataset::concat(2, [&batch(2, 3, 7.0)])
            .unwrap()
            .to_device(Device::Cuda(0));
        let path = std::env::temp_dir().join(format!("dataset_{}.bin", Uuid::new_v4()));
        dataset.save_to_file(&path).unwrap();
        let restored = Dataset::load_from_file(&path);
        let _ = fs::remove_file(&path);
        assert_eq!(restored.unwrap(), dataset);
    }
}
