//! Workflow Configuration
//!
//! All the literal constants of the original workflow (paths, image size,
//! split fraction, batch size, learning-rate schedule, epoch budget) live
//! here as named, validated fields instead of being scattered through the
//! scripts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::error::{CarVisionError, Result};

/// Piecewise-constant learning-rate schedule parameters.
///
/// `values[i]` applies to epochs in `[boundaries[i-1], boundaries[i])`,
/// with `values[0]` before the first boundary and the last value after the
/// last boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Epoch thresholds at which the rate drops (strictly increasing)
    pub boundaries: Vec<usize>,

    /// Learning rates, one more entry than `boundaries`
    pub values: Vec<f64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            boundaries: vec![100, 200],
            values: vec![1e-3, 5e-4, 1e-4],
        }
    }
}

impl ScheduleConfig {
    /// Validate the schedule shape
    pub fn validate(&self) -> Result<()> {
        if self.values.len() != self.boundaries.len() + 1 {
            return Err(CarVisionError::Config(format!(
                "schedule needs exactly {} values for {} boundaries, got {}",
                self.boundaries.len() + 1,
                self.boundaries.len(),
                self.values.len()
            )));
        }

        if !self.boundaries.windows(2).all(|w| w[0] < w[1]) {
            return Err(CarVisionError::Config(
                "schedule boundaries must be strictly increasing".to_string(),
            ));
        }

        if self.values.iter().any(|v| *v <= 0.0) {
            return Err(CarVisionError::Config(
                "learning rates must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Training workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Root of the training data (one subdirectory per class)
    pub train_dir: PathBuf,

    /// Root of the test data (same subdirectory-per-class convention)
    pub test_dir: PathBuf,

    /// Input resolution (square images)
    pub image_size: usize,

    /// Fraction of training samples diverted to validation, exclusive (0, 1)
    pub validation_rate: f64,

    /// Batch size for the training and validation feeds
    pub batch_size: usize,

    /// Fixed epoch budget
    pub epochs: usize,

    /// Learning-rate schedule
    pub schedule: ScheduleConfig,

    /// Augmentation policy for the training feed
    pub augmentation: AugmentationConfig,

    /// SGD momentum
    pub momentum: f64,

    /// Optional pretrained feature-extractor weights for transfer learning
    pub extractor_weights: Option<PathBuf>,

    /// Checkpoint path, overwritten in place on improvement
    pub checkpoint_path: PathBuf,

    /// Directory where the accuracy/loss charts are written
    pub chart_dir: PathBuf,

    /// Seed for the split, shuffling and augmentation
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_dir: PathBuf::from("data/car_images/train"),
            test_dir: PathBuf::from("data/car_images/test"),
            image_size: crate::IMAGE_SIZE,
            validation_rate: 0.2,
            batch_size: 16,
            epochs: 100,
            schedule: ScheduleConfig::default(),
            augmentation: AugmentationConfig::default(),
            momentum: 0.9,
            extractor_weights: None,
            checkpoint_path: PathBuf::from("output/model"),
            chart_dir: PathBuf::from("output/charts"),
            seed: 42,
        }
    }
}

impl TrainConfig {
    /// Validate all parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.image_size == 0 {
            return Err(CarVisionError::Config(
                "image_size must be greater than 0".to_string(),
            ));
        }

        if self.validation_rate <= 0.0 || self.validation_rate >= 1.0 {
            return Err(CarVisionError::Config(format!(
                "validation_rate must be in (0, 1), got {}",
                self.validation_rate
            )));
        }

        if self.batch_size == 0 {
            return Err(CarVisionError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }

        if self.epochs == 0 {
            return Err(CarVisionError::Config(
                "epochs must be at least 1".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.momentum) {
            return Err(CarVisionError::Config(format!(
                "momentum must be in [0, 1), got {}",
                self.momentum
            )));
        }

        self.schedule.validate()
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CarVisionError::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| CarVisionError::Serialization(e.to_string()))
    }
}

// Re-export so callers can configure the full pipeline from one module.
pub use crate::dataset::augmentation::AugmentationConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TrainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.image_size, 300);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.epochs, 100);
    }

    #[test]
    fn test_validation_rate_range() {
        let mut config = TrainConfig::default();
        config.validation_rate = 0.0;
        assert!(config.validate().is_err());

        config.validation_rate = 1.0;
        assert!(config.validate().is_err());

        config.validation_rate = 0.2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_schedule_shape_validation() {
        let schedule = ScheduleConfig {
            boundaries: vec![100, 200],
            values: vec![1e-3, 5e-4],
        };
        assert!(schedule.validate().is_err());

        let schedule = ScheduleConfig {
            boundaries: vec![200, 100],
            values: vec![1e-3, 5e-4, 1e-4],
        };
        assert!(schedule.validate().is_err());

        assert!(ScheduleConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = TrainConfig {
            batch_size: 8,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = TrainConfig::load(&path).unwrap();
        assert_eq!(loaded.batch_size, 8);
        assert_eq!(loaded.image_size, config.image_size);
    }
}
