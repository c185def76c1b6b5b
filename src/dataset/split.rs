//! Train/validation split
//!
//! The training directory feeds both the training and validation sets. The
//! split is stratified per class: with N images in a class and validation
//! rate r, exactly ⌊r·N⌋ images go to validation and the remainder to
//! training. The two subsets are disjoint, and a fixed seed makes the split
//! reproducible across runs.

use std::path::PathBuf;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::loader::CarDataset;
use crate::utils::error::{CarVisionError, Result};

/// Configuration for the train/validation split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of samples per class diverted to validation, exclusive (0, 1)
    pub validation_rate: f64,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            validation_rate: 0.2,
            seed: 42,
        }
    }
}

impl SplitConfig {
    /// Create a new split configuration, validating the rate
    pub fn new(validation_rate: f64, seed: u64) -> Result<Self> {
        if validation_rate <= 0.0 || validation_rate >= 1.0 {
            return Err(CarVisionError::Config(format!(
                "validation_rate must be in (0, 1), got {}",
                validation_rate
            )));
        }

        Ok(Self {
            validation_rate,
            seed,
        })
    }
}

/// Disjoint training and validation sample lists
#[derive(Debug, Clone)]
pub struct FeedSplits {
    /// Samples for the training feed (augmented)
    pub train: Vec<(PathBuf, usize)>,
    /// Samples for the validation feed (rescale only)
    pub validation: Vec<(PathBuf, usize)>,
    /// Configuration used to create the split
    pub config: SplitConfig,
    /// Number of classes represented
    pub num_classes: usize,
}

impl FeedSplits {
    /// Split a dataset into disjoint training and validation subsets
    pub fn from_dataset(dataset: &CarDataset, config: SplitConfig) -> Result<Self> {
        if config.validation_rate <= 0.0 || config.validation_rate >= 1.0 {
            return Err(CarVisionError::Config(format!(
                "validation_rate must be in (0, 1), got {}",
                config.validation_rate
            )));
        }

        let num_classes = dataset.num_classes();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let mut train = Vec::new();
        let mut validation = Vec::new();

        for class_idx in 0..num_classes {
            let mut class_samples: Vec<(PathBuf, usize)> = dataset
                .samples_by_class(class_idx)
                .iter()
                .map(|s| (s.path.clone(), s.label))
                .collect();

            class_samples.shuffle(&mut rng);

            let val_count = (config.validation_rate * class_samples.len() as f64).floor() as usize;

            validation.extend(class_samples.drain(..val_count));
            train.extend(class_samples);
        }

        if train.is_empty() {
            return Err(CarVisionError::Dataset(
                "training subset is empty after splitting".to_string(),
            ));
        }

        Ok(Self {
            train,
            validation,
            config,
            num_classes,
        })
    }

    /// Total number of samples across both subsets
    pub fn total(&self) -> usize {
        self.train.len() + self.validation.len()
    }
}
