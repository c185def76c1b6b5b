//! # carvision
//!
//! A small image workflow for a car-image dataset, built on the Burn
//! framework:
//!
//! - **Training**: transfer-learning classifier (convolutional feature
//!   extractor + dense head) trained with SGD and a piecewise-constant
//!   learning-rate schedule, with best-so-far checkpointing and SVG
//!   accuracy/loss charts.
//! - **Background removal**: batch job that mattes PNG images with a small
//!   alpha-matting network and writes cut-outs to a derived directory.
//! - **Resize**: batch job that rescales JPEG images to a fixed resolution.
//!
//! ## Modules
//!
//! - `config`: validated workflow configuration
//! - `dataset`: directory-backed dataset loading, splits, augmentation, feeds
//! - `model`: feature extractor, classifier head, matting network
//! - `training`: schedule, metrics, checkpoint policy, fit loop
//! - `jobs`: the two batch utilities
//! - `utils`: logging, errors, chart rendering

pub mod backend;
pub mod config;
pub mod dataset;
pub mod jobs;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::{AugmentationConfig, ScheduleConfig, TrainConfig};
pub use dataset::augmentation::Augmenter;
pub use dataset::feed::{CarBatch, CarBatcher, CarItem, Feed};
pub use dataset::loader::CarDataset;
pub use dataset::split::{FeedSplits, SplitConfig};
pub use jobs::remove_bg::{BackgroundRemover, RemoveBackgroundJob};
pub use jobs::resize::ResizeJob;
pub use jobs::JobReport;
pub use model::classifier::{CarClassifier, CarClassifierConfig};
pub use model::extractor::{ExtractorConfig, FeatureExtractor};
pub use training::checkpoint::BestTracker;
pub use training::driver::{TrainingDriver, TrainingOutcome};
pub use training::metrics::{EpochRecord, TrainingHistory};
pub use training::scheduler::PiecewiseConstant;
pub use utils::error::{CarVisionError, Result};

/// Default input resolution expected by the classifier
pub const IMAGE_SIZE: usize = 300;

/// Default number of car classes in the dataset
pub const NUM_CLASSES: usize = 4;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
