//! Dataset module for the car-image data
//!
//! This module provides:
//! - Loading the directory-backed dataset (one subdirectory per class)
//! - A deterministic, stratified train/validation split
//! - The augmentation policy applied to the training feed only
//! - Lazily batched feeds for training, validation and test

pub mod augmentation;
pub mod feed;
pub mod loader;
pub mod split;

pub use augmentation::{AugmentationConfig, Augmenter};
pub use feed::{CarBatch, CarBatcher, CarItem, Feed};
pub use loader::{CarDataset, DatasetStats, ImageSample};
pub use split::{FeedSplits, SplitConfig};
