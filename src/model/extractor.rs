//! Convolutional Feature Extractor
//!
//! The backbone for transfer learning: four convolutional blocks with
//! increasing filter counts, ending in global average pooling. Pretrained
//! weights can be loaded from a checkpoint so the classifier head trains on
//! top of learned features.

use std::path::Path;

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d, Relu,
    },
    record::{CompactRecorder, Recorder},
    tensor::{backend::Backend, Tensor},
};

use crate::utils::error::{CarVisionError, Result as CvResult};

/// Configuration for the feature extractor
#[derive(Config, Debug)]
pub struct ExtractorConfig {
    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Base number of convolutional filters; doubles per block
    #[config(default = "32")]
    pub base_filters: usize,
}

impl ExtractorConfig {
    /// Initialize the extractor with random weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeatureExtractor<B> {
        let base = self.base_filters;

        FeatureExtractor {
            conv1: ConvBlock::new(self.in_channels, base, 3, device),
            conv2: ConvBlock::new(base, base * 2, 3, device),
            conv3: ConvBlock::new(base * 2, base * 4, 3, device),
            conv4: ConvBlock::new(base * 4, base * 8, 3, device),
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            out_channels: base * 8,
        }
    }
}

/// A convolutional block: Conv2d, BatchNorm, ReLU, MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    /// Create a new convolutional block
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let bn = BatchNormConfig::new(out_channels).init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self {
            conv,
            bn,
            relu: Relu::new(),
            pool,
        }
    }

    /// Forward pass through the block, halving spatial resolution
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Convolutional backbone ending in global average pooling
#[derive(Module, Debug)]
pub struct FeatureExtractor<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub conv4: ConvBlock<B>,
    pub global_pool: AdaptiveAvgPool2d,
    out_channels: usize,
}

impl<B: Backend> FeatureExtractor<B> {
    /// Forward pass: [B, C, H, W] -> pooled features [B, out_channels, 1, 1]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);
        self.global_pool.forward(x)
    }

    /// Number of output feature channels
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Load pretrained weights from a checkpoint file
    pub fn load_weights(self, path: &Path, device: &B::Device) -> CvResult<Self> {
        let record = CompactRecorder::new()
            .load(path.to_path_buf(), device)
            .map_err(|e| {
                CarVisionError::Model(format!(
                    "failed to load extractor weights from {:?}: {}",
                    path, e
                ))
            })?;

        Ok(self.load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_extractor_pools_to_unit_spatial() {
        let device = Default::default();
        let extractor = ExtractorConfig::new().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 64, 64], &device);
        let output = extractor.forward(input);

        assert_eq!(output.dims(), [2, 256, 1, 1]);
        assert_eq!(extractor.out_channels(), 256);
    }

    #[test]
    fn test_extractor_handles_non_power_of_two_input() {
        let device = Default::default();
        let extractor = ExtractorConfig::new().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 75, 75], &device);
        let output = extractor.forward(input);

        assert_eq!(output.dims(), [1, 256, 1, 1]);
    }

    #[test]
    fn test_load_weights_missing_file_fails() {
        let device = Default::default();
        let extractor = ExtractorConfig::new().init::<TestBackend>(&device);

        let result = extractor.load_weights(Path::new("/nonexistent/weights.mpk"), &device);
        assert!(result.is_err());
    }
}
