//! Alpha-Matting Network
//!
//! A small encoder-decoder that predicts a per-pixel foreground alpha mask.
//! Inference runs at a fixed 320x320 resolution; the mask is resized back to
//! the source image's dimensions before compositing.

use std::path::Path;

use anyhow::Result;
use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        PaddingConfig2d, Relu,
    },
    record::{CompactRecorder, Recorder},
    tensor::{activation, backend::Backend, Tensor},
};
use image::{DynamicImage, GrayImage};

use crate::jobs::remove_bg::BackgroundRemover;
use crate::model::extractor::ConvBlock;

/// Fixed inference resolution for the matting network
pub const MATTE_SIZE: u32 = 320;

/// Configuration for the matting network
#[derive(Config, Debug)]
pub struct MattingNetConfig {
    /// Base number of encoder filters; doubles per stage
    #[config(default = "16")]
    pub base_filters: usize,
}

impl MattingNetConfig {
    /// Initialize the network with random weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> MattingNet<B> {
        let base = self.base_filters;

        MattingNet {
            enc1: ConvBlock::new(3, base, 3, device),
            enc2: ConvBlock::new(base, base * 2, 3, device),
            enc3: ConvBlock::new(base * 2, base * 4, 3, device),
            up1: ConvTranspose2dConfig::new([base * 4, base * 2], [2, 2])
                .with_stride([2, 2])
                .init(device),
            up2: ConvTranspose2dConfig::new([base * 2, base], [2, 2])
                .with_stride([2, 2])
                .init(device),
            up3: ConvTranspose2dConfig::new([base, base / 2], [2, 2])
                .with_stride([2, 2])
                .init(device),
            head: Conv2dConfig::new([base / 2, 1], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            relu: Relu::new(),
        }
    }
}

/// Encoder-decoder alpha-matting network
#[derive(Module, Debug)]
pub struct MattingNet<B: Backend> {
    enc1: ConvBlock<B>,
    enc2: ConvBlock<B>,
    enc3: ConvBlock<B>,
    up1: ConvTranspose2d<B>,
    up2: ConvTranspose2d<B>,
    up3: ConvTranspose2d<B>,
    head: Conv2d<B>,
    relu: Relu,
}

impl<B: Backend> MattingNet<B> {
    /// Forward pass: [B, 3, H, W] -> alpha mask [B, 1, H, W] in [0, 1]
    ///
    /// H and W must be divisible by 8 for the encoder/decoder resolutions to
    /// line up; inference always uses [`MATTE_SIZE`].
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.enc1.forward(x);
        let x = self.enc2.forward(x);
        let x = self.enc3.forward(x);

        let x = self.relu.forward(self.up1.forward(x));
        let x = self.relu.forward(self.up2.forward(x));
        let x = self.relu.forward(self.up3.forward(x));

        activation::sigmoid(self.head.forward(x))
    }

    /// Load pretrained weights from a checkpoint file
    pub fn load_weights(self, path: &Path, device: &B::Device) -> Result<Self> {
        let record = CompactRecorder::new()
            .load(path.to_path_buf(), device)
            .map_err(|e| anyhow::anyhow!("failed to load matting weights from {:?}: {}", path, e))?;

        Ok(self.load_record(record))
    }
}

/// Background remover backed by the matting network
pub struct MattingRemover<B: Backend> {
    model: MattingNet<B>,
    device: B::Device,
}

impl<B: Backend> MattingRemover<B> {
    pub fn new(model: MattingNet<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Create a remover, loading weights when a checkpoint is given
    pub fn from_checkpoint(weights: Option<&Path>, device: B::Device) -> Result<Self> {
        let mut model = MattingNetConfig::new().init(&device);
        if let Some(path) = weights {
            model = model.load_weights(path, &device)?;
        }

        Ok(Self::new(model, device))
    }
}

impl<B: Backend> BackgroundRemover for MattingRemover<B> {
    fn matte(&self, image: &DynamicImage) -> Result<GrayImage> {
        let (width, height) = (image.width(), image.height());

        let resized = image
            .resize_exact(MATTE_SIZE, MATTE_SIZE, image::imageops::FilterType::Triangle)
            .to_rgb8();

        let size = MATTE_SIZE as usize;
        let mut pixels = Vec::with_capacity(3 * size * size);
        for c in 0..3 {
            for y in 0..MATTE_SIZE {
                for x in 0..MATTE_SIZE {
                    pixels.push(resized.get_pixel(x, y)[c] as f32 / 255.0);
                }
            }
        }

        let input = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([1, 3, size, size]);
        let alpha = self.model.forward(input);

        let values: Vec<f32> = alpha.into_data().to_vec().map_err(|e| {
            anyhow::anyhow!("failed to read alpha mask from device: {:?}", e)
        })?;

        let mask = GrayImage::from_fn(MATTE_SIZE, MATTE_SIZE, |x, y| {
            let v = values[(y * MATTE_SIZE + x) as usize];
            image::Luma([(v.clamp(0.0, 1.0) * 255.0).round() as u8])
        });

        // Back to the source resolution for compositing
        let mask = image::imageops::resize(
            &mask,
            width,
            height,
            image::imageops::FilterType::Triangle,
        );

        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_alpha_mask_shape_and_range() {
        let device = Default::default();
        let model = MattingNetConfig::new().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [1, 3, 40, 40],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );
        let alpha = model.forward(input);

        assert_eq!(alpha.dims(), [1, 1, 40, 40]);

        let values: Vec<f32> = alpha.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_matte_matches_source_dimensions() {
        let device = Default::default();
        let model = MattingNetConfig::new().init::<TestBackend>(&device);
        let remover = MattingRemover::new(model, device);

        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            100,
            60,
            image::Rgb([200, 30, 30]),
        ));
        let mask = remover.matte(&img).unwrap();

        assert_eq!(mask.dimensions(), (100, 60));
    }
}
