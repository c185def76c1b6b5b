//! Data Augmentation for the training feed
//!
//! On-the-fly randomized geometric transforms that expand effective
//! training-set diversity. Applied to the training feed only; validation and
//! test feeds must see the stored pixels untouched.
//!
//! The transforms (rotation, zoom, shift, shear) compose into a single
//! affine map so each image is resampled once, with bilinear interpolation
//! and edge-clamp fill for pixels that map outside the source.

use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Configuration for data augmentation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AugmentationConfig {
    /// Maximum rotation angle in degrees (applies ±rotation_degrees)
    pub rotation_degrees: f32,
    /// Zoom range: scale sampled from 1 ± zoom_range
    pub zoom_range: f32,
    /// Horizontal shift range as a fraction of width (±)
    pub width_shift: f32,
    /// Vertical shift range as a fraction of height (±)
    pub height_shift: f32,
    /// Shear range (±, tangent of the shear angle)
    pub shear_range: f32,
    /// Probability of applying horizontal flip (0.0 - 1.0)
    pub horizontal_flip_prob: f32,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            rotation_degrees: 20.0,
            zoom_range: 0.15,
            width_shift: 0.2,
            height_shift: 0.2,
            shear_range: 0.15,
            horizontal_flip_prob: 0.5,
        }
    }
}

impl AugmentationConfig {
    /// Disable all augmentations (for validation/test feeds)
    pub fn none() -> Self {
        Self {
            rotation_degrees: 0.0,
            zoom_range: 0.0,
            width_shift: 0.0,
            height_shift: 0.0,
            shear_range: 0.0,
            horizontal_flip_prob: 0.0,
        }
    }

    /// Whether any transform can fire
    pub fn is_identity(&self) -> bool {
        self.rotation_degrees == 0.0
            && self.zoom_range == 0.0
            && self.width_shift == 0.0
            && self.height_shift == 0.0
            && self.shear_range == 0.0
            && self.horizontal_flip_prob == 0.0
    }
}

/// Image augmenter that applies the randomized transform policy
#[derive(Clone)]
pub struct Augmenter {
    config: AugmentationConfig,
    image_size: u32,
}

impl Augmenter {
    /// Create a new augmenter with the given configuration
    pub fn new(config: AugmentationConfig, image_size: u32) -> Self {
        Self { config, image_size }
    }

    /// Create an augmenter with the default training policy
    pub fn with_defaults(image_size: u32) -> Self {
        Self::new(AugmentationConfig::default(), image_size)
    }

    /// Create an augmenter that only rescales (for validation/test feeds)
    pub fn no_augmentation(image_size: u32) -> Self {
        Self::new(AugmentationConfig::none(), image_size)
    }

    /// Apply the configured random transforms to an image
    pub fn augment(&self, img: DynamicImage, rng: &mut ChaCha8Rng) -> DynamicImage {
        if self.config.is_identity() {
            return img;
        }

        let mut result = img;

        if rng.gen::<f32>() < self.config.horizontal_flip_prob {
            result = result.fliph();
        }

        let angle = sample_range(rng, self.config.rotation_degrees);
        let zoom = 1.0 + sample_range(rng, self.config.zoom_range);
        let shear = sample_range(rng, self.config.shear_range);

        let rgb = result.to_rgb8();
        let (width, height) = rgb.dimensions();
        let tx = sample_range(rng, self.config.width_shift) * width as f32;
        let ty = sample_range(rng, self.config.height_shift) * height as f32;

        let transformed = affine_transform(&rgb, angle.to_radians(), zoom, shear, tx, ty);
        DynamicImage::ImageRgb8(transformed)
    }

    /// Resize image to the target size (always applied, not random)
    pub fn resize(&self, img: DynamicImage) -> DynamicImage {
        img.resize_exact(
            self.image_size,
            self.image_size,
            image::imageops::FilterType::Triangle,
        )
    }

    /// Convert image to CHW float tensor data normalized to [0, 1]
    pub fn to_tensor_data(&self, img: &DynamicImage) -> Vec<f32> {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut data = Vec::with_capacity(3 * height as usize * width as usize);

        for c in 0..3 {
            for y in 0..height {
                for x in 0..width {
                    let pixel = rgb.get_pixel(x, y);
                    data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        data
    }

    /// Full preprocessing pipeline: augment (optional), resize, to tensor
    pub fn preprocess(&self, img: DynamicImage, rng: Option<&mut ChaCha8Rng>) -> Vec<f32> {
        let mut result = img;

        if let Some(rng) = rng {
            result = self.augment(result, rng);
        }

        result = self.resize(result);
        self.to_tensor_data(&result)
    }

    /// Target image size
    pub fn image_size(&self) -> u32 {
        self.image_size
    }
}

/// Sample uniformly from ±range; 0.0 when the range is empty
fn sample_range(rng: &mut ChaCha8Rng, range: f32) -> f32 {
    if range <= 0.0 {
        0.0
    } else {
        rng.gen_range(-range..=range)
    }
}

/// Apply a combined rotate/zoom/shear/shift transform around the center.
///
/// For each output pixel the inverse map locates its source coordinate,
/// sampled bilinearly; coordinates outside the source are clamped to the
/// nearest edge pixel.
fn affine_transform(
    img: &RgbImage,
    angle_rad: f32,
    zoom: f32,
    shear: f32,
    tx: f32,
    ty: f32,
) -> RgbImage {
    let (width, height) = img.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;

    // Forward map: rotate · shear · zoom, then translate.
    let cos_a = angle_rad.cos();
    let sin_a = angle_rad.sin();
    let a = zoom * cos_a;
    let b = zoom * (cos_a * shear - sin_a);
    let c = zoom * sin_a;
    let d = zoom * (sin_a * shear + cos_a);

    let det = a * d - b * c;
    if det.abs() < 1e-8 {
        return img.clone();
    }

    // Inverse of the 2x2 linear part
    let ia = d / det;
    let ib = -b / det;
    let ic = -c / det;
    let id = a / det;

    let mut output = ImageBuffer::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx - tx;
            let dy = y as f32 - cy - ty;

            let src_x = cx + ia * dx + ib * dy;
            let src_y = cy + ic * dx + id * dy;

            output.put_pixel(x, y, bilinear_sample(img, src_x, src_y));
        }
    }

    output
}

/// Sample a pixel using bilinear interpolation with edge clamping
fn bilinear_sample(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (width, height) = img.dimensions();

    let x = x.clamp(0.0, width as f32 - 1.0);
    let y = y.clamp(0.0, height as f32 - 1.0);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut result = [0u8; 3];
    for ch in 0..3 {
        let v = p00[ch] as f32 * (1.0 - fx) * (1.0 - fy)
            + p10[ch] as f32 * fx * (1.0 - fy)
            + p01[ch] as f32 * (1.0 - fx) * fy
            + p11[ch] as f32 * fx * fy;

        result[ch] = v.round().clamp(0.0, 255.0) as u8;
    }

    Rgb(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use rand::SeedableRng;

    fn create_test_image() -> DynamicImage {
        let mut img = ImageBuffer::new(64, 64);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 4) as u8, (y * 4) as u8, 128]);
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_no_augmentation_is_identity() {
        let aug = Augmenter::no_augmentation(64);
        let img = create_test_image();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let result = aug.augment(img.clone(), &mut rng);
        assert_eq!(img.to_rgb8().as_raw(), result.to_rgb8().as_raw());
    }

    #[test]
    fn test_augment_preserves_dimensions() {
        let aug = Augmenter::with_defaults(64);
        let img = create_test_image();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let result = aug.augment(img, &mut rng);
        assert_eq!(result.dimensions(), (64, 64));
    }

    #[test]
    fn test_augment_is_seed_deterministic() {
        let aug = Augmenter::with_defaults(64);
        let img = create_test_image();

        let mut rng_a = ChaCha8Rng::seed_from_u64(7);
        let mut rng_b = ChaCha8Rng::seed_from_u64(7);

        let a = aug.augment(img.clone(), &mut rng_a);
        let b = aug.augment(img, &mut rng_b);
        assert_eq!(a.to_rgb8().as_raw(), b.to_rgb8().as_raw());
    }

    #[test]
    fn test_resize_to_target() {
        let aug = Augmenter::with_defaults(32);
        let result = aug.resize(create_test_image());
        assert_eq!(result.dimensions(), (32, 32));
    }

    #[test]
    fn test_to_tensor_data_normalized_chw() {
        let aug = Augmenter::no_augmentation(64);
        let data = aug.to_tensor_data(&create_test_image());

        assert_eq!(data.len(), 3 * 64 * 64);
        assert!(data.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_preprocess_shapes() {
        let aug = Augmenter::with_defaults(32);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let data = aug.preprocess(create_test_image(), Some(&mut rng));
        assert_eq!(data.len(), 3 * 32 * 32);

        let aug = Augmenter::no_augmentation(32);
        let data = aug.preprocess(create_test_image(), None);
        assert_eq!(data.len(), 3 * 32 * 32);
    }

    #[test]
    fn test_pure_shift_moves_content() {
        let mut img = ImageBuffer::from_pixel(16, 16, Rgb([0u8, 0, 0]));
        img.put_pixel(8, 8, Rgb([255, 255, 255]));

        // Shift by 4 pixels right: the bright pixel lands at x=12
        let out = affine_transform(&img, 0.0, 1.0, 0.0, 4.0, 0.0);
        assert_eq!(out.get_pixel(12, 8)[0], 255);
        assert_eq!(out.get_pixel(8, 8)[0], 0);
    }
}
