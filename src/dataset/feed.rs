//! Batched feeds for training, validation and test
//!
//! A [`Feed`] owns a list of (path, label) samples and hands out lazily
//! loaded batches. Images are decoded on demand, so memory stays flat no
//! matter the dataset size. The training feed re-augments every read with a
//! seed derived from (base seed, epoch, sample index), making an epoch
//! reproducible while still showing the model fresh variants each pass.
//! Validation and test feeds only rescale.

use std::path::PathBuf;

use anyhow::Result;
use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::dataset::augmentation::{AugmentationConfig, Augmenter};
use crate::dataset::loader::{self, CarDataset};
use crate::dataset::split::FeedSplits;

/// A single preprocessed sample: CHW pixel data in [0, 1] plus its label
#[derive(Debug, Clone)]
pub struct CarItem {
    /// Flattened CHW image data, length 3 * size * size
    pub image: Vec<f32>,
    /// Class label index
    pub label: usize,
    /// Source path, kept for error reporting
    pub path: PathBuf,
}

/// A batch of images and targets on a backend device
#[derive(Debug, Clone)]
pub struct CarBatch<B: Backend> {
    /// Images tensor [batch_size, 3, size, size], values in [0, 1]
    pub images: Tensor<B, 4>,
    /// Class label indices [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher that assembles [`CarItem`]s into tensors
#[derive(Clone)]
pub struct CarBatcher<B: Backend> {
    device: B::Device,
    image_size: usize,
}

impl<B: Backend> CarBatcher<B> {
    pub fn new(device: B::Device, image_size: usize) -> Self {
        Self { device, image_size }
    }

    /// Device batches are assembled on
    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

impl<B: Backend> Batcher<CarItem, CarBatch<B>> for CarBatcher<B> {
    fn batch(&self, items: Vec<CarItem>) -> CarBatch<B> {
        let batch_size = items.len();
        let size = self.image_size;

        let mut pixels = Vec::with_capacity(batch_size * 3 * size * size);
        let mut labels = Vec::with_capacity(batch_size);

        for item in items {
            debug_assert_eq!(item.image.len(), 3 * size * size);
            pixels.extend_from_slice(&item.image);
            labels.push(item.label as i32);
        }

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, 3, size, size]);
        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        CarBatch { images, targets }
    }
}

/// A lazily loaded, optionally augmented stream of samples
pub struct Feed {
    samples: Vec<(PathBuf, usize)>,
    augmenter: Augmenter,
    batch_size: usize,
    seed: u64,
    augmented: bool,
    shuffled: bool,
}

impl Feed {
    /// Training feed: shuffled each epoch, augmentation applied per read
    pub fn training(
        splits: &FeedSplits,
        augmentation: AugmentationConfig,
        image_size: u32,
        batch_size: usize,
        seed: u64,
    ) -> Self {
        Self {
            samples: splits.train.clone(),
            augmenter: Augmenter::new(augmentation, image_size),
            batch_size,
            seed,
            augmented: true,
            shuffled: true,
        }
    }

    /// Validation feed: fixed order, rescale only
    pub fn validation(splits: &FeedSplits, image_size: u32, batch_size: usize) -> Self {
        Self {
            samples: splits.validation.clone(),
            augmenter: Augmenter::no_augmentation(image_size),
            batch_size,
            seed: 0,
            augmented: false,
            shuffled: false,
        }
    }

    /// Test feed: fixed order, rescale only, one sample per batch
    pub fn test(dataset: &CarDataset, image_size: u32) -> Self {
        Self {
            samples: dataset
                .samples
                .iter()
                .map(|s| (s.path.clone(), s.label))
                .collect(),
            augmenter: Augmenter::no_augmentation(image_size),
            batch_size: 1,
            seed: 0,
            augmented: false,
            shuffled: false,
        }
    }

    /// Number of samples in the feed
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the feed holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of batches per epoch (last batch may be partial)
    pub fn num_batches(&self) -> usize {
        self.samples.len().div_ceil(self.batch_size)
    }

    /// Iterate the feed's batches for a given epoch
    ///
    /// Each batch is a `Vec<CarItem>` of at most `batch_size` items, loaded
    /// and preprocessed on the fly.
    pub fn epoch_batches(&self, epoch: usize) -> impl Iterator<Item = Result<Vec<CarItem>>> + '_ {
        let mut order: Vec<usize> = (0..self.samples.len()).collect();
        if self.shuffled {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
            order.shuffle(&mut rng);
        }

        let chunks: Vec<Vec<usize>> = order
            .chunks(self.batch_size)
            .map(|c| c.to_vec())
            .collect();

        chunks.into_iter().map(move |chunk| {
            chunk
                .into_iter()
                .map(|idx| self.load_item(idx, epoch))
                .collect()
        })
    }

    /// Load and preprocess a single sample
    fn load_item(&self, index: usize, epoch: usize) -> Result<CarItem> {
        let (path, label) = &self.samples[index];
        let img = loader::load_rgb(path)?;

        let image = if self.augmented {
            let mut rng = ChaCha8Rng::seed_from_u64(sample_seed(self.seed, epoch, index));
            self.augmenter.preprocess(img, Some(&mut rng))
        } else {
            self.augmenter.preprocess(img, None)
        };

        Ok(CarItem {
            image,
            label: *label,
            path: path.clone(),
        })
    }
}

/// Mix (seed, epoch, index) into a per-sample stream seed
fn sample_seed(seed: u64, epoch: usize, index: usize) -> u64 {
    let mut z = seed
        .wrapping_add((epoch as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add((index as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::split::SplitConfig;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray;

    fn fixture_dataset(per_class: usize) -> (tempfile::TempDir, CarDataset) {
        let dir = tempfile::tempdir().unwrap();
        for class in ["avante", "k9"] {
            let class_dir = dir.path().join(class);
            std::fs::create_dir(&class_dir).unwrap();
            for i in 0..per_class {
                let img = RgbImage::from_pixel(8, 8, Rgb([i as u8 * 10, 50, 200]));
                img.save(class_dir.join(format!("img_{i}.png"))).unwrap();
            }
        }
        let dataset = CarDataset::new(dir.path()).unwrap();
        (dir, dataset)
    }

    #[test]
    fn test_batcher_shapes() {
        let device = Default::default();
        let batcher = CarBatcher::<TestBackend>::new(device, 8);

        let items = vec![
            CarItem {
                image: vec![0.5; 3 * 8 * 8],
                label: 0,
                path: PathBuf::from("a.png"),
            },
            CarItem {
                image: vec![0.25; 3 * 8 * 8],
                label: 1,
                path: PathBuf::from("b.png"),
            },
        ];

        let batch = batcher.batch(items);
        assert_eq!(batch.images.dims(), [2, 3, 8, 8]);
        assert_eq!(batch.targets.dims(), [2]);

        let targets: Vec<i64> = batch.targets.into_data().iter::<i64>().collect();
        assert_eq!(targets, vec![0, 1]);
    }

    #[test]
    fn test_training_feed_batches_and_counts() {
        let (_dir, dataset) = fixture_dataset(5);
        let splits = FeedSplits::from_dataset(&dataset, SplitConfig::new(0.2, 1).unwrap()).unwrap();

        let feed = Feed::training(&splits, AugmentationConfig::default(), 8, 3, 42);
        assert_eq!(feed.len(), 8); // 10 samples, 1 to validation per class
        assert_eq!(feed.num_batches(), 3); // 3 + 3 + 2

        let batches: Vec<_> = feed
            .epoch_batches(0)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 3);
        assert_eq!(batches[2].len(), 2);
    }

    #[test]
    fn test_training_feed_epoch_is_reproducible() {
        let (_dir, dataset) = fixture_dataset(4);
        let splits =
            FeedSplits::from_dataset(&dataset, SplitConfig::new(0.25, 1).unwrap()).unwrap();
        let feed = Feed::training(&splits, AugmentationConfig::default(), 8, 2, 7);

        let first: Vec<Vec<f32>> = feed
            .epoch_batches(3)
            .collect::<Result<Vec<_>>>()
            .unwrap()
            .into_iter()
            .flatten()
            .map(|item| item.image)
            .collect();
        let second: Vec<Vec<f32>> = feed
            .epoch_batches(3)
            .collect::<Result<Vec<_>>>()
            .unwrap()
            .into_iter()
            .flatten()
            .map(|item| item.image)
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_validation_feed_is_pixel_stable() {
        let (_dir, dataset) = fixture_dataset(4);
        let splits =
            FeedSplits::from_dataset(&dataset, SplitConfig::new(0.25, 1).unwrap()).unwrap();
        let feed = Feed::validation(&splits, 8, 2);

        let a: Vec<Vec<f32>> = feed
            .epoch_batches(0)
            .collect::<Result<Vec<_>>>()
            .unwrap()
            .into_iter()
            .flatten()
            .map(|item| item.image)
            .collect();
        let b: Vec<Vec<f32>> = feed
            .epoch_batches(9)
            .collect::<Result<Vec<_>>>()
            .unwrap()
            .into_iter()
            .flatten()
            .map(|item| item.image)
            .collect();

        assert_eq!(a, b);
    }

    #[test]
    fn test_test_feed_batch_size_one() {
        let (_dir, dataset) = fixture_dataset(3);
        let feed = Feed::test(&dataset, 8);

        assert_eq!(feed.len(), 6);
        assert_eq!(feed.num_batches(), 6);

        for batch in feed.epoch_batches(0) {
            assert_eq!(batch.unwrap().len(), 1);
        }
    }

    #[test]
    fn test_missing_file_reports_error() {
        let (_dir, dataset) = fixture_dataset(2);
        let mut feed = Feed::test(&dataset, 8);
        feed.samples[0].0 = PathBuf::from("/nonexistent/gone.png");

        let results: Vec<_> = feed.epoch_batches(0).collect();
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }
}
