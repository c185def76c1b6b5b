//! Training Driver
//!
//! The fit loop: lazily batched epochs over the training feed, SGD with
//! momentum under a piecewise-constant learning-rate schedule, validation
//! after every epoch, best-checkpointing, and accuracy/loss charts at the
//! end. Runs a final evaluation over the held-out test directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    tensor::{activation, backend::AutodiffBackend, backend::Backend, ElementConversion, Tensor},
};
use tracing::{info, warn};

use crate::config::TrainConfig;
use crate::dataset::feed::{CarBatcher, Feed};
use crate::dataset::loader::CarDataset;
use crate::dataset::split::{FeedSplits, SplitConfig};
use crate::model::classifier::{CarClassifier, CarClassifierConfig};
use crate::model::extractor::ExtractorConfig;
use crate::training::checkpoint::{save_model, BestTracker};
use crate::training::metrics::{EpochRecord, MetricAccumulator, TrainingHistory};
use crate::training::scheduler::PiecewiseConstant;
use crate::utils::charts::{generate_line_chart, series_colors, DataSeries};
use crate::utils::logging::TrainingLogger;

/// Result of evaluating a trained model on the test directory
#[derive(Debug, Clone)]
pub struct TestReport {
    pub accuracy: f64,
    pub top2_accuracy: f64,
    pub samples: usize,
}

/// Everything a finished training run produced
#[derive(Debug)]
pub struct TrainingOutcome {
    pub history: TrainingHistory,
    pub best_val_accuracy: f64,
    pub checkpoint_path: PathBuf,
    pub test: Option<TestReport>,
}

/// Orchestrates a full training run on backend `B`
pub struct TrainingDriver<B: AutodiffBackend> {
    config: TrainConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> TrainingDriver<B> {
    pub fn new(config: TrainConfig, device: B::Device) -> Self {
        Self { config, device }
    }

    /// Run the full training workflow
    pub fn run(&self) -> Result<TrainingOutcome> {
        let config = &self.config;
        config.validate()?;

        info!("Loading dataset from {:?}", config.train_dir);
        let dataset = CarDataset::new(&config.train_dir)?;
        dataset.stats().print();

        let splits = FeedSplits::from_dataset(
            &dataset,
            SplitConfig::new(config.validation_rate, config.seed)?,
        )?;
        info!(
            "Split: {} training / {} validation samples",
            splits.train.len(),
            splits.validation.len()
        );

        let image_size = config.image_size as u32;
        let train_feed = Feed::training(
            &splits,
            config.augmentation.clone(),
            image_size,
            config.batch_size,
            config.seed,
        );
        let val_feed = Feed::validation(&splits, image_size, config.batch_size);

        // Model, with the backbone optionally warm-started
        let mut extractor = ExtractorConfig::new().init::<B>(&self.device);
        if let Some(weights) = &config.extractor_weights {
            info!("Loading pretrained extractor weights from {:?}", weights);
            extractor = extractor.load_weights(weights, &self.device)?;
        }

        let model_config = CarClassifierConfig::new(ExtractorConfig::new())
            .with_num_classes(dataset.num_classes())
            .with_image_size(config.image_size);
        let mut model = model_config.init_with(extractor, &self.device);

        let mut optimizer = SgdConfig::new()
            .with_momentum(Some(
                MomentumConfig::new()
                    .with_momentum(config.momentum)
                    .with_dampening(0.0),
            ))
            .init();

        let schedule = PiecewiseConstant::from_config(&config.schedule)?;
        let batcher = CarBatcher::<B>::new(self.device.clone(), config.image_size);

        let inner_device = <B::InnerBackend as Backend>::Device::default();
        let inner_batcher =
            CarBatcher::<B::InnerBackend>::new(inner_device, config.image_size);

        let loss_fn = CrossEntropyLossConfig::new().init(&self.device);

        let mut history = TrainingHistory::new();
        let mut tracker = BestTracker::new();
        let mut logger = TrainingLogger::new(config.epochs);

        for epoch in 0..config.epochs {
            logger.start_epoch(epoch);
            let lr = schedule.lr_at(epoch);

            let mut train_metrics = MetricAccumulator::new();

            for batch_items in train_feed.epoch_batches(epoch) {
                let items = batch_items?;
                let targets: Vec<usize> = items.iter().map(|item| item.label).collect();

                let batch = batcher.batch(items);
                let output = model.forward(batch.images.clone());

                let loss = loss_fn.forward(output.clone(), batch.targets.clone());
                let loss_value: f64 = loss.clone().into_scalar().elem();

                let probs = probability_rows(activation::softmax(output, 1))?;
                train_metrics.observe(loss_value, &probs, &targets);

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optimizer.step(lr, model, grads);
            }

            let (val_loss, val_accuracy, val_top2) =
                evaluate(&model.valid(), &val_feed, &inner_batcher)?;

            let record = EpochRecord {
                epoch,
                loss: train_metrics.avg_loss(),
                accuracy: train_metrics.accuracy(),
                top2_accuracy: train_metrics.top2_accuracy(),
                val_loss,
                val_accuracy,
                val_top2_accuracy: val_top2,
                lr,
            };
            logger.end_epoch(record.loss, record.val_accuracy, record.lr);
            history.push(record);

            if tracker.observe(val_accuracy) {
                logger.log_new_best(val_accuracy);
                save_model(model.clone(), &config.checkpoint_path)?;
            }
        }

        let best_val_accuracy = tracker.best().unwrap_or(0.0);
        logger.log_complete(best_val_accuracy);

        self.render_charts(&history)?;
        history.save(&config.chart_dir.join("history.json"))?;

        let test = self.evaluate_test(&model, dataset.num_classes())?;

        Ok(TrainingOutcome {
            history,
            best_val_accuracy,
            checkpoint_path: config.checkpoint_path.clone(),
            test,
        })
    }

    /// Write the accuracy and loss charts for the run
    fn render_charts(&self, history: &TrainingHistory) -> Result<()> {
        let chart_dir = &self.config.chart_dir;
        std::fs::create_dir_all(chart_dir)
            .with_context(|| format!("failed to create chart directory {:?}", chart_dir))?;

        let (train_color, val_color) = series_colors();

        generate_line_chart(
            "Model Accuracy",
            "epochs",
            "accuracy",
            &[
                DataSeries::from_values("accuracy", &history.accuracies(), train_color),
                DataSeries::from_values("val_accuracy", &history.val_accuracies(), val_color),
            ],
            &chart_dir.join("accuracy.svg"),
        )?;

        generate_line_chart(
            "Model Loss",
            "epochs",
            "loss",
            &[
                DataSeries::from_values("loss", &history.losses(), train_color),
                DataSeries::from_values("val_loss", &history.val_losses(), val_color),
            ],
            &chart_dir.join("loss.svg"),
        )?;

        info!("Charts written to {:?}", chart_dir);
        Ok(())
    }

    /// Evaluate the trained model over the test directory, one image at a time
    fn evaluate_test(
        &self,
        model: &CarClassifier<B>,
        num_classes: usize,
    ) -> Result<Option<TestReport>> {
        if !self.config.test_dir.exists() {
            warn!(
                "Test directory {:?} does not exist, skipping evaluation",
                self.config.test_dir
            );
            return Ok(None);
        }

        let test_dataset = CarDataset::new(&self.config.test_dir)?;
        if test_dataset.num_classes() != num_classes {
            warn!(
                "Test set has {} classes but the model was trained on {}",
                test_dataset.num_classes(),
                num_classes
            );
        }

        let feed = Feed::test(&test_dataset, self.config.image_size as u32);
        let inner_device = <B::InnerBackend as Backend>::Device::default();
        let batcher = CarBatcher::<B::InnerBackend>::new(inner_device, self.config.image_size);

        let (_, accuracy, top2_accuracy) = evaluate(&model.valid(), &feed, &batcher)?;

        info!(
            "Test evaluation: {} samples, accuracy {:.4}, top-2 {:.4}",
            feed.len(),
            accuracy,
            top2_accuracy
        );

        Ok(Some(TestReport {
            accuracy,
            top2_accuracy,
            samples: feed.len(),
        }))
    }
}

/// One full pass over a feed without gradients
///
/// Returns (average loss, accuracy, top-2 accuracy).
fn evaluate<B: Backend>(
    model: &CarClassifier<B>,
    feed: &Feed,
    batcher: &CarBatcher<B>,
) -> Result<(f64, f64, f64)> {
    let loss_fn = CrossEntropyLossConfig::new().init(batcher.device());
    let mut metrics = MetricAccumulator::new();

    for batch_items in feed.epoch_batches(0) {
        let items = batch_items?;
        let targets: Vec<usize> = items.iter().map(|item| item.label).collect();

        let batch = batcher.batch(items);
        let output = model.forward(batch.images);

        let loss = loss_fn.forward(output.clone(), batch.targets);
        let loss_value: f64 = loss.into_scalar().elem();

        let probs = probability_rows(activation::softmax(output, 1))?;
        metrics.observe(loss_value, &probs, &targets);
    }

    Ok((metrics.avg_loss(), metrics.accuracy(), metrics.top2_accuracy()))
}

/// Pull a [rows, cols] probability tensor back as per-sample rows
fn probability_rows<B: Backend>(probs: Tensor<B, 2>) -> Result<Vec<Vec<f32>>> {
    let [_, cols] = probs.dims();
    let flat: Vec<f32> = probs
        .into_data()
        .to_vec()
        .map_err(|e| anyhow::anyhow!("failed to read probabilities from device: {:?}", e))?;

    Ok(flat.chunks(cols).map(|c| c.to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AugmentationConfig, ScheduleConfig};
    use burn::backend::{Autodiff, NdArray};
    use image::{Rgb, RgbImage};
    use std::path::Path;

    type TestBackend = Autodiff<NdArray>;

    fn write_class_images(root: &Path, class: &str, count: usize, tint: u8) {
        let class_dir = root.join(class);
        std::fs::create_dir_all(&class_dir).unwrap();
        for i in 0..count {
            let img = RgbImage::from_pixel(16, 16, Rgb([tint, i as u8 * 20, 100]));
            img.save(class_dir.join(format!("img_{i}.jpg"))).unwrap();
        }
    }

    fn tiny_config(root: &Path) -> TrainConfig {
        TrainConfig {
            train_dir: root.join("train"),
            test_dir: root.join("test"),
            image_size: 16,
            validation_rate: 0.25,
            batch_size: 2,
            epochs: 1,
            schedule: ScheduleConfig {
                boundaries: vec![],
                values: vec![1e-3],
            },
            augmentation: AugmentationConfig::none(),
            momentum: 0.9,
            extractor_weights: None,
            checkpoint_path: root.join("output/model"),
            chart_dir: root.join("output/charts"),
            seed: 42,
        }
    }

    #[test]
    fn test_tiny_end_to_end_run() {
        let dir = tempfile::tempdir().unwrap();
        write_class_images(&dir.path().join("train"), "avante", 4, 200);
        write_class_images(&dir.path().join("train"), "k9", 4, 20);
        write_class_images(&dir.path().join("test"), "avante", 1, 200);
        write_class_images(&dir.path().join("test"), "k9", 1, 20);

        let config = tiny_config(dir.path());
        let driver = TrainingDriver::<TestBackend>::new(config, Default::default());
        let outcome = driver.run().unwrap();

        assert_eq!(outcome.history.len(), 1);
        let record = &outcome.history.records[0];
        assert!(record.loss.is_finite());
        assert!((0.0..=1.0).contains(&record.val_accuracy));
        assert_eq!(record.lr, 1e-3);

        // Charts and history are always written
        assert!(dir.path().join("output/charts/accuracy.svg").exists());
        assert!(dir.path().join("output/charts/loss.svg").exists());
        assert!(dir.path().join("output/charts/history.json").exists());

        // Test directory evaluation ran
        let test = outcome.test.unwrap();
        assert_eq!(test.samples, 2);
        assert!((0.0..=1.0).contains(&test.accuracy));
        assert!(test.top2_accuracy >= test.accuracy);
    }

    #[test]
    fn test_missing_test_dir_skips_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        write_class_images(&dir.path().join("train"), "avante", 4, 200);
        write_class_images(&dir.path().join("train"), "k9", 4, 20);

        let config = tiny_config(dir.path());
        let driver = TrainingDriver::<TestBackend>::new(config, Default::default());
        let outcome = driver.run().unwrap();

        assert!(outcome.test.is_none());
    }
}
