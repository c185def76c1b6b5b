//! Training Metrics
//!
//! Per-epoch loss, accuracy and top-2 accuracy for the training and
//! validation feeds. A sample counts toward top-2 accuracy when its true
//! class is among the two highest-probability predictions.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::{CarVisionError, Result};

/// Metrics for a single epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Zero-based epoch index
    pub epoch: usize,
    /// Average training loss
    pub loss: f64,
    /// Training accuracy in [0, 1]
    pub accuracy: f64,
    /// Training top-2 accuracy in [0, 1]
    pub top2_accuracy: f64,
    /// Average validation loss
    pub val_loss: f64,
    /// Validation accuracy in [0, 1]
    pub val_accuracy: f64,
    /// Validation top-2 accuracy in [0, 1]
    pub val_top2_accuracy: f64,
    /// Learning rate used this epoch
    pub lr: f64,
}

/// The full metric history of a training run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub records: Vec<EpochRecord>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EpochRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Per-epoch training accuracy series
    pub fn accuracies(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.accuracy).collect()
    }

    /// Per-epoch validation accuracy series
    pub fn val_accuracies(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.val_accuracy).collect()
    }

    /// Per-epoch training loss series
    pub fn losses(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.loss).collect()
    }

    /// Per-epoch validation loss series
    pub fn val_losses(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.val_loss).collect()
    }

    /// Best validation accuracy seen so far
    pub fn best_val_accuracy(&self) -> Option<f64> {
        self.records
            .iter()
            .map(|r| r.val_accuracy)
            .fold(None, |best, v| match best {
                Some(b) if b >= v => Some(b),
                _ => Some(v),
            })
    }

    /// Save the history as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CarVisionError::Serialization(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Whether the target class is among the k highest-probability predictions
pub fn top_k_hit(probabilities: &[f32], target: usize, k: usize) -> bool {
    if target >= probabilities.len() {
        return false;
    }

    let target_prob = probabilities[target];
    let strictly_higher = probabilities
        .iter()
        .enumerate()
        .filter(|(i, &p)| *i != target && p > target_prob)
        .count();

    strictly_higher < k
}

/// Streaming accumulator for one pass over a feed
#[derive(Debug, Default)]
pub struct MetricAccumulator {
    loss_sum: f64,
    batches: usize,
    correct: usize,
    top2_correct: usize,
    samples: usize,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one batch: its average loss plus per-sample probability rows
    pub fn observe(&mut self, loss: f64, probabilities: &[Vec<f32>], targets: &[usize]) {
        debug_assert_eq!(probabilities.len(), targets.len());

        self.loss_sum += loss;
        self.batches += 1;

        for (probs, &target) in probabilities.iter().zip(targets) {
            if top_k_hit(probs, target, 1) {
                self.correct += 1;
            }
            if top_k_hit(probs, target, 2) {
                self.top2_correct += 1;
            }
            self.samples += 1;
        }
    }

    /// Average loss across observed batches
    pub fn avg_loss(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.loss_sum / self.batches as f64
        }
    }

    /// Fraction of samples whose top prediction matched
    pub fn accuracy(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.correct as f64 / self.samples as f64
        }
    }

    /// Fraction of samples whose target was in the top two predictions
    pub fn top2_accuracy(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.top2_correct as f64 / self.samples as f64
        }
    }

    /// Number of samples observed
    pub fn samples(&self) -> usize {
        self.samples
    }
}
