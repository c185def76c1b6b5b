//! Best-Checkpoint Policy
//!
//! The checkpoint on disk always holds the weights from the epoch with the
//! best validation accuracy so far. The first epoch establishes the baseline
//! without writing; every strict improvement after that overwrites the file.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use tracing::info;

use crate::utils::error::{CarVisionError, Result};

/// Tracks the best validation metric and decides when to checkpoint
#[derive(Debug, Clone)]
pub struct BestTracker {
    best: Option<f64>,
    saves: usize,
}

impl Default for BestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BestTracker {
    pub fn new() -> Self {
        Self {
            best: None,
            saves: 0,
        }
    }

    /// Observe a new metric value; returns true when a checkpoint is due
    ///
    /// The first value only sets the baseline. Later values trigger a save
    /// on strict improvement.
    pub fn observe(&mut self, value: f64) -> bool {
        match self.best {
            None => {
                self.best = Some(value);
                false
            }
            Some(best) if value > best => {
                self.best = Some(value);
                self.saves += 1;
                true
            }
            Some(_) => false,
        }
    }

    /// Best value seen so far
    pub fn best(&self) -> Option<f64> {
        self.best
    }

    /// Number of checkpoints triggered
    pub fn saves(&self) -> usize {
        self.saves
    }
}

/// Persist model weights, creating parent directories as needed
///
/// The recorder appends its own extension, so `path` is the stem.
pub fn save_model<B: Backend, M: Module<B>>(model: M, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    model
        .save_file(path.to_path_buf(), &CompactRecorder::new())
        .map_err(|e| CarVisionError::Model(format!("failed to save checkpoint: {:?}", e)))?;

    info!("Checkpoint written to {:?}", path);
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_sets_baseline_without_save() {
        let mut tracker = BestTracker::new();
        assert!(!tracker.observe(0.5));
        assert_eq!(tracker.best(), Some(0.5));
        assert_eq!(tracker.saves(), 0);
    }

    #[test]
    fn test_saves_only_on_strict_improvement() {
        let mut tracker = BestTracker::new();

        let decisions: Vec<bool> = [0.5, 0.6, 0.55, 0.7]
            .iter()
            .map(|&v| tracker.observe(v))
            .collect();

        assert_eq!(decisions, vec![false, true, false, true]);
        assert_eq!(tracker.saves(), 2);
        assert_eq!(tracker.best(), Some(0.7));
    }

    #[test]
    fn test_equal_value_does_not_save() {
        let mut tracker = BestTracker::new();
        tracker.observe(0.6);
        assert!(!tracker.observe(0.6));
        assert_eq!(tracker.saves(), 0);
    }

    #[test]
    fn test_save_model_creates_parents() {
        use crate::model::ExtractorConfig;
        use burn::backend::NdArray;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model");

        let device = Default::default();
        let model = ExtractorConfig::new()
            .with_base_filters(4)
            .init::<NdArray>(&device);

        save_model(model, &path).unwrap();
        assert!(path.with_extension("mpk").exists());
    }
}
