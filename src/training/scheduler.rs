//! Piecewise-Constant Learning-Rate Schedule
//!
//! The learning rate is a step function of the epoch index: `values[0]`
//! before the first boundary, `values[i]` from `boundaries[i-1]` up to (but
//! not including) `boundaries[i]`, and the last value from the last boundary
//! onward.

use crate::config::ScheduleConfig;
use crate::utils::error::Result;

/// A piecewise-constant step schedule over epochs
#[derive(Debug, Clone)]
pub struct PiecewiseConstant {
    boundaries: Vec<usize>,
    values: Vec<f64>,
}

impl PiecewiseConstant {
    /// Build a schedule from a validated configuration
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            boundaries: config.boundaries.clone(),
            values: config.values.clone(),
        })
    }

    /// Learning rate for a given (zero-based) epoch
    pub fn lr_at(&self, epoch: usize) -> f64 {
        for (i, boundary) in self.boundaries.iter().enumerate() {
            if epoch < *boundary {
                return self.values[i];
            }
        }

        *self.values.last().expect("schedule has at least one value")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_schedule() -> PiecewiseConstant {
        PiecewiseConstant::from_config(&ScheduleConfig::default()).unwrap()
    }

    #[test]
    fn test_rate_before_first_boundary() {
        let schedule = default_schedule();
        assert_eq!(schedule.lr_at(0), 1e-3);
        assert_eq!(schedule.lr_at(99), 1e-3);
    }

    #[test]
    fn test_rate_between_boundaries() {
        let schedule = default_schedule();
        assert_eq!(schedule.lr_at(100), 5e-4);
        assert_eq!(schedule.lr_at(199), 5e-4);
    }

    #[test]
    fn test_rate_after_last_boundary() {
        let schedule = default_schedule();
        assert_eq!(schedule.lr_at(200), 1e-4);
        assert_eq!(schedule.lr_at(10_000), 1e-4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ScheduleConfig {
            boundaries: vec![10],
            values: vec![1e-3],
        };
        assert!(PiecewiseConstant::from_config(&config).is_err());
    }

    #[test]
    fn test_single_value_no_boundaries() {
        let config = ScheduleConfig {
            boundaries: vec![],
            values: vec![2e-3],
        };
        let schedule = PiecewiseConstant::from_config(&config).unwrap();
        assert_eq!(schedule.lr_at(0), 2e-3);
        assert_eq!(schedule.lr_at(500), 2e-3);
    }
}
