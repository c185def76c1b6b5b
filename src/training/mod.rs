//! Training pipeline
//!
//! - [`scheduler`]: piecewise-constant learning-rate schedule
//! - [`metrics`]: per-epoch records, accuracy and top-2 accuracy
//! - [`checkpoint`]: best-so-far tracking and model persistence
//! - [`driver`]: the fit loop tying feeds, model, optimizer and charts together

pub mod checkpoint;
pub mod driver;
pub mod metrics;
pub mod scheduler;

pub use checkpoint::BestTracker;
pub use driver::{TestReport, TrainingDriver, TrainingOutcome};
pub use metrics::{EpochRecord, MetricAccumulator, TrainingHistory};
pub use scheduler::PiecewiseConstant;
