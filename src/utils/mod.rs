//! Shared utilities: errors, logging, chart rendering

pub mod charts;
pub mod error;
pub mod logging;
