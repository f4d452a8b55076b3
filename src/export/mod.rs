//! Export functionality for training runs
//!
//! This module provides the file writers that sit downstream of the snapshot stream:
//! per-episode metrics as CSV and the final run summary as JSON.

mod metrics_csv;
mod run_summary;

pub use metrics_csv::{METRICS_HEADER, MetricsCsvObserver};
pub use run_summary::{RunSummary, SummaryStats};
