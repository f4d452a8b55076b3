//! Training pipeline
//!
//! This module provides:
//! - The [`Trainer`] state machine running episodes and emitting [`Snapshot`]s
//! - Cooperative cancellation through [`CancelToken`]
//! - A threaded, backpressured [`TrainingStream`]
//! - Observer adapters for progress, metrics, JSONL export, and fan-out

pub mod cancel;
pub mod observers;
pub mod snapshot;
pub mod stream;
pub mod training;

pub use cancel::CancelToken;
// Re-export observer implementations (adapters)
pub use observers::{
    ChannelObserver, EpisodeRecord, JsonlObserver, MetricsObserver, MetricsSummary,
    ObserverSet, ProgressObserver,
};
pub use snapshot::{Snapshot, Status};
pub use stream::TrainingStream;
pub use training::{Trainer, TrainerState, TrainingResult};

pub use crate::ports::Observer;
