//! Tabular reinforcement learning on a gridworld
//!
//! This crate provides:
//! - A bounded grid environment with walls, slip tiles, and collectible goals
//! - Action-value and banded state-value tables with Monte Carlo, Q-learning, and SARSA
//!   updates
//! - An epsilon-greedy policy with visit-count tie-breaking and a softmax variant
//! - A trainer that streams per-step and per-episode snapshots to observers, with
//!   cooperative cancellation and a threaded, backpressured stream
//! - CSV and JSON exporters and the `gridrl` command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod gridworld;
pub mod learning;
pub mod pipeline;
pub mod ports;
pub mod types;

pub use config::{Algorithm, Config, Estimator};
pub use error::{Error, Result};
pub use export::{MetricsCsvObserver, RunSummary};
pub use gridworld::{FeatureMapper, GridWorld, StepOutcome};
pub use learning::{Policy, QTable, ValueTable};
pub use pipeline::{
    CancelToken, ChannelObserver, JsonlObserver, MetricsObserver, ObserverSet,
    ProgressObserver, Snapshot, Status, Trainer, TrainerState, TrainingResult, TrainingStream,
};
pub use ports::{NullObserver, Observer};
pub use types::{Action, Goal, Position, SlipTile, Tile};
