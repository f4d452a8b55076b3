//! Progress records emitted by the trainer

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    types::{Goal, Position},
};

/// Where in the run a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// After every environment step
    Running,
    /// After every finished episode
    EpisodeComplete,
    /// Once, closing a completed run
    Done,
    /// Once, closing a run preempted by cancellation
    Cancelled,
}

impl Status {
    /// Whether this status closes the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Done | Status::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Running => "running",
            Status::EpisodeComplete => "episode_complete",
            Status::Done => "done",
            Status::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable view of training progress.
///
/// Counters are cumulative over the run except `episode_steps`, `episode_reward`, and
/// `reward`, which describe the current episode and its last step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Environment steps taken across the run
    pub step: usize,
    /// 1-based episode index
    pub episode: usize,
    pub episode_steps: usize,
    pub episode_reward: f64,
    /// Reward of the last step
    pub reward: f64,
    pub position: Position,
    /// Row-major value projection of the active store
    pub value_map: Vec<Vec<f64>>,
    /// Goals still live in the current episode
    pub goals: Vec<Goal>,
    pub success_count: usize,
    pub episodes_completed: usize,
    pub total_reward: f64,
    pub total_steps: usize,
    /// Effective configuration, including the current epsilon and goal layout
    pub config: Config,
    pub status: Status,
}
