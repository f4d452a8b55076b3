//! Gridworld environment
//!
//! This module provides the transition model, the goal-distance feature mappers used by
//! the state-value learner, and goal layout helpers.

pub mod env;
pub mod features;
pub mod goals;

pub use env::{GridWorld, StepOutcome, default_max_steps, scaled_step_penalty};
pub use features::{DistanceBands3, FeatureMapper, ThresholdBands, mapper_for};
pub use goals::{default_goal_reward, place_evenly, reshuffle, sanitize_goals};
