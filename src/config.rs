//! Training configuration and its normalization rules.
//!
//! A [`Config`] can be built from defaults, from CLI flags, or from JSON. Whatever the
//! source, [`Config::sanitized`] folds every out-of-range value back to a documented
//! default, so the trainer never has to reject input at run time.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{Goal, Position, SlipTile};

/// Learning algorithm driving table updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Algorithm {
    /// First-visit Monte Carlo control over complete episode returns
    #[default]
    MonteCarlo,
    /// Off-policy one-step TD control
    QLearning,
    /// On-policy one-step TD control
    Sarsa,
}

impl Algorithm {
    /// Resolve an algorithm name, falling back to Monte Carlo for anything unrecognized.
    pub fn from_name(name: &str) -> Algorithm {
        match name.trim().to_ascii_lowercase().as_str() {
            "montecarlo" | "monte-carlo" | "monte_carlo" | "mc" | "" => Algorithm::MonteCarlo,
            "q-learning" | "qlearning" | "q_learning" | "q" => Algorithm::QLearning,
            "sarsa" => Algorithm::Sarsa,
            other => {
                warn!(algorithm = other, "unknown algorithm, using montecarlo");
                Algorithm::MonteCarlo
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::MonteCarlo => "montecarlo",
            Algorithm::QLearning => "q-learning",
            Algorithm::Sarsa => "sarsa",
        }
    }

    /// Whether the algorithm bootstraps from one-step targets.
    pub fn is_temporal_difference(&self) -> bool {
        matches!(self, Algorithm::QLearning | Algorithm::Sarsa)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Algorithm {
    fn from(value: String) -> Self {
        Algorithm::from_name(&value)
    }
}

impl From<Algorithm> for String {
    fn from(value: Algorithm) -> Self {
        value.as_str().to_string()
    }
}

/// Which table the learner estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Estimator {
    /// Q(s, a) per cell and action
    #[default]
    ActionValue,
    /// V(s, band) per cell and goal-distance band (Monte Carlo only)
    StateValue,
}

/// Validated hyperparameters for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of episodes; zero produces an empty stream
    pub episodes: usize,
    /// Generator seed; zero is replaced with one
    pub seed: u64,
    /// Current exploration rate
    pub epsilon: f64,
    /// Floor for epsilon decay
    pub epsilon_min: f64,
    /// Per-episode multiplicative decay; zero disables decay
    pub epsilon_decay: f64,
    /// Learning rate α
    pub alpha: f64,
    /// Discount factor γ
    pub gamma: f64,
    /// Eligibility-trace decay λ. Validated but not consumed by any algorithm.
    pub lambda: f64,
    pub rows: usize,
    pub cols: usize,
    /// Delay after each step, in milliseconds
    pub step_delay_ms: u64,
    /// Per-episode step budget; zero selects the grid-derived default
    pub max_steps: usize,
    pub algorithm: Algorithm,
    pub estimator: Estimator,
    /// Explicit goal layout (ignored when `goal_count > 0`)
    pub goals: Vec<Goal>,
    /// Number of auto-placed goals; zero keeps the explicit layout
    pub goal_count: usize,
    /// Episodes between auto-goal reshuffles; zero keeps the layout fixed
    pub goal_interval: usize,
    /// Per-step penalty before board-size scaling
    pub step_penalty: f64,
    /// Monte Carlo episodes that use `warmup_step_penalty` instead
    pub warmup_episodes: usize,
    pub warmup_step_penalty: f64,
    /// Start each episode from a uniformly random cell
    pub random_start: bool,
    /// Log the first Monte Carlo episode's trajectory
    pub dump_trajectory: bool,
    /// Log a visit heatmap after every episode
    pub trace_visits: bool,
    /// Softmax action selection (state-value estimator only)
    pub softmax: bool,
    pub softmax_temperature: f64,
    pub softmax_min_temperature: f64,
    /// Ascending distance thresholds; empty selects the three-band mapper
    pub feature_thresholds: Vec<f64>,
    pub walls: Vec<Position>,
    pub slips: Vec<SlipTile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            episodes: 100,
            seed: 1,
            epsilon: 0.5,
            epsilon_min: 0.05,
            epsilon_decay: 0.998,
            alpha: 0.2,
            gamma: 0.9,
            lambda: 0.9,
            rows: 4,
            cols: 4,
            step_delay_ms: 0,
            max_steps: 0,
            algorithm: Algorithm::MonteCarlo,
            estimator: Estimator::ActionValue,
            goals: Vec::new(),
            goal_count: 0,
            goal_interval: 20,
            step_penalty: 0.02,
            warmup_episodes: 0,
            warmup_step_penalty: 0.0,
            random_start: false,
            dump_trajectory: false,
            trace_visits: false,
            softmax: false,
            softmax_temperature: 1.0,
            softmax_min_temperature: 0.1,
            feature_thresholds: Vec::new(),
            walls: Vec::new(),
            slips: Vec::new(),
        }
    }
}

/// Largest accepted row or column count.
pub const MAX_GRID_SIDE: usize = 1024;

fn in_unit_interval(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value <= 1.0
}

fn non_negative_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

impl Config {
    pub fn with_episodes(mut self, episodes: usize) -> Self {
        self.episodes = episodes;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_grid(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_estimator(mut self, estimator: Estimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_exploration(mut self, epsilon: f64, epsilon_min: f64, epsilon_decay: f64) -> Self {
        self.epsilon = epsilon;
        self.epsilon_min = epsilon_min;
        self.epsilon_decay = epsilon_decay;
        self
    }

    pub fn with_learning(mut self, alpha: f64, gamma: f64) -> Self {
        self.alpha = alpha;
        self.gamma = gamma;
        self
    }

    pub fn with_goals(mut self, goals: Vec<Goal>) -> Self {
        self.goals = goals;
        self
    }

    pub fn with_auto_goals(mut self, count: usize, interval: usize) -> Self {
        self.goal_count = count;
        self.goal_interval = interval;
        self
    }

    pub fn with_step_penalty(mut self, penalty: f64) -> Self {
        self.step_penalty = penalty;
        self
    }

    pub fn with_warmup(mut self, episodes: usize, penalty: f64) -> Self {
        self.warmup_episodes = episodes;
        self.warmup_step_penalty = penalty;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_step_delay_ms(mut self, delay: u64) -> Self {
        self.step_delay_ms = delay;
        self
    }

    pub fn with_random_start(mut self, random_start: bool) -> Self {
        self.random_start = random_start;
        self
    }

    pub fn with_walls(mut self, walls: Vec<Position>) -> Self {
        self.walls = walls;
        self
    }

    pub fn with_slips(mut self, slips: Vec<SlipTile>) -> Self {
        self.slips = slips;
        self
    }

    pub fn with_softmax(mut self, temperature: f64, min_temperature: f64) -> Self {
        self.softmax = true;
        self.softmax_temperature = temperature;
        self.softmax_min_temperature = min_temperature;
        self
    }

    pub fn with_feature_thresholds(mut self, thresholds: Vec<f64>) -> Self {
        self.feature_thresholds = thresholds;
        self
    }

    /// Fold every out-of-range value back to its default.
    ///
    /// Goal sanitation and step-penalty scaling depend on the final grid size and happen
    /// when the trainer is built.
    pub fn sanitized(mut self) -> Config {
        if self.rows == 0 {
            self.rows = 4;
        }
        if self.cols == 0 {
            self.cols = 4;
        }
        if self.rows > MAX_GRID_SIDE || self.cols > MAX_GRID_SIDE {
            warn!(
                rows = self.rows,
                cols = self.cols,
                "grid too large, clamping to {MAX_GRID_SIDE}"
            );
            self.rows = self.rows.min(MAX_GRID_SIDE);
            self.cols = self.cols.min(MAX_GRID_SIDE);
        }
        if self.seed == 0 {
            self.seed = 1;
        }
        if !in_unit_interval(self.gamma) {
            warn!(gamma = self.gamma, "gamma out of range, using 0.9");
            self.gamma = 0.9;
        }
        if !in_unit_interval(self.alpha) {
            warn!(alpha = self.alpha, "alpha out of range, using 0.2");
            self.alpha = 0.2;
        }
        if !in_unit_interval(self.epsilon) {
            warn!(epsilon = self.epsilon, "epsilon out of range, using 0.1");
            self.epsilon = 0.1;
        }
        if !self.epsilon_min.is_finite() || self.epsilon_min < 0.0 || self.epsilon_min > self.epsilon
        {
            self.epsilon_min = 0.0;
        }
        self.epsilon_decay = non_negative_or_zero(self.epsilon_decay);
        self.step_penalty = non_negative_or_zero(self.step_penalty);
        self.warmup_step_penalty = non_negative_or_zero(self.warmup_step_penalty);
        if !self.softmax_temperature.is_finite() || self.softmax_temperature <= 0.0 {
            self.softmax_temperature = 1.0;
        }
        self.softmax_min_temperature =
            non_negative_or_zero(self.softmax_min_temperature).min(self.softmax_temperature);
        if !self.lambda.is_finite() || !(0.0..=1.0).contains(&self.lambda) {
            self.lambda = 0.9;
        }
        if self.algorithm.is_temporal_difference() && self.estimator == Estimator::StateValue {
            warn!(
                algorithm = %self.algorithm,
                "state-value estimator requires montecarlo, using action values"
            );
            self.estimator = Estimator::ActionValue;
        }
        if self.softmax && self.estimator != Estimator::StateValue {
            self.softmax = false;
        }
        self.feature_thresholds.retain(|t| t.is_finite());
        self.feature_thresholds.sort_by(f64::total_cmp);
        let (rows, cols) = (self.rows, self.cols);
        self.walls.retain(|w| w.row < rows && w.col < cols);
        self.slips.retain(|s| s.row < rows && s.col < cols);
        for slip in &mut self.slips {
            slip.probability = if slip.probability.is_finite() {
                slip.probability.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_from_name_falls_back() {
        assert_eq!(Algorithm::from_name("Q-Learning"), Algorithm::QLearning);
        assert_eq!(Algorithm::from_name("sarsa"), Algorithm::Sarsa);
        assert_eq!(Algorithm::from_name("td-lambda"), Algorithm::MonteCarlo);
    }

    #[test]
    fn test_algorithm_serde_uses_names() {
        let json = serde_json::to_string(&Algorithm::QLearning).unwrap();
        assert_eq!(json, "\"q-learning\"");
        let parsed: Algorithm = serde_json::from_str("\"bogus\"").unwrap();
        assert_eq!(parsed, Algorithm::MonteCarlo);
    }

    #[test]
    fn test_sanitize_defaults_out_of_range_values() {
        let config = Config {
            rows: 0,
            cols: 0,
            seed: 0,
            gamma: 1.5,
            alpha: -0.1,
            epsilon: 0.0,
            epsilon_min: 0.5,
            epsilon_decay: -1.0,
            step_penalty: -0.3,
            softmax_temperature: 0.0,
            softmax_min_temperature: 3.0,
            lambda: f64::NAN,
            ..Config::default()
        }
        .sanitized();

        assert_eq!((config.rows, config.cols), (4, 4));
        assert_eq!(config.seed, 1);
        assert_eq!(config.gamma, 0.9);
        assert_eq!(config.alpha, 0.2);
        assert_eq!(config.epsilon, 0.1);
        assert_eq!(config.epsilon_min, 0.0);
        assert_eq!(config.epsilon_decay, 0.0);
        assert_eq!(config.step_penalty, 0.0);
        assert_eq!(config.softmax_temperature, 1.0);
        assert_eq!(config.softmax_min_temperature, 1.0);
        assert_eq!(config.lambda, 0.9);
    }

    #[test]
    fn test_sanitize_forces_action_values_for_td() {
        let config = Config::default()
            .with_algorithm(Algorithm::Sarsa)
            .with_estimator(Estimator::StateValue)
            .with_softmax(0.5, 0.1)
            .sanitized();
        assert_eq!(config.estimator, Estimator::ActionValue);
        assert!(!config.softmax);
    }

    #[test]
    fn test_sanitize_drops_out_of_bounds_tiles() {
        let config = Config::default()
            .with_grid(3, 3)
            .with_walls(vec![Position::new(1, 1), Position::new(3, 0)])
            .with_slips(vec![SlipTile {
                row: 0,
                col: 9,
                probability: 0.5,
            }])
            .sanitized();
        assert_eq!(config.walls, vec![Position::new(1, 1)]);
        assert!(config.slips.is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"episodes": 7, "algorithm": "sarsa"}"#).unwrap();
        assert_eq!(config.episodes, 7);
        assert_eq!(config.algorithm, Algorithm::Sarsa);
        assert_eq!(config.rows, 4);
    }

    #[test]
    fn test_sanitized_clamps_huge_grid() {
        let config = Config::default().with_grid(usize::MAX, 3).sanitized();
        assert_eq!(config.rows, MAX_GRID_SIDE);
        assert_eq!(config.cols, 3);
    }
}
