//! Train command - Train a tabular agent on the gridworld

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, ValueEnum};

use crate::{
    cli::{
        config::load_config,
        output::{EpisodePrinter, print_kv, print_section, print_value_table},
    },
    config::{Algorithm, Config, Estimator, MAX_GRID_SIDE},
    export::{MetricsCsvObserver, RunSummary},
    pipeline::{CancelToken, JsonlObserver, ObserverSet, ProgressObserver, Trainer},
    types::{Goal, Position, SlipTile},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EstimatorArg {
    /// Q(s, a) per cell and action
    ActionValue,
    /// V(s, band) per cell and goal-distance band (montecarlo only)
    StateValue,
}

impl From<EstimatorArg> for Estimator {
    fn from(value: EstimatorArg) -> Self {
        match value {
            EstimatorArg::ActionValue => Estimator::ActionValue,
            EstimatorArg::StateValue => Estimator::StateValue,
        }
    }
}

pub(crate) fn parse_algorithm(value: &str) -> std::result::Result<Algorithm, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "montecarlo" | "monte-carlo" | "monte_carlo" | "mc" | "q-learning" | "qlearning"
        | "q_learning" | "q" | "sarsa" => Ok(Algorithm::from_name(value)),
        other => Err(format!(
            "unsupported algorithm '{other}' (expected montecarlo, q-learning, or sarsa)"
        )),
    }
}

#[derive(Parser, Debug)]
#[command(about = "Train an agent on the gridworld", allow_negative_numbers = true)]
pub struct TrainArgs {
    /// Load the base configuration from a JSON file; flags override its fields
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Number of training episodes
    #[arg(long, short = 'e')]
    pub episodes: Option<usize>,

    /// Deterministic seed (0 selects the default)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Training algorithm (montecarlo, q-learning, sarsa)
    #[arg(long, short = 'a', value_parser = parse_algorithm)]
    pub algorithm: Option<Algorithm>,

    /// Value estimator for montecarlo
    #[arg(long, value_enum)]
    pub estimator: Option<EstimatorArg>,

    /// Exploration rate (0-1)
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Minimum exploration rate
    #[arg(long)]
    pub epsilon_min: Option<f64>,

    /// Per-episode decay multiplier (0 disables decay)
    #[arg(long)]
    pub epsilon_decay: Option<f64>,

    /// Learning rate (0-1)
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Discount factor (0-1)
    #[arg(long)]
    pub gamma: Option<f64>,

    /// Eligibility trace decay (0-1), reserved
    #[arg(long)]
    pub lambda: Option<f64>,

    /// Grid rows
    #[arg(long)]
    pub rows: Option<usize>,

    /// Grid columns
    #[arg(long)]
    pub cols: Option<usize>,

    /// Per-step delay in milliseconds
    #[arg(long)]
    pub step_delay: Option<u64>,

    /// Maximum steps per episode (0 uses the grid-derived default)
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Goal as row,col,reward (repeatable)
    #[arg(long = "goal")]
    pub goals: Vec<Goal>,

    /// Number of auto-placed goals (0 keeps manual goals)
    #[arg(long)]
    pub goal_count: Option<usize>,

    /// Episodes between auto-goal reshuffles (0 keeps the layout)
    #[arg(long)]
    pub goal_interval: Option<usize>,

    /// Wall tile at row,col (repeatable)
    #[arg(long = "wall")]
    pub walls: Vec<Position>,

    /// Slip tile as row,col,probability (repeatable)
    #[arg(long = "slip")]
    pub slips: Vec<SlipTile>,

    /// Per-step penalty before board-size scaling
    #[arg(long)]
    pub step_penalty: Option<f64>,

    /// Montecarlo episodes using the warmup step penalty (0 disables)
    #[arg(long)]
    pub warmup_episodes: Option<usize>,

    /// Step penalty during warmup episodes
    #[arg(long)]
    pub warmup_step_penalty: Option<f64>,

    /// Randomize the start cell every episode
    #[arg(long)]
    pub random_start: bool,

    /// Log the first montecarlo episode trajectory
    #[arg(long)]
    pub dump_trajectory: bool,

    /// Log a visit heatmap after every episode
    #[arg(long)]
    pub trace_visits: bool,

    /// Softmax action selection (state-value estimator only)
    #[arg(long)]
    pub softmax: bool,

    /// Initial softmax temperature
    #[arg(long)]
    pub softmax_temp: Option<f64>,

    /// Minimum softmax temperature
    #[arg(long)]
    pub softmax_min_temp: Option<f64>,

    /// Comma-separated distance thresholds for the feature bands
    #[arg(long, value_delimiter = ',')]
    pub feature_thresholds: Vec<f64>,

    /// Write per-episode metrics to CSV at path
    #[arg(long)]
    pub metrics_csv: Option<PathBuf>,

    /// Write the final run summary as JSON at path
    #[arg(long)]
    pub run_json: Option<PathBuf>,

    /// Write one JSON line per finished episode at path
    #[arg(long)]
    pub observations: Option<PathBuf>,

    /// Show a progress bar instead of per-episode lines
    #[arg(long)]
    pub progress: bool,

    /// Suppress per-episode lines
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl TrainArgs {
    /// Merge the flags over the base configuration.
    pub fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };

        macro_rules! override_field {
            ($($field:ident = $arg:expr),* $(,)?) => {
                $(if let Some(value) = $arg {
                    config.$field = value;
                })*
            };
        }
        override_field!(
            episodes = self.episodes,
            seed = self.seed,
            algorithm = self.algorithm,
            estimator = self.estimator.map(Estimator::from),
            epsilon = self.epsilon,
            epsilon_min = self.epsilon_min,
            epsilon_decay = self.epsilon_decay,
            alpha = self.alpha,
            gamma = self.gamma,
            lambda = self.lambda,
            rows = self.rows,
            cols = self.cols,
            step_delay_ms = self.step_delay,
            max_steps = self.max_steps,
            goal_count = self.goal_count,
            goal_interval = self.goal_interval,
            step_penalty = self.step_penalty,
            warmup_episodes = self.warmup_episodes,
            warmup_step_penalty = self.warmup_step_penalty,
            softmax_temperature = self.softmax_temp,
            softmax_min_temperature = self.softmax_min_temp,
        );

        if !self.goals.is_empty() {
            config.goals = self.goals.clone();
        }
        if !self.walls.is_empty() {
            config.walls = self.walls.clone();
        }
        if !self.slips.is_empty() {
            config.slips = self.slips.clone();
        }
        if !self.feature_thresholds.is_empty() {
            config.feature_thresholds = self.feature_thresholds.clone();
        }
        config.random_start |= self.random_start;
        config.dump_trajectory |= self.dump_trajectory;
        config.trace_visits |= self.trace_visits;
        config.softmax |= self.softmax;

        validate(&config)?;
        Ok(config)
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{name} must be between 0 and 1 (got {value:.2})");
    }
    Ok(())
}

/// Like [`check_unit`] but zero is rejected as well.
fn check_positive_unit(name: &str, value: f64) -> Result<()> {
    if value.is_nan() || value <= 0.0 || value > 1.0 {
        bail!("{name} must be greater than 0 and at most 1 (got {value:.2})");
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("{name} must be finite and non-negative (got {value:.4})");
    }
    Ok(())
}

/// Reject values the library would otherwise silently replace.
pub fn validate(config: &Config) -> Result<()> {
    if config.episodes == 0 {
        bail!("episodes must be positive (got 0)");
    }
    if config.rows == 0 || config.cols == 0 {
        bail!(
            "rows and cols must be positive (got {}x{})",
            config.rows,
            config.cols
        );
    }
    if config.rows > MAX_GRID_SIDE || config.cols > MAX_GRID_SIDE {
        bail!(
            "rows and cols must be at most {MAX_GRID_SIDE} (got {}x{})",
            config.rows,
            config.cols
        );
    }
    check_positive_unit("epsilon", config.epsilon)?;
    if !(0.0..=config.epsilon).contains(&config.epsilon_min) {
        bail!(
            "epsilon-min must be between 0 and epsilon (got {:.2})",
            config.epsilon_min
        );
    }
    check_non_negative("epsilon-decay", config.epsilon_decay)?;
    check_positive_unit("alpha", config.alpha)?;
    check_positive_unit("gamma", config.gamma)?;
    check_unit("lambda", config.lambda)?;
    check_non_negative("step-penalty", config.step_penalty)?;
    check_non_negative("warmup-step-penalty", config.warmup_step_penalty)?;
    if !config.softmax_temperature.is_finite() || config.softmax_temperature <= 0.0 {
        bail!(
            "softmax-temp must be positive (got {:.2})",
            config.softmax_temperature
        );
    }
    check_non_negative("softmax-min-temp", config.softmax_min_temperature)?;
    if config.softmax_min_temperature > config.softmax_temperature {
        return Err(anyhow!("softmax-min-temp must be <= softmax-temp"));
    }
    Ok(())
}

/// Execute the train command
pub fn execute(args: TrainArgs) -> Result<()> {
    let config = args.to_config()?;
    let mut trainer = Trainer::new(config);

    let effective = trainer.config();
    print_section("Training gridworld agent");
    print_kv("Algorithm", effective.algorithm.as_str());
    print_kv("Grid", &format!("{}x{}", effective.rows, effective.cols));
    print_kv("Episodes", &effective.episodes.to_string());
    print_kv("Seed", &effective.seed.to_string());
    print_kv(
        "Epsilon",
        &format!(
            "{:.2} (min {:.2}, decay {:.3})",
            effective.epsilon, effective.epsilon_min, effective.epsilon_decay
        ),
    );
    print_kv(
        "Alpha / gamma",
        &format!("{:.2} / {:.2}", effective.alpha, effective.gamma),
    );
    print_kv(
        "Step penalty",
        &format!("{:.3} (effective)", effective.step_penalty),
    );
    print_kv("Max steps", &effective.max_steps.to_string());
    print_kv(
        "Goals",
        &effective
            .goals
            .iter()
            .map(|g| format!("({},{})={:.2}", g.row, g.col, g.reward))
            .collect::<Vec<_>>()
            .join(" "),
    );
    println!();

    let mut observers = ObserverSet::new();
    if args.progress {
        observers.push(Box::new(ProgressObserver::new()));
    } else if !args.quiet {
        observers.push(Box::new(EpisodePrinter));
    }
    if let Some(path) = &args.metrics_csv {
        let csv = MetricsCsvObserver::create(path)
            .with_context(|| format!("Failed to create metrics CSV: {}", path.display()))?;
        observers.push(Box::new(csv));
    }
    if let Some(path) = &args.observations {
        observers.push(Box::new(JsonlObserver::new(path)?));
    }

    let result = trainer
        .run(&mut observers, &CancelToken::new())
        .context("Training failed")?;
    if result.cancelled {
        println!("training cancelled");
        return Ok(());
    }

    println!(
        "summary: avg_reward={:.2} avg_steps={:.2} success_rate={:.2}",
        result.avg_reward, result.avg_steps, result.success_rate
    );
    print_value_table(&trainer.value_map());

    if let Some(path) = &args.run_json {
        RunSummary::new(trainer.config().clone(), &result)
            .save(path)
            .with_context(|| format!("Failed to write run summary: {}", path.display()))?;
        println!("\nRun summary saved to: {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> TrainArgs {
        let mut argv = vec!["train"];
        argv.extend_from_slice(args);
        TrainArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&[
            "--episodes",
            "12",
            "--algorithm",
            "q-learning",
            "--goal",
            "0,3,2.5",
            "--wall",
            "1,1",
            "--slip",
            "2,2,0.3",
            "--feature-thresholds",
            "1,3,5",
            "--random-start",
        ]);
        let config = args.to_config().unwrap();
        assert_eq!(config.episodes, 12);
        assert_eq!(config.algorithm, Algorithm::QLearning);
        assert_eq!(config.goals, vec![Goal::new(0, 3, 2.5)]);
        assert_eq!(config.walls, vec![Position::new(1, 1)]);
        assert_eq!(config.slips.len(), 1);
        assert_eq!(config.feature_thresholds, vec![1.0, 3.0, 5.0]);
        assert!(config.random_start);
        assert_eq!(config.gamma, Config::default().gamma);
    }

    #[test]
    fn test_unknown_algorithm_is_rejected() {
        let parsed = TrainArgs::try_parse_from(["train", "--algorithm", "dqn"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_malformed_goal_is_rejected() {
        let parsed = TrainArgs::try_parse_from(["train", "--goal", "0,3"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let err = parse(&["--epsilon", "1.5"]).to_config().unwrap_err();
        assert!(err.to_string().contains("epsilon"));
        let err = parse(&["--episodes", "0"]).to_config().unwrap_err();
        assert!(err.to_string().contains("episodes"));
        let err = parse(&["--softmax-temp", "0.5", "--softmax-min-temp", "0.9"])
            .to_config()
            .unwrap_err();
        assert!(err.to_string().contains("softmax-min-temp"));
    }

    #[test]
    fn test_validation_rejects_values_the_library_would_replace() {
        for (flag, value) in [
            ("--epsilon", "0"),
            ("--alpha", "0"),
            ("--gamma", "0"),
            ("--epsilon-decay", "inf"),
            ("--step-penalty", "inf"),
            ("--warmup-step-penalty", "NaN"),
            ("--softmax-temp", "inf"),
            ("--rows", "100000"),
        ] {
            let err = parse(&[flag, value]).to_config().unwrap_err();
            let name = flag.trim_start_matches("--");
            assert!(
                err.to_string().contains(name),
                "{flag} {value}: unexpected error {err}"
            );
        }
    }

    #[test]
    fn test_validation_accepts_boundary_values() {
        let config = parse(&[
            "--epsilon",
            "1",
            "--epsilon-min",
            "0",
            "--lambda",
            "0",
            "--step-penalty",
            "0",
        ])
        .to_config()
        .unwrap();
        assert_eq!(config.epsilon, 1.0);
        assert_eq!(config.lambda, 0.0);
        assert_eq!(config.step_penalty, 0.0);
    }
}
