//! Training pipeline for tabular gridworld agents

use std::{fmt::Write as _, time::Duration};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::{
    cancel::CancelToken,
    snapshot::{Snapshot, Status},
};
use crate::{
    Result,
    config::{Algorithm, Config, Estimator},
    gridworld::{
        FeatureMapper, GridWorld, mapper_for, place_evenly, reshuffle, sanitize_goals,
        scaled_step_penalty,
    },
    learning::{Estimates, Policy, QTable, ValueTable},
    ports::Observer,
    types::{Action, NUM_ACTIONS, Position},
};

/// Weight of the potential-based shaping term added to every step reward.
const SHAPING_WEIGHT: f64 = 0.1;

/// Lifecycle of a [`Trainer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Idle,
    RunningEpisode,
    Done,
    Cancelled,
}

impl TrainerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrainerState::Done | TrainerState::Cancelled)
    }
}

/// Result of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub episodes_completed: usize,
    pub success_count: usize,
    pub total_reward: f64,
    pub total_steps: usize,
    pub success_rate: f64,
    pub avg_reward: f64,
    pub avg_steps: f64,
    /// Whether cancellation preempted the run
    pub cancelled: bool,
}

impl TrainingResult {
    /// Create a new training result; rates are taken over completed episodes
    pub fn new(
        episodes_completed: usize,
        success_count: usize,
        total_reward: f64,
        total_steps: usize,
        cancelled: bool,
    ) -> Self {
        let per_episode = |value: f64| {
            if episodes_completed > 0 {
                value / episodes_completed as f64
            } else {
                0.0
            }
        };
        Self {
            episodes_completed,
            success_count,
            total_reward,
            total_steps,
            success_rate: per_episode(success_count as f64),
            avg_reward: per_episode(total_reward),
            avg_steps: per_episode(total_steps as f64),
            cancelled,
        }
    }
}

/// The value store selected by the configured estimator.
#[derive(Debug)]
enum Store {
    ActionValues(QTable),
    StateValues {
        table: ValueTable,
        mapper: Box<dyn FeatureMapper>,
    },
}

impl Store {
    fn estimates(&self) -> Estimates<'_> {
        match self {
            Store::ActionValues(table) => Estimates::ActionValues(table),
            Store::StateValues { table, mapper } => Estimates::StateValues {
                table,
                mapper: mapper.as_ref(),
            },
        }
    }

    fn value_map(&self) -> Vec<Vec<f64>> {
        match self {
            Store::ActionValues(table) => table.state_values(),
            Store::StateValues { table, .. } => table.clone_data(),
        }
    }
}

/// One buffered Monte Carlo step.
#[derive(Debug, Clone, Copy)]
struct Visit {
    position: Position,
    band: usize,
    action: Action,
    reward: f64,
}

/// Counters of the episode in progress.
#[derive(Debug, Clone, Copy)]
struct EpisodeProgress {
    episode: usize,
    steps: usize,
    reward: f64,
    last_reward: f64,
}

impl EpisodeProgress {
    fn new(episode: usize) -> Self {
        Self {
            episode,
            steps: 0,
            reward: 0.0,
            last_reward: 0.0,
        }
    }

    fn record(&mut self, reward: f64) {
        self.steps += 1;
        self.reward += reward;
        self.last_reward = reward;
    }
}

enum EpisodeEnd {
    Completed,
    Cancelled(EpisodeProgress),
}

/// Runs episodes of the configured algorithm and reports a [`Snapshot`] after every step
/// and every episode.
///
/// The trainer exclusively owns the environment, the policy, and the active store. A run
/// always closes with exactly one terminal snapshot (`Done` or `Cancelled`) unless the
/// configuration asks for zero episodes, in which case nothing is emitted.
///
/// ```no_run
/// use gridrl::{CancelToken, Config, MetricsObserver, Trainer};
///
/// let mut trainer = Trainer::new(Config::default().with_episodes(20));
/// let mut metrics = MetricsObserver::new();
/// let result = trainer.run(&mut metrics, &CancelToken::new())?;
/// println!("success rate {:.2}", result.success_rate);
/// # Ok::<(), gridrl::Error>(())
/// ```
#[derive(Debug)]
pub struct Trainer {
    config: Config,
    base_step_penalty: f64,
    env: GridWorld,
    policy: Policy,
    store: Store,
    rng: StdRng,
    state: TrainerState,
    /// Cell visits of the current episode, row-major
    heatmap: Vec<u32>,
    step: usize,
    success_count: usize,
    episodes_completed: usize,
    total_reward: f64,
    total_steps: usize,
}

impl Trainer {
    /// Build a trainer from a configuration, normalizing it first.
    ///
    /// Explicit goals are sanitized; with `goal_count > 0` (or when no explicit goal
    /// survives) goals are placed evenly instead. The step penalty is rescaled to the
    /// board size and stored back into the effective configuration.
    pub fn new(config: Config) -> Self {
        let mut config = config.sanitized();
        let (rows, cols) = (config.rows, config.cols);

        let goals = if config.goal_count > 0 {
            place_evenly(rows, cols, config.goal_count)
        } else {
            let kept = sanitize_goals(&config.goals, rows, cols);
            if kept.is_empty() {
                place_evenly(rows, cols, 0)
            } else {
                kept
            }
        };
        config.goals = goals.clone();

        let base_step_penalty = scaled_step_penalty(rows, cols, config.step_penalty);
        config.step_penalty = base_step_penalty;

        let mut env = GridWorld::new(
            rows,
            cols,
            goals,
            base_step_penalty,
            config.max_steps,
            config.seed.wrapping_add(1),
        );
        for wall in &config.walls {
            env.set_wall(*wall);
        }
        for slip in &config.slips {
            env.set_slip(Position::new(slip.row, slip.col), slip.probability);
        }
        config.max_steps = env.max_steps();

        let store = match config.estimator {
            Estimator::ActionValue => {
                Store::ActionValues(QTable::new(rows, cols, config.alpha, config.gamma))
            }
            Estimator::StateValue => {
                let mapper = mapper_for(&config.feature_thresholds);
                let features = mapper.num_features(rows, cols);
                Store::StateValues {
                    table: ValueTable::new(rows, cols, features, config.alpha),
                    mapper,
                }
            }
        };

        let mut policy = Policy::new(rows, cols, config.epsilon);
        if config.softmax {
            policy.set_temperature(Some(config.softmax_temperature));
        }

        Self {
            rng: StdRng::seed_from_u64(config.seed),
            heatmap: vec![0; rows * cols],
            config,
            base_step_penalty,
            env,
            policy,
            store,
            state: TrainerState::Idle,
            step: 0,
            success_count: 0,
            episodes_completed: 0,
            total_reward: 0.0,
            total_steps: 0,
        }
    }

    /// Effective configuration, including the current epsilon and goal layout.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn environment(&self) -> &GridWorld {
        &self.env
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Action-value store, when the action-value estimator is active.
    pub fn q_table(&self) -> Option<&QTable> {
        match &self.store {
            Store::ActionValues(table) => Some(table),
            Store::StateValues { .. } => None,
        }
    }

    /// State-value store, when the state-value estimator is active.
    pub fn value_table(&self) -> Option<&ValueTable> {
        match &self.store {
            Store::StateValues { table, .. } => Some(table),
            Store::ActionValues(_) => None,
        }
    }

    /// Row-major value projection of the active store.
    pub fn value_map(&self) -> Vec<Vec<f64>> {
        self.store.value_map()
    }

    pub fn result(&self) -> TrainingResult {
        TrainingResult::new(
            self.episodes_completed,
            self.success_count,
            self.total_reward,
            self.total_steps,
            self.state == TrainerState::Cancelled,
        )
    }

    /// Run every configured episode, reporting snapshots to `observer`.
    ///
    /// `cancel` is polled at every episode and step boundary and interrupts the per-step
    /// delay. An observer error stops the run and is returned as is; table updates
    /// already applied are kept. Calling `run` on a finished trainer returns its result
    /// without emitting anything.
    pub fn run(
        &mut self,
        observer: &mut dyn Observer,
        cancel: &CancelToken,
    ) -> Result<TrainingResult> {
        if self.state.is_terminal() {
            warn!(state = ?self.state, "trainer already finished, not running again");
            return Ok(self.result());
        }

        info!(
            algorithm = %self.config.algorithm,
            episodes = self.config.episodes,
            rows = self.config.rows,
            cols = self.config.cols,
            seed = self.config.seed,
            goals = self.config.goals.len(),
            "starting training run"
        );
        observer.on_run_start(&self.config)?;

        let mut terminal = None;
        for episode in 1..=self.config.episodes {
            if cancel.is_cancelled() {
                terminal = Some((EpisodeProgress::new(episode), Status::Cancelled));
                break;
            }
            self.state = TrainerState::RunningEpisode;
            if let EpisodeEnd::Cancelled(progress) =
                self.run_episode(episode, observer, cancel)?
            {
                terminal = Some((progress, Status::Cancelled));
                break;
            }
            self.decay_exploration();
        }
        if terminal.is_none() && self.config.episodes > 0 {
            terminal = Some((EpisodeProgress::new(self.config.episodes), Status::Done));
        }

        self.state = match terminal {
            Some((_, Status::Cancelled)) => TrainerState::Cancelled,
            _ => TrainerState::Done,
        };
        if let Some((progress, status)) = terminal {
            let snapshot = self.snapshot(&progress, status);
            observer.on_snapshot(&snapshot)?;
            observer.on_run_end(&snapshot)?;
        }

        let result = self.result();
        info!(
            episodes = result.episodes_completed,
            successes = result.success_count,
            success_rate = result.success_rate,
            avg_reward = result.avg_reward,
            cancelled = result.cancelled,
            "training run finished"
        );
        Ok(result)
    }

    fn run_episode(
        &mut self,
        episode: usize,
        observer: &mut dyn Observer,
        cancel: &CancelToken,
    ) -> Result<EpisodeEnd> {
        let monte_carlo = self.config.algorithm == Algorithm::MonteCarlo;
        if monte_carlo {
            self.policy.reset_visits();
            let penalty = if self.in_warmup(episode) {
                self.config.warmup_step_penalty
            } else {
                self.base_step_penalty
            };
            self.env.set_step_penalty(penalty);
            self.config.step_penalty = penalty;
        }
        if self.reshuffle_due(episode) {
            let goals = reshuffle(
                self.config.rows,
                self.config.cols,
                self.config.goal_count,
                Some(self.env.start()),
                self.env.initial_goals(),
                &mut self.rng,
            );
            debug!(episode, goals = ?goals, "reshuffled goals");
            self.env.set_goals(goals.clone());
            self.config.goals = goals;
        }

        self.env.reset();
        if self.config.random_start {
            let start = Position::new(
                self.rng.random_range(0..self.config.rows),
                self.rng.random_range(0..self.config.cols),
            );
            self.env.set_position(start);
        }
        self.heatmap.fill(0);
        self.record_cell_visit(self.env.position());

        let mut progress = EpisodeProgress::new(episode);
        let mut trajectory = Vec::new();
        let mut reached_goals = false;
        let mut state = self.env.position();
        let mut action = self.choose_action();

        loop {
            if cancel.is_cancelled() {
                return Ok(EpisodeEnd::Cancelled(progress));
            }

            let band = self.band_at(state);
            let previous_distance = self.env.potential(state);
            let outcome = self.env.step(action);
            let next = outcome.position;
            let reward = outcome.reward
                + SHAPING_WEIGHT * (previous_distance - self.env.potential(next));
            if outcome.done && self.env.all_goals_collected() {
                reached_goals = true;
            }
            progress.record(reward);
            self.step += 1;

            let next_action = match self.config.algorithm {
                Algorithm::QLearning => {
                    if let Store::ActionValues(table) = &mut self.store {
                        table.q_learning_update(state, action, reward, next, outcome.done);
                    }
                    None
                }
                Algorithm::Sarsa => {
                    let next_action = (!outcome.done).then(|| self.choose_action());
                    if let Store::ActionValues(table) = &mut self.store {
                        table.sarsa_update(
                            state,
                            action,
                            reward,
                            next,
                            next_action.unwrap_or(action),
                            outcome.done,
                        );
                    }
                    next_action
                }
                Algorithm::MonteCarlo => {
                    trajectory.push(Visit {
                        position: state,
                        band,
                        action,
                        reward,
                    });
                    (!outcome.done).then(|| self.choose_action())
                }
            };
            self.record_cell_visit(next);

            trace!(
                episode,
                step = progress.steps,
                from = %state,
                action = %action,
                to = %next,
                reward,
                done = outcome.done,
                "step"
            );
            observer.on_snapshot(&self.snapshot(&progress, Status::Running))?;

            if self.config.step_delay_ms > 0
                && cancel.wait_timeout(Duration::from_millis(self.config.step_delay_ms))
            {
                return Ok(EpisodeEnd::Cancelled(progress));
            }
            if outcome.done {
                break;
            }
            state = next;
            action = match next_action {
                Some(chosen) => chosen,
                None => self.choose_action(),
            };
        }

        if reached_goals {
            self.success_count += 1;
        }
        if monte_carlo {
            self.apply_returns(&trajectory);
            if self.config.dump_trajectory && episode == 1 {
                info!(trajectory = %format_trajectory(&trajectory), "first episode trajectory");
            }
        }
        self.episodes_completed += 1;
        self.total_reward += progress.reward;
        self.total_steps += progress.steps;

        if self.config.trace_visits {
            debug!(episode, heatmap = %self.format_heatmap(), "visit heatmap");
        }
        debug!(
            episode,
            steps = progress.steps,
            reward = progress.reward,
            success = reached_goals,
            epsilon = self.config.epsilon,
            "episode complete"
        );
        observer.on_snapshot(&self.snapshot(&progress, Status::EpisodeComplete))?;
        Ok(EpisodeEnd::Completed)
    }

    fn choose_action(&mut self) -> Action {
        self.policy
            .act(&self.env, self.store.estimates(), &mut self.rng)
    }

    fn band_at(&self, position: Position) -> usize {
        match &self.store {
            Store::StateValues { mapper, .. } => mapper.index(&self.env, position),
            Store::ActionValues(_) => 0,
        }
    }

    fn in_warmup(&self, episode: usize) -> bool {
        self.config.warmup_episodes > 0
            && episode <= self.config.warmup_episodes
            && self.config.warmup_step_penalty > 0.0
    }

    fn reshuffle_due(&self, episode: usize) -> bool {
        let interval = self.config.goal_interval;
        self.config.goal_count > 0
            && interval > 0
            && (episode == 1 || (episode - 1) % interval == 0)
    }

    /// First-visit backward return over the buffered episode.
    fn apply_returns(&mut self, trajectory: &[Visit]) {
        let gamma = self.config.gamma;
        let cols = self.config.cols;
        let mut episode_return = 0.0;
        match &mut self.store {
            Store::ActionValues(table) => {
                let mut seen = vec![false; table.rows() * table.cols() * NUM_ACTIONS];
                for visit in trajectory.iter().rev() {
                    episode_return = visit.reward + gamma * episode_return;
                    let slot = (visit.position.row * cols + visit.position.col) * NUM_ACTIONS
                        + visit.action.index();
                    if let Some(first) = seen.get_mut(slot).filter(|flag| !**flag) {
                        *first = true;
                        table.monte_carlo_update(visit.position, visit.action, episode_return);
                    }
                }
            }
            Store::StateValues { table, .. } => {
                let features = table.features();
                let mut seen = vec![false; table.rows() * table.cols() * features];
                for visit in trajectory.iter().rev() {
                    episode_return = visit.reward + gamma * episode_return;
                    let slot = (visit.position.row * cols + visit.position.col) * features
                        + visit.band.min(features - 1);
                    if let Some(first) = seen.get_mut(slot).filter(|flag| !**flag) {
                        *first = true;
                        table.monte_carlo_update(visit.position, visit.band, episode_return);
                    }
                }
            }
        }
    }

    fn decay_exploration(&mut self) {
        let decay = self.config.epsilon_decay;
        if decay <= 0.0 {
            return;
        }
        self.config.epsilon = (self.config.epsilon * decay)
            .min(1.0)
            .max(self.config.epsilon_min);
        self.policy.set_epsilon(self.config.epsilon);
        if self.config.softmax {
            self.config.softmax_temperature = (self.config.softmax_temperature * decay)
                .max(self.config.softmax_min_temperature);
            self.policy
                .set_temperature(Some(self.config.softmax_temperature));
        }
    }

    fn record_cell_visit(&mut self, position: Position) {
        let slot = position.row * self.config.cols + position.col;
        if let Some(count) = self.heatmap.get_mut(slot) {
            *count += 1;
        }
    }

    fn format_heatmap(&self) -> String {
        let mut out = String::new();
        for row in self.heatmap.chunks(self.config.cols.max(1)) {
            let line: Vec<String> = row.iter().map(|count| format!("{count:4}")).collect();
            let _ = writeln!(out, "{}", line.join(" "));
        }
        out
    }

    fn snapshot(&self, progress: &EpisodeProgress, status: Status) -> Snapshot {
        Snapshot {
            step: self.step,
            episode: progress.episode,
            episode_steps: progress.steps,
            episode_reward: progress.reward,
            reward: progress.last_reward,
            position: self.env.position(),
            value_map: self.store.value_map(),
            goals: self.env.goals().to_vec(),
            success_count: self.success_count,
            episodes_completed: self.episodes_completed,
            total_reward: self.total_reward,
            total_steps: self.total_steps,
            config: self.config.clone(),
            status,
        }
    }
}

fn format_trajectory(trajectory: &[Visit]) -> String {
    trajectory
        .iter()
        .map(|visit| {
            format!(
                "{} {} b{} r={:.3}",
                visit.position, visit.action, visit.band, visit.reward
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}
