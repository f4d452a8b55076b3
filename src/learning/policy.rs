//! Exploration policy over either value store
//!
//! The policy is epsilon-greedy by default. Exact score ties go to the candidate with the
//! fewest recorded visits, and any remaining tie is broken uniformly at random. With the
//! state-value store a softmax over successor values can replace epsilon-greedy.

use rand::{Rng, rngs::StdRng, seq::IndexedRandom};

use crate::{
    gridworld::{FeatureMapper, GridWorld},
    learning::{q_table::QTable, value_table::ValueTable},
    types::{Action, NUM_ACTIONS, Position},
};

/// The store a decision is scored against.
#[derive(Debug, Clone, Copy)]
pub enum Estimates<'a> {
    /// Score each action by Q at the current cell
    ActionValues(&'a QTable),
    /// Score each action by V at the successor cell, in the successor's distance band
    StateValues {
        table: &'a ValueTable,
        mapper: &'a dyn FeatureMapper,
    },
}

impl Estimates<'_> {
    fn scores(&self, env: &GridWorld) -> [f64; NUM_ACTIONS] {
        let current = env.position();
        let mut scores = [0.0; NUM_ACTIONS];
        for action in Action::ALL {
            scores[action.index()] = match self {
                Estimates::ActionValues(table) => table.get(current, action),
                Estimates::StateValues { table, mapper } => {
                    let next = env.successor(action);
                    table.get(next, mapper.index(env, next))
                }
            };
        }
        scores
    }
}

/// Epsilon-greedy action selector with visit-count tie-breaking.
#[derive(Debug, Clone)]
pub struct Policy {
    rows: usize,
    cols: usize,
    epsilon: f64,
    temperature: Option<f64>,
    /// Visits per (row, col, action) of the cell the action was taken from
    action_visits: Vec<u32>,
    /// Visits per successor cell, used in state-value mode
    cell_visits: Vec<u32>,
}

impl Policy {
    pub fn new(rows: usize, cols: usize, epsilon: f64) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            epsilon: epsilon.clamp(0.0, 1.0),
            temperature: None,
            action_visits: vec![0; rows * cols * NUM_ACTIONS],
            cell_visits: vec![0; rows * cols],
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    /// Enable softmax selection at this temperature; `None` restores epsilon-greedy.
    pub fn set_temperature(&mut self, temperature: Option<f64>) {
        self.temperature = temperature;
    }

    fn cell_slot(&self, position: Position) -> usize {
        position.row.min(self.rows - 1) * self.cols + position.col.min(self.cols - 1)
    }

    pub fn action_visits(&self, position: Position, action: Action) -> u32 {
        self.action_visits[self.cell_slot(position) * NUM_ACTIONS + action.index()]
    }

    pub fn cell_visits(&self, position: Position) -> u32 {
        self.cell_visits[self.cell_slot(position)]
    }

    pub fn reset_visits(&mut self) {
        self.action_visits.fill(0);
        self.cell_visits.fill(0);
    }

    /// Choose an action for the agent's current cell and record the visit.
    pub fn act(&mut self, env: &GridWorld, estimates: Estimates<'_>, rng: &mut StdRng) -> Action {
        let chosen = match (self.temperature, estimates) {
            (Some(temperature), Estimates::StateValues { .. }) => {
                self.softmax_action(env, estimates, temperature, rng)
            }
            _ if rng.random::<f64>() < self.epsilon => {
                Action::from_index(rng.random_range(0..NUM_ACTIONS))
            }
            _ => self.greedy_action(env, estimates, rng),
        };
        self.record_visit(env, estimates, chosen);
        chosen
    }

    /// Highest-scoring action; ties prefer the least visited, then a random pick.
    pub fn greedy_action(
        &self,
        env: &GridWorld,
        estimates: Estimates<'_>,
        rng: &mut StdRng,
    ) -> Action {
        let scores = estimates.scores(env);
        let best = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let tied: Vec<(Action, u32)> = Action::ALL
            .iter()
            .filter(|action| scores[action.index()] == best)
            .map(|&action| (action, self.visits_for(env, estimates, action)))
            .collect();
        let Some(least) = tied.iter().map(|(_, visits)| *visits).min() else {
            return Action::Up;
        };
        let options: Vec<Action> = tied
            .into_iter()
            .filter(|(_, visits)| *visits == least)
            .map(|(action, _)| action)
            .collect();
        options.choose(rng).copied().unwrap_or(Action::Up)
    }

    /// Sample proportionally to `exp(score / temperature)` over successor values.
    ///
    /// Falls back to greedy selection for non-positive temperatures, action-value
    /// estimates, or a degenerate normalization sum.
    pub fn softmax_action(
        &self,
        env: &GridWorld,
        estimates: Estimates<'_>,
        temperature: f64,
        rng: &mut StdRng,
    ) -> Action {
        if temperature <= 0.0 || matches!(estimates, Estimates::ActionValues(_)) {
            return self.greedy_action(env, estimates, rng);
        }
        let mut weights = estimates.scores(env).map(|score| score / temperature);
        let max_score = weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        for weight in &mut weights {
            *weight = (*weight - max_score).exp();
        }
        let sum: f64 = weights.iter().sum();
        if sum == 0.0 || !sum.is_finite() {
            return self.greedy_action(env, estimates, rng);
        }
        let ticket = rng.random::<f64>() * sum;
        let mut cumulative = 0.0;
        for action in Action::ALL {
            cumulative += weights[action.index()];
            if ticket <= cumulative {
                return action;
            }
        }
        self.greedy_action(env, estimates, rng)
    }

    fn visits_for(&self, env: &GridWorld, estimates: Estimates<'_>, action: Action) -> u32 {
        match estimates {
            Estimates::ActionValues(_) => self.action_visits(env.position(), action),
            Estimates::StateValues { .. } => self.cell_visits(env.successor(action)),
        }
    }

    fn record_visit(&mut self, env: &GridWorld, estimates: Estimates<'_>, action: Action) {
        match estimates {
            Estimates::ActionValues(_) => {
                let slot = self.cell_slot(env.position()) * NUM_ACTIONS + action.index();
                self.action_visits[slot] += 1;
            }
            Estimates::StateValues { .. } => {
                let slot = self.cell_slot(env.successor(action));
                self.cell_visits[slot] += 1;
            }
        }
    }
}
