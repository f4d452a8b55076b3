//! Dense action-value table for temporal difference and Monte Carlo control

use serde::{Deserialize, Serialize};

use crate::types::{Action, NUM_ACTIONS, Position};

/// Q-table mapping (cell, action) pairs to Q-values
///
/// Values live in one flat row-major arena of `rows × cols × 4` entries. Dimensions are
/// fixed at construction; out-of-range coordinates are clamped on access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QTable {
    rows: usize,
    cols: usize,
    q_values: Vec<f64>,
    /// Learning rate α
    learning_rate: f64,
    /// Discount factor γ
    discount_factor: f64,
}

impl QTable {
    /// Create a zero-initialized Q-table
    pub fn new(rows: usize, cols: usize, learning_rate: f64, discount_factor: f64) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            q_values: vec![0.0; rows.saturating_mul(cols).saturating_mul(NUM_ACTIONS)],
            learning_rate,
            discount_factor,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn index(&self, state: Position, action: Action) -> usize {
        let row = state.row.min(self.rows - 1);
        let col = state.col.min(self.cols - 1);
        (row * self.cols + col) * NUM_ACTIONS + action.index()
    }

    /// Get Q-value for a state-action pair
    pub fn get(&self, state: Position, action: Action) -> f64 {
        self.q_values[self.index(state, action)]
    }

    /// Set Q-value for a state-action pair
    pub fn set(&mut self, state: Position, action: Action, value: f64) {
        let index = self.index(state, action);
        self.q_values[index] = value;
    }

    /// Get maximum Q-value over the four actions
    pub fn max_value(&self, state: Position) -> f64 {
        Action::ALL
            .iter()
            .map(|&action| self.get(state, action))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Per-cell `max_value` projection, row-major
    pub fn state_values(&self) -> Vec<Vec<f64>> {
        (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| self.max_value(Position::new(row, col)))
                    .collect()
            })
            .collect()
    }

    fn move_toward(&mut self, state: Position, action: Action, target: f64) {
        let current_q = self.get(state, action);
        let new_q = current_q + self.learning_rate * (target - current_q);
        self.set(state, action, new_q);
    }

    /// Q-learning update: off-policy TD control
    ///
    /// Q(s,a) ← Q(s,a) + α[r + γ max_a' Q(s',a') - Q(s,a)]
    pub fn q_learning_update(
        &mut self,
        state: Position,
        action: Action,
        reward: f64,
        next_state: Position,
        done: bool,
    ) {
        let max_next_q = if done {
            0.0
        } else {
            self.max_value(next_state)
        };
        self.move_toward(state, action, reward + self.discount_factor * max_next_q);
    }

    /// SARSA update: on-policy TD control
    ///
    /// Q(s,a) ← Q(s,a) + α[r + γ Q(s',a') - Q(s,a)]
    pub fn sarsa_update(
        &mut self,
        state: Position,
        action: Action,
        reward: f64,
        next_state: Position,
        next_action: Action,
        done: bool,
    ) {
        let next_q = if done {
            0.0
        } else {
            self.get(next_state, next_action)
        };
        self.move_toward(state, action, reward + self.discount_factor * next_q);
    }

    /// Monte Carlo update toward an observed return G
    ///
    /// Q(s,a) ← Q(s,a) + α[G - Q(s,a)]
    pub fn monte_carlo_update(&mut self, state: Position, action: Action, episode_return: f64) {
        self.move_toward(state, action, episode_return);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qtable_initialization() {
        let qtable = QTable::new(4, 4, 0.5, 0.99);
        assert_eq!(qtable.get(Position::new(3, 0), Action::Up), 0.0);
        assert_eq!(qtable.state_values(), vec![vec![0.0; 4]; 4]);
    }

    #[test]
    fn test_qtable_set_get_clamps() {
        let mut qtable = QTable::new(2, 2, 0.5, 0.99);
        qtable.set(Position::new(9, 9), Action::Left, 1.5);
        assert_eq!(qtable.get(Position::new(1, 1), Action::Left), 1.5);
    }

    #[test]
    fn test_max_value() {
        let mut qtable = QTable::new(3, 3, 0.5, 0.99);
        let state = Position::new(1, 1);
        qtable.set(state, Action::Up, 0.5);
        qtable.set(state, Action::Right, 1.5);
        qtable.set(state, Action::Down, -0.8);
        assert_eq!(qtable.max_value(state), 1.5);
        assert_eq!(qtable.state_values()[1][1], 1.5);
    }

    #[test]
    fn test_q_learning_update() {
        let mut qtable = QTable::new(3, 3, 0.5, 0.99);
        let state = Position::new(2, 0);
        let next_state = Position::new(1, 0);
        qtable.set(next_state, Action::Up, 1.0);
        qtable.set(next_state, Action::Right, 2.0);

        qtable.q_learning_update(state, Action::Up, 0.0, next_state, false);

        // Q(s,a) = 0.0 + 0.5 * (0.0 + 0.99 * 2.0 - 0.0) = 0.99
        assert!((qtable.get(state, Action::Up) - 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_q_learning_terminal_ignores_bootstrap() {
        let mut qtable = QTable::new(3, 3, 0.5, 0.99);
        let next_state = Position::new(0, 0);
        qtable.set(next_state, Action::Up, 10.0);
        qtable.q_learning_update(Position::new(0, 1), Action::Left, 1.0, next_state, true);
        assert!((qtable.get(Position::new(0, 1), Action::Left) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_sarsa_update() {
        let mut qtable = QTable::new(3, 3, 0.5, 0.99);
        let state = Position::new(2, 0);
        let next_state = Position::new(1, 0);
        qtable.set(next_state, Action::Right, 1.5);
        qtable.set(next_state, Action::Up, 9.0);

        qtable.sarsa_update(state, Action::Up, 0.0, next_state, Action::Right, false);

        // Q(s,a) = 0.0 + 0.5 * (0.0 + 0.99 * 1.5 - 0.0) = 0.7425
        assert!((qtable.get(state, Action::Up) - 0.7425).abs() < 1e-9);
    }

    #[test]
    fn test_monte_carlo_update() {
        let mut qtable = QTable::new(2, 2, 0.2, 0.9);
        let state = Position::new(0, 0);
        qtable.monte_carlo_update(state, Action::Down, 1.0);
        qtable.monte_carlo_update(state, Action::Down, 1.0);
        // 0.2, then 0.2 + 0.2 * 0.8 = 0.36
        assert!((qtable.get(state, Action::Down) - 0.36).abs() < 1e-9);
    }
}
