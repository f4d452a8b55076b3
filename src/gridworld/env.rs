//! Grid transition model with walls, slip tiles, and collectible goals

use std::collections::HashMap;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::types::{Action, Goal, NUM_ACTIONS, Position, Tile};

/// Extra penalty multiplier applied when an episode runs out of steps.
const TIMEOUT_PENALTY_MULTIPLIER: f64 = 5.0;

/// Path length of the 4x4 reference board (3 + 3).
const REFERENCE_PATH_LENGTH: f64 = 6.0;

/// Rescale a per-step penalty to the board size.
///
/// The start-to-far-corner Manhattan distance stands in for the shortest path length;
/// the scale factor relative to the reference board is clamped to [0.5, 3].
pub fn scaled_step_penalty(rows: usize, cols: usize, base: f64) -> f64 {
    if base <= 0.0 {
        return 0.0;
    }
    let path_length = ((rows + cols) as f64 - 2.0).max(1.0);
    let scale = (path_length / REFERENCE_PATH_LENGTH).clamp(0.5, 3.0);
    base / scale
}

/// Default per-episode step budget: `max(rows*cols*2.5, rows+cols)`, floored at 10.
pub fn default_max_steps(rows: usize, cols: usize) -> usize {
    let cells = rows.saturating_mul(cols);
    (cells.saturating_mul(5) / 2)
        .max(rows.saturating_add(cols))
        .max(10)
}

/// Result of a single environment transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub reward: f64,
    pub done: bool,
    pub position: Position,
}

/// Bounded 2-D grid the agent moves through.
///
/// The goal template is restored on every [`reset`](GridWorld::reset); goals collected
/// during an episode are removed from the live set until then.
#[derive(Debug, Clone)]
pub struct GridWorld {
    rows: usize,
    cols: usize,
    start: Position,
    max_steps: usize,
    current: Position,
    steps_taken: usize,
    goals: Vec<Goal>,
    initial_goals: Vec<Goal>,
    step_penalty: f64,
    tiles: HashMap<Position, Tile>,
    rng: StdRng,
}

impl GridWorld {
    /// Create a grid whose agent starts in the bottom-left corner.
    ///
    /// `max_steps == 0` selects [`default_max_steps`]; any budget is floored at 10.
    pub fn new(
        rows: usize,
        cols: usize,
        goals: Vec<Goal>,
        step_penalty: f64,
        max_steps: usize,
        seed: u64,
    ) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let max_steps = if max_steps > 0 {
            max_steps.max(10)
        } else {
            default_max_steps(rows, cols)
        };
        let start = Position::new(rows - 1, 0);
        Self {
            rows,
            cols,
            start,
            max_steps,
            current: start,
            steps_taken: 0,
            goals: goals.clone(),
            initial_goals: goals,
            step_penalty: step_penalty.max(0.0),
            tiles: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn position(&self) -> Position {
        self.current
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn step_penalty(&self) -> f64 {
        self.step_penalty
    }

    /// Goals still collectible in the current episode.
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Goal template restored at every reset.
    pub fn initial_goals(&self) -> &[Goal] {
        &self.initial_goals
    }

    /// Whether every goal of the episode has been collected.
    pub fn all_goals_collected(&self) -> bool {
        self.goals.is_empty()
    }

    /// Restore the start cell, step counter, and live goals.
    pub fn reset(&mut self) {
        self.current = self.start;
        self.steps_taken = 0;
        self.goals = self.initial_goals.clone();
    }

    /// Replace both the goal template and the live goal set.
    pub fn set_goals(&mut self, goals: Vec<Goal>) {
        self.goals = goals.clone();
        self.initial_goals = goals;
    }

    pub fn set_step_penalty(&mut self, penalty: f64) {
        self.step_penalty = penalty.max(0.0);
    }

    /// Move the agent without consuming a step; out-of-bounds cells are clamped.
    pub fn set_position(&mut self, position: Position) {
        self.current = self.clamp(position.row as isize, position.col as isize);
    }

    pub fn set_wall(&mut self, position: Position) {
        if self.in_bounds(position) {
            self.tiles.insert(position, Tile::Wall);
        }
    }

    pub fn set_slip(&mut self, position: Position, probability: f64) {
        if self.in_bounds(position) {
            self.tiles
                .insert(position, Tile::Slip(probability.clamp(0.0, 1.0)));
        }
    }

    pub fn tile_at(&self, position: Position) -> Tile {
        self.tiles.get(&position).copied().unwrap_or_default()
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        position.row < self.rows && position.col < self.cols
    }

    /// Cell reached from `from` by `action`, clamped to the grid. Walls are not considered.
    pub fn neighbor(&self, from: Position, action: Action) -> Position {
        let (row, col) = (from.row as isize, from.col as isize);
        match action {
            Action::Up => self.clamp(row - 1, col),
            Action::Right => self.clamp(row, col + 1),
            Action::Down => self.clamp(row + 1, col),
            Action::Left => self.clamp(row, col - 1),
        }
    }

    /// Cell reached from the current position by `action`.
    pub fn successor(&self, action: Action) -> Position {
        self.neighbor(self.current, action)
    }

    /// Manhattan distance from `position` to the nearest live goal, or 0 with none left.
    pub fn potential(&self, position: Position) -> f64 {
        self.goals
            .iter()
            .map(|goal| goal.position().manhattan(&position))
            .min()
            .map_or(0.0, |d| d as f64)
    }

    /// Apply an action.
    ///
    /// Once the step budget is spent every call is a terminal no-op with zero reward.
    pub fn step(&mut self, action: Action) -> StepOutcome {
        if self.steps_taken >= self.max_steps {
            return StepOutcome {
                reward: 0.0,
                done: true,
                position: self.current,
            };
        }

        let actual = self.resolve_action(action);
        let destination = self.successor(actual);
        if !matches!(self.tile_at(destination), Tile::Wall) {
            self.current = destination;
        }
        self.steps_taken += 1;

        let mut reward = -self.step_penalty;
        let mut collected = false;
        if let Some(index) = self
            .goals
            .iter()
            .position(|goal| goal.position() == self.current)
        {
            reward += self.goals.remove(index).reward;
            collected = true;
        }

        let done = if collected && self.goals.is_empty() {
            true
        } else if self.steps_taken >= self.max_steps {
            reward -= self.step_penalty * TIMEOUT_PENALTY_MULTIPLIER;
            true
        } else {
            false
        };

        StepOutcome {
            reward,
            done,
            position: self.current,
        }
    }

    fn resolve_action(&mut self, action: Action) -> Action {
        let Tile::Slip(probability) = self.tile_at(self.current) else {
            return action;
        };
        if probability <= 0.0 {
            return action;
        }
        if probability >= 1.0 || self.rng.random::<f64>() < probability {
            return Action::from_index(self.rng.random_range(0..NUM_ACTIONS));
        }
        action
    }

    fn clamp(&self, row: isize, col: isize) -> Position {
        Position::new(
            row.clamp(0, self.rows as isize - 1) as usize,
            col.clamp(0, self.cols as isize - 1) as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner_world() -> GridWorld {
        GridWorld::new(4, 4, vec![Goal::new(0, 3, 1.0)], 0.02, 0, 7)
    }

    #[test]
    fn test_default_budget() {
        assert_eq!(default_max_steps(4, 4), 40);
        assert_eq!(default_max_steps(1, 2), 10);
        assert_eq!(default_max_steps(1, 9), 22);
        assert_eq!(default_max_steps(usize::MAX, usize::MAX), usize::MAX);
    }

    #[test]
    fn test_scaled_step_penalty_reference_board() {
        assert!((scaled_step_penalty(4, 4, 0.02) - 0.02).abs() < 1e-12);
        assert!((scaled_step_penalty(2, 2, 0.02) - 0.04).abs() < 1e-12);
        assert!((scaled_step_penalty(40, 40, 0.03) - 0.01).abs() < 1e-12);
        assert_eq!(scaled_step_penalty(4, 4, 0.0), 0.0);
    }

    #[test]
    fn test_moves_clamp_to_bounds() {
        let mut world = corner_world();
        let outcome = world.step(Action::Left);
        assert_eq!(outcome.position, Position::new(3, 0));
        assert!(!outcome.done);
        assert!((outcome.reward + 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_wall_blocks_movement_and_costs_a_step() {
        let mut world = corner_world();
        world.set_wall(Position::new(2, 0));
        let outcome = world.step(Action::Up);
        assert_eq!(outcome.position, Position::new(3, 0));
        assert_eq!(world.steps_taken(), 1);
        assert!((outcome.reward + 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_collecting_last_goal_terminates_without_timeout_penalty() {
        let mut world = GridWorld::new(1, 2, vec![Goal::new(0, 1, 2.0)], 0.1, 0, 1);
        let outcome = world.step(Action::Right);
        assert!(outcome.done);
        assert!(world.all_goals_collected());
        assert!((outcome.reward - 1.9).abs() < 1e-12);
    }

    #[test]
    fn test_timeout_applies_extra_penalty_then_no_ops() {
        let mut world = GridWorld::new(2, 2, vec![Goal::new(0, 1, 1.0)], 0.1, 10, 1);
        let mut last = None;
        for _ in 0..10 {
            last = Some(world.step(Action::Down));
        }
        let last = last.unwrap();
        assert!(last.done);
        assert!((last.reward - (-0.1 - 0.5)).abs() < 1e-12);

        let after = world.step(Action::Up);
        assert!(after.done);
        assert_eq!(after.reward, 0.0);
        assert_eq!(world.steps_taken(), 10);
    }

    #[test]
    fn test_reset_restores_goal_template() {
        let goals = vec![Goal::new(2, 0, 1.0), Goal::new(0, 3, 1.0)];
        let mut world = GridWorld::new(4, 4, goals.clone(), 0.0, 0, 1);
        world.step(Action::Up);
        assert_eq!(world.goals().len(), 1);
        world.reset();
        assert_eq!(world.goals(), goals.as_slice());
        assert_eq!(world.position(), world.start());
    }

    #[test]
    fn test_potential_tracks_nearest_live_goal() {
        let world = GridWorld::new(
            4,
            4,
            vec![Goal::new(0, 3, 1.0), Goal::new(3, 2, 1.0)],
            0.0,
            0,
            1,
        );
        assert_eq!(world.potential(Position::new(3, 0)), 2.0);
        let empty = GridWorld::new(4, 4, Vec::new(), 0.0, 0, 1);
        assert_eq!(empty.potential(Position::new(3, 0)), 0.0);
    }

    #[test]
    fn test_certain_slip_is_reproducible_per_seed() {
        let run = |seed| {
            let mut world = GridWorld::new(5, 5, vec![Goal::new(0, 4, 1.0)], 0.0, 100, seed);
            world.set_slip(Position::new(2, 2), 1.0);
            (0..20)
                .map(|_| {
                    world.set_position(Position::new(2, 2));
                    world.step(Action::Up).position
                })
                .collect::<Vec<_>>()
        };
        let first = run(11);
        assert_eq!(first, run(11));
        assert!(first.iter().any(|p| *p != Position::new(1, 2)));
    }

    #[test]
    fn test_partial_slip_sometimes_keeps_the_intended_action() {
        let mut world = GridWorld::new(5, 5, vec![Goal::new(0, 4, 1.0)], 0.0, 1000, 5);
        world.set_slip(Position::new(2, 2), 0.5);
        let trials = 400;
        let intended = (0..trials)
            .filter(|_| {
                world.set_position(Position::new(2, 2));
                world.step(Action::Up).position == Position::new(1, 2)
            })
            .count();

        // half the moves slip, and a slip still picks Up a quarter of the time
        let fraction = intended as f64 / trials as f64;
        assert!(intended < trials);
        assert!((0.5..0.75).contains(&fraction), "intended fraction {fraction}");
    }
}
