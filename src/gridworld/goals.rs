//! Goal layout helpers: sanitation, even placement, and random reshuffles

use rand::{Rng, seq::SliceRandom};
use tracing::warn;

use crate::types::{Goal, Position};

/// Redraws allowed before a reshuffle gives up on finding a new layout.
const RESHUFFLE_ATTEMPTS: usize = 16;

/// Reward for generated goals: `max(1, (rows + cols - 2) / 2.5)`.
pub fn default_goal_reward(rows: usize, cols: usize) -> f64 {
    (((rows + cols) as f64 - 2.0) / 2.5).max(1.0)
}

/// Drop goals with zero (or non-finite) reward and goals outside the grid.
pub fn sanitize_goals(goals: &[Goal], rows: usize, cols: usize) -> Vec<Goal> {
    let kept: Vec<Goal> = goals
        .iter()
        .filter(|g| g.reward != 0.0 && g.reward.is_finite())
        .filter(|g| g.row < rows && g.col < cols)
        .copied()
        .collect();
    if kept.len() != goals.len() {
        warn!(
            dropped = goals.len() - kept.len(),
            "ignoring goals with zero reward or outside the grid"
        );
    }
    kept
}

/// Space `count` goals evenly over the grid in row-major order.
///
/// A zero count yields the single default goal in the top-right corner.
pub fn place_evenly(rows: usize, cols: usize, count: usize) -> Vec<Goal> {
    let reward = default_goal_reward(rows, cols);
    if count == 0 {
        return vec![Goal::new(0, cols.saturating_sub(1), reward)];
    }
    let total = rows * cols;
    let count = count.min(total);
    let interval = (total / count).max(1);
    (0..total)
        .step_by(interval)
        .take(count)
        .map(|cell| Goal::new(cell / cols, cell % cols, reward))
        .collect()
}

/// Draw a fresh random layout of `count` distinct goals.
///
/// `exclude` (typically the start cell) is avoided whenever the grid has room for it. The
/// draw is repeated a bounded number of times until it differs from `previous`.
pub fn reshuffle<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    count: usize,
    exclude: Option<Position>,
    previous: &[Goal],
    rng: &mut R,
) -> Vec<Goal> {
    let reward = default_goal_reward(rows, cols);
    let mut cells: Vec<Position> = (0..rows * cols)
        .map(|cell| Position::new(cell / cols, cell % cols))
        .collect();
    if let Some(excluded) = exclude {
        if cells.len() > count.max(1) {
            cells.retain(|cell| *cell != excluded);
        }
    }
    let amount = count.max(1).min(cells.len());
    let mut previous_cells: Vec<Position> = previous.iter().map(Goal::position).collect();
    previous_cells.sort();

    let mut layout = Vec::new();
    for _ in 0..RESHUFFLE_ATTEMPTS {
        let mut picked = cells.clone();
        picked.shuffle(rng);
        picked.truncate(amount);
        picked.sort();
        let differs = picked != previous_cells;
        layout = picked;
        if differs {
            break;
        }
    }
    layout
        .into_iter()
        .map(|cell| Goal::new(cell.row, cell.col, reward))
        .collect()
}
