//! Banded state-value table for Monte Carlo prediction

use serde::{Deserialize, Serialize};

use crate::types::Position;

/// State values indexed by (row, column, feature band).
///
/// Storage is `rows × features` by `cols`: the row index and the band are flattened into a
/// single table row so cells that share a distance band share a row slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueTable {
    rows: usize,
    cols: usize,
    features: usize,
    learning_rate: f64,
    data: Vec<Vec<f64>>,
}

impl ValueTable {
    /// Create a zeroed table with `features` bands per row (at least one).
    pub fn new(rows: usize, cols: usize, features: usize, learning_rate: f64) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let features = features.max(1);
        Self {
            rows,
            cols,
            features,
            learning_rate,
            data: vec![vec![0.0; cols]; rows * features],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn features(&self) -> usize {
        self.features
    }

    fn flat_index(&self, row: usize, band: usize) -> usize {
        row.min(self.rows - 1) * self.features + band.min(self.features - 1)
    }

    fn clamp_col(&self, col: usize) -> usize {
        col.min(self.cols - 1)
    }

    pub fn get(&self, position: Position, band: usize) -> f64 {
        self.data[self.flat_index(position.row, band)][self.clamp_col(position.col)]
    }

    pub fn add(&mut self, position: Position, band: usize, delta: f64) {
        let row = self.flat_index(position.row, band);
        let col = self.clamp_col(position.col);
        self.data[row][col] += delta;
    }

    /// V(s,b) ← V(s,b) + α[G - V(s,b)]
    pub fn monte_carlo_update(&mut self, position: Position, band: usize, episode_return: f64) {
        let current = self.get(position, band);
        self.add(position, band, self.learning_rate * (episode_return - current));
    }

    /// Per-cell projection taking the best value across bands, row-major.
    pub fn clone_data(&self) -> Vec<Vec<f64>> {
        (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| {
                        (0..self.features)
                            .map(|band| self.data[row * self.features + band][col])
                            .fold(f64::NEG_INFINITY, f64::max)
                    })
                    .collect()
            })
            .collect()
    }
}
