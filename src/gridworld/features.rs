//! Goal-distance feature bands for the state-value learner

use std::fmt;

use crate::{gridworld::GridWorld, types::Position};

/// Maps a cell to a discrete feature band.
pub trait FeatureMapper: fmt::Debug + Send {
    /// Number of bands the mapper can produce on a grid of this size (at least one).
    fn num_features(&self, rows: usize, cols: usize) -> usize;

    /// Band of `position`, in `[0, num_features)`.
    fn index(&self, env: &GridWorld, position: Position) -> usize;
}

/// Three bands: distance `[0,1]`, `(1,3]`, `(3,∞)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceBands3;

impl FeatureMapper for DistanceBands3 {
    fn num_features(&self, _rows: usize, _cols: usize) -> usize {
        3
    }

    fn index(&self, env: &GridWorld, position: Position) -> usize {
        let distance = env.potential(position);
        if distance <= 1.0 {
            0
        } else if distance <= 3.0 {
            1
        } else {
            2
        }
    }
}

/// Bands bounded by an ascending threshold list; the last band catches everything beyond.
#[derive(Debug, Clone, Default)]
pub struct ThresholdBands {
    thresholds: Vec<f64>,
}

impl ThresholdBands {
    pub fn new(mut thresholds: Vec<f64>) -> Self {
        thresholds.retain(|t| t.is_finite());
        thresholds.sort_by(f64::total_cmp);
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }
}

impl FeatureMapper for ThresholdBands {
    fn num_features(&self, _rows: usize, _cols: usize) -> usize {
        self.thresholds.len() + 1
    }

    fn index(&self, env: &GridWorld, position: Position) -> usize {
        let distance = env.potential(position);
        self.thresholds
            .iter()
            .position(|&limit| distance <= limit)
            .unwrap_or(self.thresholds.len())
    }
}

/// Three-band mapper for an empty list, threshold mapper otherwise.
pub fn mapper_for(thresholds: &[f64]) -> Box<dyn FeatureMapper> {
    if thresholds.is_empty() {
        Box::new(DistanceBands3)
    } else {
        Box::new(ThresholdBands::new(thresholds.to_vec()))
    }
}
