//! Core grid value types shared by the environment, learners, and snapshots

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of movement actions available in every cell.
pub const NUM_ACTIONS: usize = 4;

/// A cell coordinate on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan distance to another cell.
    pub fn manhattan(&self, other: &Position) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl FromStr for Position {
    type Err = Error;

    /// Parse `row,col`.
    fn from_str(s: &str) -> Result<Self> {
        let parts = split_fields(s, "wall", 2)?;
        Ok(Position {
            row: parse_index(parts[0], s, "wall", "row")?,
            col: parse_index(parts[1], s, "wall", "col")?,
        })
    }
}

/// A collectible target with its reward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub row: usize,
    pub col: usize,
    pub reward: f64,
}

impl Goal {
    pub const fn new(row: usize, col: usize, reward: f64) -> Self {
        Self { row, col, reward }
    }

    pub fn position(&self) -> Position {
        Position::new(self.row, self.col)
    }
}

impl FromStr for Goal {
    type Err = Error;

    /// Parse `row,col,reward`.
    fn from_str(s: &str) -> Result<Self> {
        let parts = split_fields(s, "goal", 3)?;
        Ok(Goal {
            row: parse_index(parts[0], s, "goal", "row")?,
            col: parse_index(parts[1], s, "goal", "col")?,
            reward: parse_float(parts[2], s, "goal", "reward")?,
        })
    }
}

/// A slip tile placement with its substitution probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlipTile {
    pub row: usize,
    pub col: usize,
    pub probability: f64,
}

impl FromStr for SlipTile {
    type Err = Error;

    /// Parse `row,col,probability`; the probability is clamped into [0, 1].
    fn from_str(s: &str) -> Result<Self> {
        let parts = split_fields(s, "slip", 3)?;
        let probability = parse_float(parts[2], s, "slip", "probability")?;
        Ok(SlipTile {
            row: parse_index(parts[0], s, "slip", "row")?,
            col: parse_index(parts[1], s, "slip", "col")?,
            probability: probability.clamp(0.0, 1.0),
        })
    }
}

/// Contents of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Tile {
    #[default]
    Empty,
    Wall,
    /// Replaces the chosen action with a uniformly random one with this probability.
    Slip(f64),
}

/// Movement action. Discriminants double as table indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Action {
    pub const ALL: [Action; NUM_ACTIONS] = [Action::Up, Action::Right, Action::Down, Action::Left];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Map an index back to an action; out-of-range indices clamp to `Left`.
    pub fn from_index(index: usize) -> Action {
        Action::ALL[index.min(NUM_ACTIONS - 1)]
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Up => "up",
            Action::Right => "right",
            Action::Down => "down",
            Action::Left => "left",
        };
        f.write_str(name)
    }
}

fn split_fields<'a>(input: &'a str, kind: &str, expected: usize) -> Result<Vec<&'a str>> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    if parts.len() != expected {
        return Err(Error::InvalidTileSpec {
            kind: kind.to_string(),
            input: input.to_string(),
            reason: format!("expected {expected} comma-separated fields, got {}", parts.len()),
        });
    }
    Ok(parts)
}

fn parse_index(field: &str, input: &str, kind: &str, name: &str) -> Result<usize> {
    field.parse::<usize>().map_err(|e| Error::InvalidTileSpec {
        kind: kind.to_string(),
        input: input.to_string(),
        reason: format!("invalid {name} '{field}': {e}"),
    })
}

fn parse_float(field: &str, input: &str, kind: &str, name: &str) -> Result<f64> {
    field.parse::<f64>().map_err(|e| Error::InvalidTileSpec {
        kind: kind.to_string(),
        input: input.to_string(),
        reason: format!("invalid {name} '{field}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_goal() {
        let goal: Goal = "0, 3, 1.5".parse().unwrap();
        assert_eq!(goal, Goal::new(0, 3, 1.5));
    }

    #[test]
    fn test_parse_goal_rejects_wrong_arity() {
        let err = "0,3".parse::<Goal>().unwrap_err();
        assert!(matches!(err, Error::InvalidTileSpec { .. }));
    }

    #[test]
    fn test_parse_wall_rejects_negative() {
        assert!("-1,2".parse::<Position>().is_err());
    }

    #[test]
    fn test_parse_slip_clamps_probability() {
        let slip: SlipTile = "1,1,1.7".parse().unwrap();
        assert_eq!(slip.probability, 1.0);
    }

    #[test]
    fn test_action_index_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::from_index(action.index()), action);
        }
        assert_eq!(Action::from_index(17), Action::Left);
    }

    #[test]
    fn test_manhattan() {
        assert_eq!(Position::new(3, 0).manhattan(&Position::new(0, 3)), 6);
    }
}
