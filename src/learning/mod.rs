//! Tabular value stores and the exploration policy
//!
//! ## Stores
//!
//! | Store | Indexed by | Used by |
//! |-------|------------|---------|
//! | [`QTable`] | (row, col, action) | Q-learning, SARSA, Monte Carlo control |
//! | [`ValueTable`] | (row, col, distance band) | Monte Carlo with the state-value estimator |
//!
//! Both stores have fixed dimensions and clamp out-of-range indices instead of failing.
//! [`Policy`] scores actions against whichever store is active through [`Estimates`].

pub mod policy;
pub mod q_table;
pub mod value_table;

pub use policy::{Estimates, Policy};
pub use q_table::QTable;
pub use value_table::ValueTable;
