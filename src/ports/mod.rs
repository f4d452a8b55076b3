//! Ports (trait boundaries) for external collaborators.
//!
//! The training loop depends only on these traits; progress bars, exporters, and stream
//! bridges are adapters implementing them.

pub mod observer;

pub use observer::{NullObserver, Observer};
