//! Subcommand implementations

pub mod train;
