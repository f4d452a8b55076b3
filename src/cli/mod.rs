//! CLI infrastructure for the gridrl toolkit
//!
//! This module provides the command-line interface for training tabular agents on the
//! gridworld and exporting their metrics.

pub mod commands;
pub mod config;
pub mod output;
