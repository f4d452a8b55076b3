//! Observer port - abstraction for consuming training progress
//!
//! This port defines the interface through which the trainer hands out snapshots,
//! allowing progress bars, exporters, and stream bridges to be composed without coupling
//! the training loop to any output format.

use crate::{Result, config::Config, pipeline::Snapshot};

/// Observer trait for monitoring training
///
/// Observers receive every snapshot the trainer produces, in order. Examples include:
/// - Progress bars for user feedback
/// - Per-episode CSV and JSONL export
/// - Forwarding into a backpressured stream consumed by another thread
///
/// # Event Sequence
///
/// 1. `on_run_start(config)` - Once, with the effective configuration
/// 2. `on_snapshot(snapshot)` - For every `Running` and `EpisodeComplete` snapshot, then
///    for the terminal `Done` or `Cancelled` snapshot
/// 3. `on_run_end(snapshot)` - Once, with the terminal snapshot
///
/// A run configured with zero episodes produces no snapshots and skips `on_run_end`.
///
/// # Errors
///
/// Returning an error stops the run; the trainer propagates it to its caller.
///
/// # Examples
///
/// ```no_run
/// use gridrl::{Observer, Snapshot, Status};
///
/// struct SuccessCounter {
///     successes: usize,
/// }
///
/// impl Observer for SuccessCounter {
///     fn on_snapshot(&mut self, snapshot: &Snapshot) -> gridrl::Result<()> {
///         if snapshot.status == Status::EpisodeComplete {
///             self.successes = snapshot.success_count;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Observer: Send {
    /// Called before the first episode.
    ///
    /// # Default Implementation
    ///
    /// Does nothing. Override to initialize observation state.
    fn on_run_start(&mut self, _config: &Config) -> Result<()> {
        Ok(())
    }

    /// Called for each snapshot, in emission order.
    ///
    /// # Default Implementation
    ///
    /// Does nothing.
    fn on_snapshot(&mut self, _snapshot: &Snapshot) -> Result<()> {
        Ok(())
    }

    /// Called after the terminal snapshot has been delivered.
    ///
    /// Use this to flush files or display summaries.
    ///
    /// # Default Implementation
    ///
    /// Does nothing.
    fn on_run_end(&mut self, _last: &Snapshot) -> Result<()> {
        Ok(())
    }
}

/// Observer that ignores everything, for runs whose result is all that matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {}
