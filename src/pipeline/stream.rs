//! Snapshot stream backed by a worker thread
//!
//! The trainer runs on its own thread and hands every snapshot through a rendezvous
//! channel, so it never gets ahead of the consumer by more than one snapshot.

use std::{
    sync::mpsc::{self, Receiver},
    thread::{self, JoinHandle},
};

use tracing::debug;

use super::{
    cancel::CancelToken,
    observers::ChannelObserver,
    snapshot::Snapshot,
    training::{Trainer, TrainingResult},
};
use crate::{Error, Result, config::Config};

/// Iterator over the snapshots of a training run executing on a worker thread.
///
/// After [`cancel`](TrainingStream::cancel) keep iterating: the stream still yields the
/// snapshots already in flight followed by exactly one `Cancelled` snapshot. Dropping the
/// stream cancels the run and waits for the worker.
///
/// ```no_run
/// use gridrl::{Config, Status, TrainingStream};
///
/// let mut stream = TrainingStream::spawn(Config::default().with_episodes(10))?;
/// for snapshot in stream.by_ref() {
///     if snapshot.status == Status::EpisodeComplete {
///         println!("episode {} reward {:.2}", snapshot.episode, snapshot.episode_reward);
///     }
/// }
/// let result = stream.join()?;
/// # Ok::<(), gridrl::Error>(())
/// ```
#[derive(Debug)]
pub struct TrainingStream {
    receiver: Option<Receiver<Snapshot>>,
    cancel: CancelToken,
    handle: Option<JoinHandle<Result<TrainingResult>>>,
}

impl TrainingStream {
    /// Start training `config` on a new thread.
    pub fn spawn(config: Config) -> Result<Self> {
        Self::spawn_trainer(Trainer::new(config))
    }

    /// Start an already constructed trainer on a new thread.
    pub fn spawn_trainer(mut trainer: Trainer) -> Result<Self> {
        let (sender, receiver) = mpsc::sync_channel(0);
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name("gridrl-trainer".to_string())
            .spawn(move || {
                let mut observer = ChannelObserver::new(sender);
                match trainer.run(&mut observer, &token) {
                    Err(Error::StreamClosed) => {
                        debug!("snapshot consumer went away, stopping training");
                        Ok(TrainingResult {
                            cancelled: true,
                            ..trainer.result()
                        })
                    }
                    other => other,
                }
            })
            .map_err(|e| Error::io("spawn training thread", e))?;
        Ok(Self {
            receiver: Some(receiver),
            cancel,
            handle: Some(handle),
        })
    }

    /// Request cancellation; the run closes with a `Cancelled` snapshot.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token shared with the worker, for cancelling from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Drain any remaining snapshots and wait for the worker.
    ///
    /// A run stopped because its consumer went away reports the totals reached so far,
    /// flagged as cancelled.
    pub fn join(mut self) -> Result<TrainingResult> {
        self.finish()
    }

    fn finish(&mut self) -> Result<TrainingResult> {
        if let Some(receiver) = self.receiver.take() {
            let drained = receiver.iter().count();
            if drained > 0 {
                debug!(drained, "discarded unread snapshots");
            }
        }
        let handle = self.handle.take().ok_or(Error::StreamClosed)?;
        handle.join().map_err(|_| Error::WorkerPanicked)?
    }
}

impl Iterator for TrainingStream {
    type Item = Snapshot;

    fn next(&mut self) -> Option<Snapshot> {
        self.receiver.as_ref()?.recv().ok()
    }
}

impl Drop for TrainingStream {
    fn drop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        self.cancel.cancel();
        // Closing the receiver unblocks a worker waiting on a hand-off.
        self.receiver = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
