//! Observer adapters for training runs
//!
//! Observers allow composable data collection during training without coupling the
//! training loop to specific output formats.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::mpsc::SyncSender,
};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use super::snapshot::{Snapshot, Status};
use crate::{Error, Result, config::Config, ports::Observer, types::Position};

impl<T: Observer + ?Sized> Observer for &mut T {
    fn on_run_start(&mut self, config: &Config) -> Result<()> {
        (**self).on_run_start(config)
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        (**self).on_snapshot(snapshot)
    }

    fn on_run_end(&mut self, last: &Snapshot) -> Result<()> {
        (**self).on_run_end(last)
    }
}

/// One finished episode, as written by the JSONL observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode: usize,
    pub steps: usize,
    pub reward: f64,
    /// Every goal was collected before the step budget ran out
    pub success: bool,
    pub epsilon: f64,
    pub final_position: Position,
    pub success_count: usize,
    pub total_steps: usize,
}

impl EpisodeRecord {
    /// Build from an `EpisodeComplete` snapshot.
    ///
    /// The live goal set is only empty at episode end when every goal was collected.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            episode: snapshot.episode,
            steps: snapshot.episode_steps,
            reward: snapshot.episode_reward,
            success: snapshot.goals.is_empty(),
            epsilon: snapshot.config.epsilon,
            final_position: snapshot.position,
            success_count: snapshot.success_count,
            total_steps: snapshot.total_steps,
        }
    }
}

/// Progress bar observer - Shows training progress
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
}

impl ProgressObserver {
    /// Create a new progress observer
    pub fn new() -> Self {
        Self { progress_bar: None }
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ProgressObserver {
    fn on_run_start(&mut self, config: &Config) -> Result<()> {
        let pb = ProgressBar::new(config.episodes as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} episodes ({msg})")
                .map_err(|e| Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.status != Status::EpisodeComplete {
            return Ok(());
        }
        if let Some(pb) = &self.progress_bar {
            pb.set_position(snapshot.episodes_completed as u64);
            pb.set_message(format!(
                "successes {} eps {:.3}",
                snapshot.success_count, snapshot.config.epsilon
            ));
        }
        Ok(())
    }

    fn on_run_end(&mut self, last: &Snapshot) -> Result<()> {
        if let Some(pb) = self.progress_bar.take() {
            let message = format!("successes {}", last.success_count);
            match last.status {
                Status::Cancelled => pb.abandon_with_message(format!("{message} (cancelled)")),
                _ => pb.finish_with_message(message),
            }
        }
        Ok(())
    }
}

/// Metrics observer - Tracks per-episode outcomes
#[derive(Debug, Clone, Default)]
pub struct MetricsObserver {
    rewards: Vec<f64>,
    steps: Vec<usize>,
    successes: usize,
}

impl MetricsObserver {
    /// Create a new metrics observer
    pub fn new() -> Self {
        Self::default()
    }

    pub fn episodes(&self) -> usize {
        self.rewards.len()
    }

    /// Reward of every finished episode, in order
    pub fn rewards(&self) -> &[f64] {
        &self.rewards
    }

    pub fn success_rate(&self) -> f64 {
        if self.rewards.is_empty() {
            0.0
        } else {
            self.successes as f64 / self.rewards.len() as f64
        }
    }

    pub fn avg_reward(&self) -> f64 {
        if self.rewards.is_empty() {
            0.0
        } else {
            self.rewards.iter().sum::<f64>() / self.rewards.len() as f64
        }
    }

    pub fn avg_steps(&self) -> f64 {
        if self.steps.is_empty() {
            0.0
        } else {
            self.steps.iter().sum::<usize>() as f64 / self.steps.len() as f64
        }
    }

    /// Get metrics summary
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            episodes: self.episodes(),
            successes: self.successes,
            success_rate: self.success_rate(),
            avg_reward: self.avg_reward(),
            avg_steps: self.avg_steps(),
        }
    }
}

/// Summary of training metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub episodes: usize,
    pub successes: usize,
    pub success_rate: f64,
    pub avg_reward: f64,
    pub avg_steps: f64,
}

impl Observer for MetricsObserver {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.status == Status::EpisodeComplete {
            let record = EpisodeRecord::from_snapshot(snapshot);
            self.rewards.push(record.reward);
            self.steps.push(record.steps);
            if record.success {
                self.successes += 1;
            }
        }
        Ok(())
    }
}

/// JSONL observer - Writes one [`EpisodeRecord`] per finished episode
pub struct JsonlObserver {
    writer: BufWriter<File>,
}

impl JsonlObserver {
    /// Create a new JSONL observer, truncating `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())
            .map_err(|e| Error::io(format!("create {}", path.as_ref().display()), e))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl Observer for JsonlObserver {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.status == Status::EpisodeComplete {
            serde_json::to_writer(&mut self.writer, &EpisodeRecord::from_snapshot(snapshot))?;
            writeln!(&mut self.writer)?;
        }
        Ok(())
    }

    fn on_run_end(&mut self, _last: &Snapshot) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Forwards every snapshot into a channel.
///
/// With a rendezvous channel the trainer blocks until the receiver takes each snapshot.
/// A dropped receiver surfaces as [`Error::StreamClosed`].
pub struct ChannelObserver {
    sender: SyncSender<Snapshot>,
}

impl ChannelObserver {
    pub fn new(sender: SyncSender<Snapshot>) -> Self {
        Self { sender }
    }
}

impl Observer for ChannelObserver {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.sender
            .send(snapshot.clone())
            .map_err(|_| Error::StreamClosed)
    }
}

/// Fan-out to several observers, called in insertion order.
///
/// The first error stops delivery to the remaining observers for that event.
#[derive(Default)]
pub struct ObserverSet<'a> {
    observers: Vec<Box<dyn Observer + 'a>>,
}

impl<'a> ObserverSet<'a> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Add an observer to the set
    pub fn with_observer(mut self, observer: Box<dyn Observer + 'a>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn push(&mut self, observer: Box<dyn Observer + 'a>) {
        self.observers.push(observer);
    }
}

impl Observer for ObserverSet<'_> {
    fn on_run_start(&mut self, config: &Config) -> Result<()> {
        for observer in &mut self.observers {
            observer.on_run_start(config)?;
        }
        Ok(())
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        for observer in &mut self.observers {
            observer.on_snapshot(snapshot)?;
        }
        Ok(())
    }

    fn on_run_end(&mut self, last: &Snapshot) -> Result<()> {
        for observer in &mut self.observers {
            observer.on_run_end(last)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::types::Goal;

    fn episode_snapshot(episode: usize, reward: f64, steps: usize, goals: Vec<Goal>) -> Snapshot {
        Snapshot {
            step: steps,
            episode,
            episode_steps: steps,
            episode_reward: reward,
            reward: 0.0,
            position: Position::new(0, 3),
            value_map: vec![vec![0.0; 4]; 4],
            goals,
            success_count: 0,
            episodes_completed: episode,
            total_reward: reward,
            total_steps: steps,
            config: Config::default(),
            status: Status::EpisodeComplete,
        }
    }

    #[test]
    fn test_metrics_observer_counts_successes() {
        let mut metrics = MetricsObserver::new();
        metrics
            .on_snapshot(&episode_snapshot(1, 1.0, 4, Vec::new()))
            .unwrap();
        metrics
            .on_snapshot(&episode_snapshot(2, -0.5, 8, vec![Goal::new(0, 3, 1.0)]))
            .unwrap();
        let mut running = episode_snapshot(3, 9.0, 1, Vec::new());
        running.status = Status::Running;
        metrics.on_snapshot(&running).unwrap();

        let summary = metrics.summary();
        assert_eq!(summary.episodes, 2);
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.success_rate, 0.5);
        assert!((summary.avg_reward - 0.25).abs() < 1e-12);
        assert_eq!(summary.avg_steps, 6.0);
    }

    #[test]
    fn test_jsonl_observer_writes_episode_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes.jsonl");
        let mut observer = JsonlObserver::new(&path).unwrap();
        let first = episode_snapshot(1, 1.0, 4, Vec::new());
        observer.on_snapshot(&first).unwrap();
        let mut running = first.clone();
        running.status = Status::Running;
        observer.on_snapshot(&running).unwrap();
        observer.on_run_end(&first).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        let record: EpisodeRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record.episode, 1);
        assert!(record.success);
    }

    #[test]
    fn test_channel_observer_reports_closed_receiver() {
        let (sender, receiver) = mpsc::sync_channel(1);
        let mut observer = ChannelObserver::new(sender);
        drop(receiver);
        let result = observer.on_snapshot(&episode_snapshot(1, 0.0, 1, Vec::new()));
        assert!(matches!(result, Err(Error::StreamClosed)));
    }

    #[test]
    fn test_observer_set_fans_out_to_borrowed_observers() {
        let mut first = MetricsObserver::new();
        let mut second = MetricsObserver::new();
        {
            let mut set = ObserverSet::new()
                .with_observer(Box::new(&mut first))
                .with_observer(Box::new(&mut second));
            set.on_snapshot(&episode_snapshot(1, 1.0, 3, Vec::new()))
                .unwrap();
        }
        assert_eq!(first.episodes(), 1);
        assert_eq!(second.episodes(), 1);
    }
}
