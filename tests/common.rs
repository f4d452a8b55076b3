//! Common test utilities for the gridrl test suite.
#![allow(dead_code)]

use gridrl::{CancelToken, Config, Goal, Observer, Result, Snapshot, Status, Trainer, TrainingResult};

/// Observer keeping every snapshot it receives.
#[derive(Default)]
pub struct Recorder {
    pub snapshots: Vec<Snapshot>,
    pub runs_started: usize,
    pub runs_ended: usize,
}

impl Observer for Recorder {
    fn on_run_start(&mut self, _config: &Config) -> Result<()> {
        self.runs_started += 1;
        Ok(())
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }

    fn on_run_end(&mut self, _last: &Snapshot) -> Result<()> {
        self.runs_ended += 1;
        Ok(())
    }
}

/// Run `config` to completion and return every snapshot with the result.
pub fn run_to_end(config: Config) -> (Vec<Snapshot>, TrainingResult) {
    let mut trainer = Trainer::new(config);
    let mut recorder = Recorder::default();
    let result = trainer
        .run(&mut recorder, &CancelToken::new())
        .expect("training run should succeed");
    (recorder.snapshots, result)
}

/// 4x4 grid, one goal at (0,3), the hyperparameters of the reference scenarios.
pub fn reference_config() -> Config {
    Config::default()
        .with_grid(4, 4)
        .with_goals(vec![Goal::new(0, 3, 1.0)])
        .with_seed(7)
        .with_episodes(50)
        .with_exploration(0.5, 0.05, 0.998)
        .with_learning(0.2, 0.9)
        .with_step_penalty(0.02)
}

pub fn with_status(snapshots: &[Snapshot], status: Status) -> Vec<&Snapshot> {
    snapshots.iter().filter(|s| s.status == status).collect()
}
