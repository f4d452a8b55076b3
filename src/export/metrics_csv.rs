//! Per-episode metrics as CSV
//!
//! One row per finished episode, flushed as it is written so a partially completed or
//! cancelled run still leaves a readable file.

use std::{fs::File, path::Path};

use crate::{
    Error, Result,
    pipeline::{Snapshot, Status},
    ports::Observer,
};

/// Column order of the metrics file
pub const METRICS_HEADER: [&str; 14] = [
    "episode",
    "steps",
    "episode_reward",
    "success",
    "epsilon",
    "alpha",
    "gamma",
    "rows",
    "cols",
    "step_penalty",
    "algorithm",
    "seed",
    "goal_count",
    "goal_interval",
];

/// Observer writing one CSV row per `EpisodeComplete` snapshot.
pub struct MetricsCsvObserver {
    writer: csv::Writer<File>,
    last_success_count: usize,
}

impl MetricsCsvObserver {
    /// Create the file at `path` and write the header row.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| Error::io(format!("create metrics csv {}", path.display()), e))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(METRICS_HEADER)?;
        writer.flush()?;
        Ok(Self {
            writer,
            last_success_count: 0,
        })
    }

    fn write_row(&mut self, snapshot: &Snapshot) -> Result<()> {
        let success = snapshot.success_count > self.last_success_count;
        self.last_success_count = snapshot.success_count;
        let config = &snapshot.config;
        let record = [
            snapshot.episode.to_string(),
            snapshot.episode_steps.to_string(),
            format!("{:.4}", snapshot.episode_reward),
            u8::from(success).to_string(),
            format!("{:.6}", config.epsilon),
            format!("{:.6}", config.alpha),
            format!("{:.6}", config.gamma),
            config.rows.to_string(),
            config.cols.to_string(),
            format!("{:.6}", config.step_penalty),
            config.algorithm.to_string(),
            config.seed.to_string(),
            config.goal_count.to_string(),
            config.goal_interval.to_string(),
        ];
        self.writer.write_record(&record)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl Observer for MetricsCsvObserver {
    fn on_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.status == Status::EpisodeComplete {
            self.write_row(snapshot)?;
        }
        Ok(())
    }

    fn on_run_end(&mut self, _last: &Snapshot) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
