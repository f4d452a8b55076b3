//! Final run summary as JSON

use std::{fs::File, io::Write, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, config::Config, pipeline::TrainingResult};

/// Averages over the completed episodes of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub avg_reward: f64,
    pub avg_steps: f64,
    pub success_rate: f64,
}

impl From<&TrainingResult> for SummaryStats {
    fn from(result: &TrainingResult) -> Self {
        Self {
            avg_reward: result.avg_reward,
            avg_steps: result.avg_steps,
            success_rate: result.success_rate,
        }
    }
}

/// Effective configuration of a run paired with its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub config: Config,
    pub summary: SummaryStats,
}

impl RunSummary {
    pub fn new(config: Config, result: &TrainingResult) -> Self {
        Self {
            config,
            summary: SummaryStats::from(result),
        }
    }

    /// Save summary to a pretty-printed JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path)
            .map_err(|e| Error::io(format!("create run summary {}", path.display()), e))?;
        serde_json::to_writer_pretty(&mut file, self)?;
        writeln!(file)?;
        Ok(())
    }

    /// Load summary from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::io(format!("open run summary {}", path.display()), e))?;
        Ok(serde_json::from_reader(file)?)
    }
}
