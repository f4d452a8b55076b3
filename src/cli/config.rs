//! Loading a training configuration from disk

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};

use crate::config::Config;

/// Read a JSON [`Config`]; fields missing from the file keep their defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open config: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}
