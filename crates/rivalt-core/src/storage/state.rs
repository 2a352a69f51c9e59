//! JSON persistence of the live model between host runs.
//!
//! The file holds groups, timers, engine state and the selection. Limits
//! and sequencing always come from the [`Config`] given at load time.

use std::path::{Path, PathBuf};

use super::{data_dir, Config};
use crate::error::Result;
use crate::model::TimerModel;

#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data dir>/state.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn open() -> Result<Self> {
        Ok(Self::new(data_dir()?.join("state.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved model, or an empty one if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or holds a model [`TimerModel::validate`] cannot repair.
    pub fn load(&self, config: &Config) -> Result<TimerModel> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TimerModel::new(config));
            }
            Err(err) => return Err(err.into()),
        };
        let mut model: TimerModel = serde_json::from_str(&content)?;
        model.validate()?;
        model.apply_config(config);
        tracing::debug!(path = %self.path.display(), groups = model.group_count(), "loaded model");
        Ok(model)
    }

    /// # Errors
    ///
    /// Returns an error if the model cannot be serialized or written.
    pub fn save(&self, model: &TimerModel) -> Result<()> {
        let json = serde_json::to_string_pretty(model)?;
        std::fs::write(&self.path, json)?;
        tracing::debug!(path = %self.path.display(), "saved model");
        Ok(())
    }
}
