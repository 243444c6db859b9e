//! # Orchestra Configuration
//!
//! The sample reads one TOML file describing logging, the conductor, and the
//! cast of components to summon at start-up:
//!
//! ```toml
//! run_for_secs = 30
//!
//! [logging]
//! level = "info"
//!
//! [conductor]
//! name = "conductor"
//! pausetime = 2
//! monitor = "monitor"
//!
//! [[cast]]
//! role = "monitor"
//! config = { name = "monitor", pausetime = 5 }
//!
//! [[cast]]
//! role = "copyist"
//! config = { name = "copyist", options = { work_ms = 2500 } }
//! ```
//!
//! Without a file, [`TheaterConfig::default`] gives a monitor, a metronome and a copyist.

use crate::error::SampleError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use theater_framework::{ComponentConfig, ConductorConfig, LogConfig};

/// One component to summon: which role, and its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastEntry {
    pub role: String,
    pub config: ComponentConfig,
}

impl CastEntry {
    pub fn new(role: impl Into<String>, config: ComponentConfig) -> Self {
        Self {
            role: role.into(),
            config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheaterConfig {
    #[serde(default)]
    pub logging: LogConfig,
    pub conductor: ConductorConfig,
    #[serde(default)]
    pub cast: Vec<CastEntry>,
    /// Stop on our own after this many seconds; otherwise wait for Ctrl-C.
    #[serde(default)]
    pub run_for_secs: Option<u64>,
}

impl Default for TheaterConfig {
    fn default() -> Self {
        Self {
            logging: LogConfig::default(),
            conductor: ConductorConfig::new(ComponentConfig::new("conductor").with_pausetime(1)),
            cast: vec![
                CastEntry::new("monitor", ComponentConfig::new("monitor")),
                CastEntry::new("metronome", ComponentConfig::new("metronome").with_pausetime(2)),
                CastEntry::new("copyist", ComponentConfig::new("copyist").with_pausetime(1)),
            ],
            run_for_secs: None,
        }
    }
}

impl TheaterConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SampleError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SampleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every component config and that the monitor is part of the cast.
    pub fn validate(&self) -> Result<(), SampleError> {
        self.conductor.validate()?;
        for entry in &self.cast {
            entry.config.validate()?;
        }
        if !self
            .cast
            .iter()
            .any(|entry| entry.config.name == self.conductor.monitor)
        {
            return Err(SampleError::MissingMonitor(self.conductor.monitor.clone()));
        }
        Ok(())
    }
}
