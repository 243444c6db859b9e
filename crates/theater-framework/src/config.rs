//! # Configuration
//!
//! Serde-friendly settings consumed by components, the conductor and the
//! logging layer. Loading them from disk is left to the application (the
//! sample binary reads TOML); this module only defines the shapes, their
//! defaults, and validation.

use crate::error::{Result, TheaterError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

fn default_pausetime() -> u32 {
    5
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_capacity() -> usize {
    64
}

/// Settings shared by every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Unique, non-empty name; used as the sender of everything the component emits.
    pub name: String,
    /// Ticks spent polling the mailbox between two resume phases.
    #[serde(default = "default_pausetime")]
    pub pausetime: u32,
    /// Length of one tick in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Capacity of the component's own mailbox.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Free-form, role-specific settings.
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl ComponentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pausetime: default_pausetime(),
            tick_ms: default_tick_ms(),
            capacity: default_capacity(),
            options: Map::new(),
        }
    }

    pub fn with_pausetime(mut self, pausetime: u32) -> Self {
        self.pausetime = pausetime;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick_ms = tick.as_millis() as u64;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn option_u64(&self, key: &str) -> Option<u64> {
        self.options.get(key).and_then(Value::as_u64)
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(TheaterError::InvalidArgument(
                "can't create an unnamed component".into(),
            ));
        }
        if self.pausetime == 0 {
            return Err(TheaterError::InvalidArgument(format!(
                "{}: pausetime must be at least 1 tick",
                self.name
            )));
        }
        if self.tick_ms == 0 {
            return Err(TheaterError::InvalidArgument(format!(
                "{}: tick_ms must be at least 1",
                self.name
            )));
        }
        if self.capacity == 0 {
            return Err(TheaterError::InvalidArgument(format!(
                "{}: mailbox capacity must be at least 1",
                self.name
            )));
        }
        Ok(())
    }
}

fn default_monitor() -> String {
    "monitor".to_string()
}

fn default_grace_ms() -> u64 {
    5000
}

/// Settings for a [`Conductor`](crate::conductor::Conductor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConductorConfig {
    #[serde(flatten)]
    pub component: ComponentConfig,
    /// Registry name of the child that acts as the heartbeat monitor.
    #[serde(default = "default_monitor")]
    pub monitor: String,
    /// How long to wait for children to stop once an interrupt was fanned out.
    #[serde(default = "default_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Name the supervising conductor signs its monitor's sweep requests with.
    /// Only used when this conductor is itself supervised.
    #[serde(default = "default_monitor")]
    pub upstream_monitor: String,
}

impl ConductorConfig {
    pub fn new(component: ComponentConfig) -> Self {
        Self {
            component,
            monitor: default_monitor(),
            shutdown_grace_ms: default_grace_ms(),
            upstream_monitor: default_monitor(),
        }
    }

    pub fn with_monitor(mut self, monitor: impl Into<String>) -> Self {
        self.monitor = monitor.into();
        self
    }

    pub fn with_upstream_monitor(mut self, monitor: impl Into<String>) -> Self {
        self.upstream_monitor = monitor.into();
        self
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn validate(&self) -> Result<()> {
        self.component.validate()?;
        if self.monitor.is_empty() {
            return Err(TheaterError::InvalidArgument(
                "the monitor name must not be empty".into(),
            ));
        }
        if self.upstream_monitor.is_empty() {
            return Err(TheaterError::InvalidArgument(
                "the upstream monitor name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Output layout for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
}

fn default_log_name() -> String {
    "theater".to_string()
}

fn default_level() -> String {
    "info".to_string()
}

fn default_console() -> bool {
    true
}

fn default_time_format() -> String {
    "%Y-%m-%d %H:%M:%S%.3f".to_string()
}

/// Settings for [`setup_tracing`](crate::tracing::setup_tracing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_name")]
    pub name: String,
    /// Filter directive (`info`, `debug`, `theater_framework=trace`, ...).
    /// `RUST_LOG` wins when set.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_console")]
    pub enable_console: bool,
    /// Append log lines to this file as well.
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default)]
    pub message_format: LogFormat,
    /// chrono strftime pattern for the timestamp column.
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            name: default_log_name(),
            level: default_level(),
            enable_console: default_console(),
            file_path: None,
            message_format: LogFormat::default(),
            time_format: default_time_format(),
        }
    }
}
