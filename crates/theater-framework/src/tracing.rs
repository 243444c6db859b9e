//! # Observability & Tracing
//!
//! Every component logs through the `tracing` macros with structured fields
//! (`component`, `sender`, `signal`, ...). This module installs the subscriber
//! that turns those events into lines on the console and/or in a file.
//!
//! ## Configuration
//!
//! [`setup_tracing`] reads a [`LogConfig`]:
//!
//! - `level` is an `EnvFilter` directive; `RUST_LOG` overrides it when set.
//! - `enable_console` writes to stdout, `file_path` appends to a file (no ANSI colours).
//! - `message_format` picks the compact layout (module paths hidden) or the full one.
//! - `time_format` is a chrono strftime pattern rendered in local time.
//!
//! ```bash
//! # Heartbeat sweeps at info level
//! RUST_LOG=info cargo run -p theater-sample
//!
//! # Every dispatched message
//! RUST_LOG=theater_framework=debug cargo run -p theater-sample
//! ```
//!
//! ## What Gets Traced
//!
//! - **Control loops**: start, interrupt, `ScoreEnd` with its reason
//! - **Dispatch**: every dequeued message at `debug` (sender, signal, type)
//! - **Heartbeats**: the monitor's status lines at `info`
//! - **Registry**: register, unregister, reaping of finished components
//! - **Delivery failures**: full or closed mailboxes at `warn`

use crate::config::{LogConfig, LogFormat};
use crate::error::{Result, TheaterError};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Installs the global subscriber described by `config`.
///
/// Fails with [`TheaterError::Config`] on a bad filter directive, an unwritable
/// log file, or when a subscriber is already installed.
pub fn setup_tracing(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| TheaterError::Config(format!("invalid log level '{}': {e}", config.level)))?;

    let console = config.enable_console.then(|| match config.message_format {
        LogFormat::Compact => fmt::layer()
            .with_target(false)
            .with_timer(ChronoLocal::new(config.time_format.clone()))
            .compact()
            .boxed(),
        LogFormat::Full => fmt::layer()
            .with_timer(ChronoLocal::new(config.time_format.clone()))
            .boxed(),
    });

    let file = match &config.file_path {
        Some(path) => {
            let sink = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    TheaterError::Config(format!("cannot open log file {}: {e}", path.display()))
                })?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_timer(ChronoLocal::new(config.time_format.clone()))
                    .with_writer(Mutex::new(sink))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| TheaterError::Config(e.to_string()))?;

    info!(logger = %config.name, level = %config.level, "Logging installed");
    Ok(())
}
