//! # Theater Sample
//!
//! A runnable supervision tree built on `theater-framework`.
//!
//! ## 🚀 What Runs
//!
//! - **conductor**: supervises everything below and relays heartbeats
//! - **monitor**: asks for a status sweep every few ticks and logs every answer
//! - **metronome**: a plain musician doing cheap work inline
//! - **copyist**: a delegating musician doing slow work on a background worker
//!
//! ## 📚 Usage
//!
//! ```bash
//! cargo run -p theater-sample                      # built-in cast, stop with Ctrl-C
//! cargo run -p theater-sample -- theater.toml      # cast and logging from a file
//! ```

use std::time::Duration;
use theater_framework::tracing::setup_tracing;
use theater_sample::{Orchestra, SampleError, TheaterConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), SampleError> {
    let config = match std::env::args().nth(1) {
        Some(path) => TheaterConfig::load(path)?,
        None => TheaterConfig::default(),
    };

    // Setup tracing once for the entire application
    setup_tracing(&config.logging)?;

    let orchestra = Orchestra::start(&config)?;
    info!(cast = ?orchestra.cast(), "Orchestra started");

    match config.run_for_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => info!(secs, "Run time elapsed"),
                _ = tokio::signal::ctrl_c() => info!("Ctrl-C received"),
            }
        }
        None => {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Cannot listen for Ctrl-C, stopping now");
            } else {
                info!("Ctrl-C received");
            }
        }
    }

    let end = orchestra.shutdown().await?;
    info!(reason = %end, "Application completed");
    Ok(())
}
