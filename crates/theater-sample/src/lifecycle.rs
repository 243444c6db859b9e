//! # Orchestra Lifecycle
//!
//! Wires a whole supervision tree from a [`TheaterConfig`]:
//!
//! 1. **Repertoire**: [`repertoire`] maps each role name to its constructor
//! 2. **Conductor**: built from the config, owns the registry
//! 3. **Cast**: every [`CastEntry`](crate::config::CastEntry) is summoned in order
//! 4. **Run**: the conductor's stage is spawned on its own task
//!
//! Shutdown goes through the conductor's own mailbox: [`Orchestra::shutdown`]
//! sends `INTERRUPT`, the conductor forwards it to every child and waits for
//! them, then its own loop ends.

use crate::config::TheaterConfig;
use crate::error::SampleError;
use crate::players::{Copyist, Metronome};
use theater_framework::{
    Conductor, ControlClient, DelegatingMusician, Monitor, Musician, ProcessHandle, Repertoire,
    ScoreEnd,
};
use tracing::info;

/// Roles this sample knows how to summon.
pub fn repertoire() -> Repertoire {
    let mut repertoire = Repertoire::new();
    repertoire
        .add("monitor", |_config, link| Ok(Monitor::new(link)))
        .add("metronome", |config, link| {
            Ok(Musician::new(link, Metronome::from_config(config)))
        })
        .add("copyist", |config, link| {
            Ok(DelegatingMusician::new(link, Copyist::from_config(config)))
        });
    repertoire
}

/// A running supervision tree.
pub struct Orchestra {
    control: ControlClient,
    process: ProcessHandle,
    cast: Vec<String>,
}

impl Orchestra {
    /// Builds the tree described by `config` and starts it. Must run inside a tokio runtime.
    pub fn start(config: &TheaterConfig) -> Result<Self, SampleError> {
        config.validate()?;
        let (mut conductor, inbox) = Conductor::new(config.conductor.clone(), repertoire(), None)?;

        let mut cast = Vec::with_capacity(config.cast.len());
        for entry in &config.cast {
            let uuid = conductor.summon(&entry.role, entry.config.clone())?;
            info!(role = %entry.role, name = %entry.config.name, uuid = %uuid, "Cast member ready");
            cast.push(entry.config.name.clone());
        }

        let control = ControlClient::new("orchestra", conductor.mailbox().clone())?;
        let process = conductor.into_stage(inbox)?.spawn();
        Ok(Self {
            control,
            process,
            cast,
        })
    }

    /// Handle for sending control messages to the conductor.
    pub fn control(&self) -> &ControlClient {
        &self.control
    }

    pub fn cast(&self) -> &[String] {
        &self.cast
    }

    pub fn is_finished(&self) -> bool {
        self.process.is_finished()
    }

    /// Interrupts the conductor and waits for the whole tree to stop.
    pub async fn shutdown(self) -> Result<ScoreEnd, SampleError> {
        info!(cast = self.cast.len(), "Shutting down orchestra");
        self.control.interrupt().await?;
        let end = self
            .process
            .join()
            .await
            .unwrap_or_else(|| ScoreEnd::new("Conductor task was lost"));
        info!(reason = %end, "Orchestra stopped");
        Ok(end)
    }
}
