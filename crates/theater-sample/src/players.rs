//! # Sample Players
//!
//! Two small roles that show the two ways of doing work:
//!
//! - [`Metronome`]: a [`Performance`] that does its (cheap) work inline in
//!   every resume phase.
//! - [`Copyist`]: a [`DelegatedTask`] whose slow work runs on the delegating
//!   musician's background worker and reports progress through its status.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use theater_framework::delegating::WORKING;
use theater_framework::{
    Body, ComponentConfig, DelegatedTask, Message, Performance, Result, Signal, StatusCell,
    SupervisorLink,
};
use tracing::{debug, info};

/// Counts beats and logs the tempo marking it was given.
#[derive(Debug)]
pub struct Metronome {
    marking: String,
    beats: u64,
}

impl Metronome {
    pub fn from_config(config: &ComponentConfig) -> Self {
        Self {
            marking: config.option_str("marking").unwrap_or("andante").to_string(),
            beats: 0,
        }
    }

    pub fn beats(&self) -> u64 {
        self.beats
    }

    pub fn marking(&self) -> &str {
        &self.marking
    }
}

#[async_trait]
impl Performance for Metronome {
    async fn perform(&mut self, link: &SupervisorLink) -> Result<()> {
        self.beats += 1;
        debug!(component = %link.name(), beats = self.beats, marking = %self.marking, "Tick");
        Ok(())
    }

    /// A `TEXT` update changes the tempo marking.
    fn handle_update(&mut self, msg: &Message, link: &SupervisorLink) -> Option<Signal> {
        if let Some(marking) = msg.body().as_text() {
            info!(component = %link.name(), from = %self.marking, to = %marking, "Tempo change");
            self.marking = marking.to_string();
        }
        Some(Signal::Update)
    }
}

/// Copies parts slowly; each run copies one page.
#[derive(Debug)]
pub struct Copyist {
    work: Duration,
    pages: Arc<AtomicU64>,
}

impl Copyist {
    pub fn from_config(config: &ComponentConfig) -> Self {
        Self {
            work: Duration::from_millis(config.option_u64("work_ms").unwrap_or(1500)),
            pages: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn pages(&self) -> u64 {
        self.pages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DelegatedTask for Copyist {
    async fn run(&self, status: StatusCell) -> Result<()> {
        let page = self.pages.load(Ordering::SeqCst) + 1;
        status.set(WORKING, Some(format!("Copying page {page}")));
        tokio::time::sleep(self.work).await;
        self.pages.store(page, Ordering::SeqCst);
        Ok(())
    }

    /// A `MAP` trigger with `{"reset": true}` starts over at page one.
    fn handle_trigger(&self, msg: &Message, link: &SupervisorLink) -> Option<Signal> {
        if let Body::Map(map) = msg.body() {
            if map.get("reset") == Some(&Value::Bool(true)) {
                info!(component = %link.name(), "Starting over");
                self.pages.store(0, Ordering::SeqCst);
            }
        }
        Some(Signal::Trigger)
    }
}
