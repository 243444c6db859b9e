//! # Theater Framework
//!
//! This crate provides the building blocks for supervised, heartbeat-monitored
//! component trees. Every component is a small state machine that polls its
//! own bounded mailbox on a fixed tick and does its own work in between.
//! Supervision is done with messages only: a **conductor** keeps a registry of
//! the components it started, relays liveness checks, and stops them on demand.
//!
//! ## Why Poll Instead of Await?
//!
//! A component never blocks on its mailbox. It takes at most one message per
//! tick, then sleeps for the rest of that tick, then after `pausetime` ticks
//! runs its resume phase. That gives three properties that are easy to test:
//!
//! - **Bounded cadence**: a flood of messages cannot starve the resume phase
//! - **Predictable shutdown**: `INTERRUPT` is seen within one tick
//! - **Deterministic tests**: with paused tokio time every tick is reproducible
//!
//! ## The Cast
//!
//! | Role | Type | Answers to a supervisor | Extra |
//! |------|------|-------------------------|-------|
//! | Passive component | anything implementing [`Pollable`] | no | |
//! | Musician | [`Musician<P>`](musician::Musician) | yes | runs a [`Performance`] |
//! | Delegating musician | [`DelegatingMusician<T>`](delegating::DelegatingMusician) | yes | work on a background worker, custom status |
//! | Monitor | [`Monitor`](monitor::Monitor) | yes | triggers heartbeat sweeps |
//! | Conductor | [`Conductor`] | optionally | registry, repertoire, fan-out |
//!
//! Roles are composed from capabilities ([`Pollable`], [`RepliesToSupervisor`])
//! rather than derived from each other.
//!
//! ## Architecture Overview
//!
//! 1. **Envelope layer** ([`message`]): validated, immutable [`Message`]s
//! 2. **Transport layer** ([`channel`]): a bounded mailbox split into [`Producer`] / [`Consumer`]
//! 3. **Runtime layer** ([`component`]): the [`Stage`] run loop and [`ProcessHandle`]
//! 4. **Supervision layer** ([`conductor`], [`monitor`]): registry, heartbeats, lifecycle
//!
//! ## Quick Start
//!
//! ```rust
//! use async_trait::async_trait;
//! use std::time::Duration;
//! use theater_framework::{
//!     ComponentConfig, ConductorConfig, Conductor, ControlClient, Monitor, Musician,
//!     Performance, Repertoire, Result, SupervisorLink,
//! };
//!
//! struct Metronome;
//!
//! #[async_trait]
//! impl Performance for Metronome {
//!     async fn perform(&mut self, link: &SupervisorLink) -> Result<()> {
//!         tracing::debug!(component = %link.name(), "tick");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut repertoire = Repertoire::new();
//!     repertoire.add("monitor", |_config, link| Ok(Monitor::new(link)));
//!     repertoire.add("metronome", |_config, link| Ok(Musician::new(link, Metronome)));
//!
//!     let tick = Duration::from_millis(5);
//!     let config = ConductorConfig::new(ComponentConfig::new("conductor").with_tick(tick));
//!     let (mut conductor, inbox) = Conductor::new(config, repertoire, None)?;
//!     conductor.summon("monitor", ComponentConfig::new("monitor").with_tick(tick))?;
//!     conductor.summon("metronome", ComponentConfig::new("metronome").with_tick(tick))?;
//!
//!     let control = ControlClient::new("operator", conductor.mailbox().clone())?;
//!     let process = conductor.into_stage(inbox)?.spawn();
//!
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     control.interrupt().await?;
//!     let end = process.join().await.expect("conductor ended");
//!     assert_eq!(end.reason(), "Interrupted by INTERRUPT message");
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - Each component runs in its own Tokio task
//! - Messages are processed **sequentially** within a component
//! - A mailbox has one reader (its component) and any number of writers
//! - The registry is only ever touched by its conductor's own loop
//!
//! ## Testing
//!
//! The [`mock`] module provides [`MailboxProbe`](mock::MailboxProbe), the consumer
//! half of a mailbox with assertion helpers. Hand its producer to the component
//! under test as the supervisor channel and check what comes out.

pub mod channel;
pub mod client;
pub mod component;
pub mod conductor;
pub mod config;
pub mod delegating;
pub mod error;
pub mod message;
pub mod mock;
pub mod monitor;
pub mod musician;
pub mod tracing;

// Re-export core types for convenience
pub use channel::{Consumer, Mailbox, Producer};
pub use client::ControlClient;
pub use component::{Pollable, ProcessHandle, ScoreEnd, Stage};
pub use conductor::{Casting, Conductor, ManagedComponent, Registry, Repertoire};
pub use config::{ComponentConfig, ConductorConfig, LogConfig, LogFormat};
pub use delegating::{CustomStatus, DelegatedTask, DelegatingMusician, StatusCell};
pub use error::{Result, TheaterError};
pub use message::{Body, Message, MessageBuilder, MsgType, Signal, Status, Timestamp};
pub use monitor::Monitor;
pub use musician::{Musician, Performance, RepliesToSupervisor, SupervisorLink};
