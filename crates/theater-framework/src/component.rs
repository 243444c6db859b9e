//! # Component State Machine
//!
//! This module defines the control loop shared by every actor role in the theater.
//!
//! ## The Poll / Resume Cycle
//!
//! A component alternates between two phases until it is interrupted:
//!
//! 1. **Poll phase**: for `pausetime` ticks, try to dequeue *one* message from the
//!    mailbox without blocking and dispatch it by [`Signal`] to the matching
//!    `handle_*` hook. Then sleep for the rest of the tick. A backlog is drained one
//!    message per tick, never in a batch.
//! 2. **Resume phase**: call [`Pollable::on_resume`], the component's own work,
//!    then go back to polling.
//!
//! If a handler returns [`Signal::Interrupt`], the loop calls
//! [`Pollable::on_interrupt`] once and ends with a [`ScoreEnd`]. That value is the
//! designed shutdown path, not an error.
//!
//! ```text
//!            ┌──────────── pausetime ticks ────────────┐
//!  Stage ──► │ poll → dispatch → sleep │ poll → ... │ ──► on_resume() ──┐
//!     ▲      └─────────────────────────────────────────┘                │
//!     └──────────────────────────────────────────────────────────────────┘
//!            INTERRUPT ──► on_interrupt() ──► ScoreEnd
//! ```
//!
//! ## Roles as Capabilities
//!
//! [`Pollable`] is the only capability every role shares. Roles that answer a
//! supervisor add [`RepliesToSupervisor`](crate::musician::RepliesToSupervisor);
//! the conductor additionally owns a [`Registry`](crate::conductor::Registry).
//! A plain struct implementing only `Pollable` is a *passive* component.

use crate::channel::{Consumer, Mailbox};
use crate::config::ComponentConfig;
use crate::error::{Result, TheaterError};
use crate::message::{Message, Signal};
use async_trait::async_trait;
use std::fmt::{self, Display};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Why a control loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEnd {
    reason: String,
}

impl ScoreEnd {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for ScoreEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Outcome of one poll window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    End(ScoreEnd),
}

/// Outcome of a single tick's poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polled {
    /// The mailbox was empty.
    Nothing,
    /// One message was dispatched; carries the handler's answer.
    Handled(Option<Signal>),
    /// Every producer is gone; nothing can ever arrive again.
    Closed,
}

/// The capability shared by every component: react to messages, do work in between.
///
/// Every `handle_*` hook has an identity default that just echoes its own
/// signal. Override the ones your role cares about.
#[async_trait]
pub trait Pollable: Send {
    fn name(&self) -> &str;

    fn handle_beat(&mut self, _msg: &Message) -> Option<Signal> {
        Some(Signal::Beat)
    }

    fn handle_trigger(&mut self, _msg: &Message) -> Option<Signal> {
        Some(Signal::Trigger)
    }

    fn handle_update(&mut self, _msg: &Message) -> Option<Signal> {
        Some(Signal::Update)
    }

    fn handle_interrupt(&mut self, _msg: &Message) -> Option<Signal> {
        Some(Signal::Interrupt)
    }

    fn handle_create(&mut self, _msg: &Message) -> Option<Signal> {
        Some(Signal::Create)
    }

    fn handle_kill(&mut self, _msg: &Message) -> Option<Signal> {
        Some(Signal::Kill)
    }

    /// Runs right before the loop ends because of an `INTERRUPT`.
    fn on_interrupt(&mut self) {}

    /// Runs after a message was dequeued and before it is dispatched.
    fn before_dispatch(&mut self, _msg: &Message) {}

    /// Runs at the end of every poll, whether or not a message was handled.
    fn after_poll(&mut self) {}

    /// The component's own work, executed after each poll window.
    async fn on_resume(&mut self) -> Result<()>;

    /// Last chance to clean up once the loop has decided to stop.
    async fn on_score_end(&mut self, _end: &ScoreEnd) {}
}

/// Routes a message to the handler matching its signal.
pub fn dispatch<C: Pollable + ?Sized>(component: &mut C, msg: &Message) -> Option<Signal> {
    match msg.signal() {
        Signal::Beat => component.handle_beat(msg),
        Signal::Trigger => component.handle_trigger(msg),
        Signal::Update => component.handle_update(msg),
        Signal::Interrupt => component.handle_interrupt(msg),
        Signal::Create => component.handle_create(msg),
        Signal::Kill => component.handle_kill(msg),
    }
}

/// Runs a component's control loop over its own mailbox.
pub struct Stage<C: Pollable> {
    component: C,
    inbox: Consumer,
    pausetime: u32,
    tick: Duration,
}

impl<C: Pollable + 'static> Stage<C> {
    pub fn new(component: C, inbox: Consumer, pausetime: u32, tick: Duration) -> Result<Self> {
        if pausetime == 0 {
            return Err(TheaterError::InvalidArgument(format!(
                "{}: pausetime must be at least 1 tick",
                component.name()
            )));
        }
        if tick.is_zero() {
            return Err(TheaterError::InvalidArgument(format!(
                "{}: a tick cannot be zero",
                component.name()
            )));
        }
        Ok(Self {
            component,
            inbox,
            pausetime,
            tick,
        })
    }

    pub fn from_config(component: C, inbox: Consumer, config: &ComponentConfig) -> Result<Self> {
        config.validate()?;
        Self::new(component, inbox, config.pausetime, config.tick())
    }

    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut C {
        &mut self.component
    }

    /// Dequeues and dispatches at most one message.
    pub fn poll(&mut self) -> Polled {
        let polled = match self.inbox.try_receive() {
            Ok(msg) => {
                debug!(
                    component = %self.component.name(),
                    sender = %msg.sender(),
                    signal = %msg.signal(),
                    msg_type = %msg.msg_type(),
                    "Dispatch"
                );
                self.component.before_dispatch(&msg);
                Polled::Handled(dispatch(&mut self.component, &msg))
            }
            Err(TheaterError::Closed) => Polled::Closed,
            Err(_) => Polled::Nothing,
        };
        self.component.after_poll();
        polled
    }

    /// One poll window: `pausetime` ticks of poll-then-sleep.
    pub async fn pause(&mut self) -> Flow {
        for _ in 0..self.pausetime {
            let started = Instant::now();
            match self.poll() {
                Polled::Handled(Some(Signal::Interrupt)) => {
                    self.component.on_interrupt();
                    return Flow::End(ScoreEnd::new("Interrupted by INTERRUPT message"));
                }
                Polled::Closed => return Flow::End(ScoreEnd::new("Mailbox closed")),
                Polled::Handled(_) | Polled::Nothing => {}
            }
            tokio::time::sleep_until(started + self.tick).await;
        }
        Flow::Continue
    }

    /// Alternates poll windows and resume phases until the score ends.
    pub async fn run(mut self) -> ScoreEnd {
        let name = self.component.name().to_string();
        info!(component = %name, pausetime = self.pausetime, tick = ?self.tick, "Component started");

        loop {
            if let Flow::End(end) = self.pause().await {
                self.component.on_score_end(&end).await;
                info!(component = %name, reason = %end, "Score end");
                return end;
            }
            if let Err(e) = self.component.on_resume().await {
                error!(component = %name, error = %e, "Resume phase failed");
            }
        }
    }

    /// Runs the loop on its own tokio task.
    pub fn spawn(self) -> ProcessHandle {
        ProcessHandle::from_join(tokio::spawn(self.run()))
    }
}

/// Cloneable handle to a running control loop.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    join: Arc<Mutex<Option<JoinHandle<ScoreEnd>>>>,
}

impl ProcessHandle {
    pub fn from_join(join: JoinHandle<ScoreEnd>) -> Self {
        Self {
            join: Arc::new(Mutex::new(Some(join))),
        }
    }

    /// True once the loop has returned (or was already joined).
    pub fn is_finished(&self) -> bool {
        self.join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the loop to end. Returns `None` if it was already joined or panicked.
    pub async fn join(&self) -> Option<ScoreEnd> {
        let handle = self.join.lock().unwrap_or_else(PoisonError::into_inner).take()?;
        match handle.await {
            Ok(end) => Some(end),
            Err(e) => {
                warn!(error = %e, "Component task did not finish cleanly");
                None
            }
        }
    }

    /// Like [`join`](Self::join) but gives up after `limit`, leaving the loop running.
    pub async fn join_timeout(&self, limit: Duration) -> Option<ScoreEnd> {
        let mut handle = self.join.lock().unwrap_or_else(PoisonError::into_inner).take()?;
        match tokio::time::timeout(limit, &mut handle).await {
            Ok(Ok(end)) => Some(end),
            Ok(Err(e)) => {
                warn!(error = %e, "Component task did not finish cleanly");
                None
            }
            Err(_) => {
                *self.join.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                None
            }
        }
    }
}
