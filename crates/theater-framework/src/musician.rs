//! # Musicians
//!
//! A musician is a component that answers to a supervisor. It holds a
//! [`SupervisorLink`]: its own name, the producer half of the supervisor's
//! mailbox, and the time it started.
//!
//! The reply behavior lives in the [`RepliesToSupervisor`] capability, so
//! any role (plain musician, delegating musician, conductor, monitor) gets
//! the same heartbeat protocol by implementing two accessors:
//!
//! | Incoming `BEAT` body | Reply |
//! |----------------------|-------|
//! | `NONE`   | `BEAT/NONE` acknowledgement |
//! | `STATUS` | `BEAT/STATUS` with `reqtime` echoed, the role's status, `time = now` |
//!
//! Before its loop ends on `INTERRUPT`, a musician sends a last `BEAT/STATUS`
//! with status `"Interrupted"`.
//!
//! Replies never block: a full supervisor mailbox goes to
//! [`RepliesToSupervisor::on_send_failure`] and the heartbeat is simply lost.

use crate::channel::{Mailbox, Producer};
use crate::component::Pollable;
use crate::error::{Result, TheaterError};
use crate::message::{Body, Message, MsgType, Signal, Status, Timestamp};
use async_trait::async_trait;
use chrono::Local;
use tracing::warn;

pub const RUNNING: &str = "Running";
pub const INTERRUPTED: &str = "Interrupted";

/// A musician's way back to its supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorLink {
    name: String,
    supervisor: Producer,
    started: Timestamp,
}

impl SupervisorLink {
    pub fn new(name: impl Into<String>, supervisor: Producer) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(TheaterError::InvalidArgument(
                "can't create an unnamed musician".into(),
            ));
        }
        Ok(Self {
            name,
            supervisor,
            started: Local::now(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn started(&self) -> Timestamp {
        self.started
    }

    pub fn supervisor(&self) -> &Producer {
        &self.supervisor
    }

    /// Sends a message to the supervisor, signed with this musician's name.
    pub fn answer(&self, signal: Signal, msg_type: MsgType, body: Body) -> Result<()> {
        let msg = Message::build(self.name.as_str(), signal, msg_type, body, None)?;
        self.supervisor.try_send(msg)
    }
}

/// Heartbeat protocol of every role that has a supervisor.
pub trait RepliesToSupervisor {
    fn link(&self) -> &SupervisorLink;

    /// Called for every reply that could not be enqueued.
    fn on_send_failure(&mut self, error: TheaterError) {
        warn!(
            component = %self.link().name(),
            error = %error,
            kind = error.as_label(),
            "Dropped message to supervisor"
        );
    }

    /// The status a `BEAT/STATUS` request is answered with.
    fn status_answer(&self, request: &Status) -> Status {
        request
            .clone()
            .with_status(Some(RUNNING.to_string()))
            .with_time(Some(Local::now()))
            .with_statustime(Some(self.link().started()))
            .with_statusmessage(None)
    }

    fn answer_supervisor(&mut self, signal: Signal, msg_type: MsgType, body: Body) {
        let sent = self.link().answer(signal, msg_type, body);
        if let Err(e) = sent {
            self.on_send_failure(e);
        }
    }

    /// Standard `BEAT` handling: acknowledge pings, answer status requests.
    fn reply_to_beat(&mut self, msg: &Message) -> Option<Signal> {
        match msg.body() {
            Body::None => {
                self.answer_supervisor(Signal::Beat, MsgType::None, Body::None);
                Some(Signal::Beat)
            }
            Body::Status(request) => {
                let answer = self.status_answer(request);
                self.answer_supervisor(Signal::Beat, MsgType::Status, answer.into());
                Some(Signal::Beat)
            }
            _ => None,
        }
    }

    fn report_interrupted(&mut self) {
        let now = Local::now();
        let notice = Status::new(
            None,
            Some(INTERRUPTED.to_string()),
            Some(now),
            Some(now),
            Some("End of actors execution".to_string()),
        );
        self.answer_supervisor(Signal::Beat, MsgType::Status, notice.into());
    }
}

/// The application side of a [`Musician`].
///
/// Every hook receives the musician's [`SupervisorLink`] so it can talk to
/// the supervisor without owning the channel.
#[async_trait]
pub trait Performance: Send + 'static {
    /// The work done in each resume phase.
    async fn perform(&mut self, link: &SupervisorLink) -> Result<()>;

    fn handle_trigger(&mut self, _msg: &Message, _link: &SupervisorLink) -> Option<Signal> {
        Some(Signal::Trigger)
    }

    fn handle_update(&mut self, _msg: &Message, _link: &SupervisorLink) -> Option<Signal> {
        Some(Signal::Update)
    }

    fn handle_create(&mut self, _msg: &Message, _link: &SupervisorLink) -> Option<Signal> {
        Some(Signal::Create)
    }

    fn handle_kill(&mut self, _msg: &Message, _link: &SupervisorLink) -> Option<Signal> {
        Some(Signal::Kill)
    }

    /// Sees every reply the musician failed to deliver, after it was logged.
    fn on_send_failure(&mut self, _error: &TheaterError) {}
}

/// A supervised component running a [`Performance`].
pub struct Musician<P: Performance> {
    link: SupervisorLink,
    part: P,
}

impl<P: Performance> Musician<P> {
    pub fn new(link: SupervisorLink, part: P) -> Self {
        Self { link, part }
    }

    pub fn part(&self) -> &P {
        &self.part
    }
}

impl<P: Performance> RepliesToSupervisor for Musician<P> {
    fn link(&self) -> &SupervisorLink {
        &self.link
    }

    fn on_send_failure(&mut self, error: TheaterError) {
        warn!(component = %self.link.name(), error = %error, "Dropped message to supervisor");
        self.part.on_send_failure(&error);
    }
}

#[async_trait]
impl<P: Performance> Pollable for Musician<P> {
    fn name(&self) -> &str {
        self.link.name()
    }

    fn handle_beat(&mut self, msg: &Message) -> Option<Signal> {
        self.reply_to_beat(msg)
    }

    fn handle_trigger(&mut self, msg: &Message) -> Option<Signal> {
        self.part.handle_trigger(msg, &self.link)
    }

    fn handle_update(&mut self, msg: &Message) -> Option<Signal> {
        self.part.handle_update(msg, &self.link)
    }

    fn handle_create(&mut self, msg: &Message) -> Option<Signal> {
        self.part.handle_create(msg, &self.link)
    }

    fn handle_kill(&mut self, msg: &Message) -> Option<Signal> {
        self.part.handle_kill(msg, &self.link)
    }

    fn on_interrupt(&mut self) {
        self.report_interrupted();
    }

    async fn on_resume(&mut self) -> Result<()> {
        self.part.perform(&self.link).await
    }
}
