//! # Monitor
//!
//! The heartbeat aggregator. Each resume phase it asks its conductor for a
//! status sweep by sending a `BEAT/STATUS` request upward; the conductor
//! relays every child's answer back, and the monitor logs one line per answer:
//!
//! ```text
//! violin[Running since 2024-05-01 10:00:00] requested 10:00:05, answered 10:00:05: -
//! ```

use crate::component::Pollable;
use crate::error::Result;
use crate::message::{Body, Message, MsgType, Signal, Status, Timestamp};
use crate::musician::{RepliesToSupervisor, SupervisorLink};
use async_trait::async_trait;
use chrono::Local;
use tracing::info;

/// The only state a monitor ever reports.
pub const MONITOR_STATUS: &str = "RUNNING";

pub struct Monitor {
    link: SupervisorLink,
}

impl Monitor {
    pub fn new(link: SupervisorLink) -> Self {
        Self { link }
    }

    pub fn resolve_status(&self) -> &'static str {
        MONITOR_STATUS
    }
}

fn stamp(time: Option<Timestamp>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// One log line for a relayed status answer.
pub fn render_status(sender: &str, status: &Status) -> String {
    format!(
        "{sender}[{} since {}] requested {}, answered {}: {}",
        status.status().unwrap_or("-"),
        stamp(status.statustime()),
        stamp(status.reqtime()),
        stamp(status.time()),
        status.statusmessage().unwrap_or("-"),
    )
}

impl RepliesToSupervisor for Monitor {
    fn link(&self) -> &SupervisorLink {
        &self.link
    }

    fn status_answer(&self, request: &Status) -> Status {
        request
            .clone()
            .with_status(Some(self.resolve_status().to_string()))
            .with_time(Some(Local::now()))
            .with_statustime(Some(self.link.started()))
            .with_statusmessage(None)
    }
}

#[async_trait]
impl Pollable for Monitor {
    fn name(&self) -> &str {
        self.link.name()
    }

    fn handle_beat(&mut self, msg: &Message) -> Option<Signal> {
        match msg.body() {
            Body::None => {
                info!(component = %self.link.name(), from = %msg.sender(), "Heartbeat check from supervisor");
                self.answer_supervisor(Signal::Beat, MsgType::None, Body::None);
                Some(Signal::Beat)
            }
            Body::Status(status) => {
                info!("{}", render_status(msg.sender(), status));
                Some(Signal::Beat)
            }
            _ => None,
        }
    }

    /// Nothing below the monitor to stop.
    fn handle_kill(&mut self, _msg: &Message) -> Option<Signal> {
        None
    }

    fn on_interrupt(&mut self) {
        self.report_interrupted();
    }

    async fn on_resume(&mut self) -> Result<()> {
        self.answer_supervisor(
            Signal::Beat,
            MsgType::Status,
            Status::request(Local::now()).into(),
        );
        info!(
            "{}[{} since {}]",
            self.link.name(),
            self.resolve_status(),
            stamp(Some(self.link.started()))
        );
        Ok(())
    }
}
