//! # Mailbox Probes & Testing Guide
//!
//! Components talk only through mailboxes, so the easiest way to test one is to
//! hand it a producer whose consumer half sits in the test. [`MailboxProbe`]
//! is that consumer half with assertion helpers.
//!
//! ## When to use a Probe vs a Running Stage
//!
//! | Feature | Probe + `dispatch` | Spawned `Stage` |
//! |---------|--------------------|-----------------|
//! | **Speed** | Instant, no tasks | Needs ticks (use `start_paused`) |
//! | **Determinism** | 100% | Subject to the tick schedule |
//! | **Covers** | One handler at a time | Poll cadence, resume phases, shutdown |
//! | **Use Case** | Reply formats, fan-out rules | End-to-end supervision trees |
//!
//! ## Pattern 0: Handler Test
//!
//! ```rust
//! use theater_framework::component::dispatch;
//! use theater_framework::message::{Body, Message, MsgType, Signal};
//! use theater_framework::mock::MailboxProbe;
//! use theater_framework::monitor::Monitor;
//! use theater_framework::SupervisorLink;
//!
//! let (supervisor, mut probe) = MailboxProbe::pair(8);
//! let mut monitor = Monitor::new(SupervisorLink::new("monitor", supervisor).unwrap());
//!
//! let ping = Message::build("conductor", Signal::Beat, MsgType::None, Body::None, None).unwrap();
//! dispatch(&mut monitor, &ping);
//!
//! let ack = probe.expect(Signal::Beat, MsgType::None);
//! assert_eq!(ack.sender(), "monitor");
//! probe.assert_silent();
//! ```
//!
//! ## Pattern 1: Running Stage
//!
//! Spawn the component with [`Stage::spawn`](crate::component::Stage::spawn),
//! drive it with a [`ControlClient`](crate::client::ControlClient), and wait on
//! the probe with [`MailboxProbe::next_within`]. Tests written this way should
//! use `#[tokio::test(start_paused = true)]` so ticks elapse instantly.
//!
//! The helpers panic on mismatch; they are meant for tests only.

use crate::channel::{self, Consumer, Mailbox, Producer};
use crate::message::{Message, MsgType, Signal, Status};
use std::time::Duration;

/// Test-side consumer of a mailbox.
#[derive(Debug)]
pub struct MailboxProbe {
    inbox: Consumer,
}

impl MailboxProbe {
    pub fn new(inbox: Consumer) -> Self {
        Self { inbox }
    }

    /// A fresh mailbox whose producer half goes to the component under test.
    pub fn pair(capacity: usize) -> (Producer, Self) {
        match channel::pair(capacity) {
            Ok((producer, consumer)) => (producer, Self::new(consumer)),
            Err(e) => panic!("cannot build probe mailbox: {e}"),
        }
    }

    /// The next queued message, if any.
    pub fn next(&mut self) -> Option<Message> {
        self.inbox.try_receive().ok()
    }

    /// Waits up to `limit` for the next message.
    pub async fn next_within(&mut self, limit: Duration) -> Option<Message> {
        self.inbox.receive(Some(limit)).await.ok()
    }

    /// Takes the next message and checks its signal and type.
    pub fn expect(&mut self, signal: Signal, msg_type: MsgType) -> Message {
        let Some(msg) = self.next() else {
            panic!("expected {signal}/{msg_type}, mailbox is empty");
        };
        assert_eq!(
            (msg.signal(), msg.msg_type()),
            (signal, msg_type),
            "unexpected message from {}",
            msg.sender()
        );
        msg
    }

    /// Takes the next message, which must be a `BEAT/STATUS`, and returns its status.
    pub fn expect_status(&mut self) -> (String, Status) {
        let msg = self.expect(Signal::Beat, MsgType::Status);
        match msg.body().as_status() {
            Some(status) => (msg.sender().to_string(), status.clone()),
            None => panic!("BEAT/STATUS from {} carries no status", msg.sender()),
        }
    }

    /// Everything currently queued, in order.
    pub fn drain(&mut self) -> Vec<Message> {
        std::iter::from_fn(|| self.next()).collect()
    }

    pub fn assert_silent(&mut self) {
        if let Some(msg) = self.next() {
            panic!(
                "expected no message, got {}/{} from {}",
                msg.signal(),
                msg.msg_type(),
                msg.sender()
            );
        }
    }

    pub fn len(&self) -> usize {
        self.inbox.size()
    }

    pub fn is_empty(&self) -> bool {
        self.inbox.is_empty()
    }
}
