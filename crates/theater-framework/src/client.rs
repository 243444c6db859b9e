//! # Control Client
//!
//! This module defines the handle used to drive a component from outside its
//! supervision tree: the sample binary's signal handler, tests, an operator
//! console.

use crate::channel::{Mailbox, Producer};
use crate::error::{Result, TheaterError};
use crate::message::{Body, Message, MsgType, Signal, Status};
use chrono::Local;
use std::time::Duration;

/// ## ControlClient
///
/// Sends control messages into one component's mailbox, signed with a fixed
/// sender name.
///
/// * **Cloneable**: holds only a [`Producer`], so cloning is inexpensive.
/// * **Async API**: every method waits for mailbox room, up to the configured timeout.
/// * **Fire and forget**: answers, if any, go to the component's supervisor, not back here.
#[derive(Debug, Clone)]
pub struct ControlClient {
    sender: String,
    target: Producer,
    timeout: Option<Duration>,
}

impl ControlClient {
    pub fn new(sender: impl Into<String>, target: Producer) -> Result<Self> {
        let sender = sender.into();
        if sender.is_empty() {
            return Err(TheaterError::InvalidArgument(
                "a control client needs a sender name".into(),
            ));
        }
        Ok(Self {
            sender,
            target,
            timeout: Some(Duration::from_secs(1)),
        })
    }

    /// `None` waits for room indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    async fn post(&self, signal: Signal, msg_type: MsgType, body: Body) -> Result<()> {
        let msg = Message::build(self.sender.as_str(), signal, msg_type, body, None)?;
        self.target.send(msg, self.timeout).await
    }

    /// `BEAT/NONE`: a bare liveness ping.
    pub async fn ping(&self) -> Result<()> {
        self.post(Signal::Beat, MsgType::None, Body::None).await
    }

    /// `BEAT/STATUS` request stamped with the current time.
    pub async fn request_status(&self) -> Result<()> {
        self.post(
            Signal::Beat,
            MsgType::Status,
            Status::request(Local::now()).into(),
        )
        .await
    }

    pub async fn trigger(&self, body: impl Into<Body>) -> Result<()> {
        let body = body.into();
        self.post(Signal::Trigger, body.shape(), body).await
    }

    pub async fn update(&self, body: impl Into<Body>) -> Result<()> {
        let body = body.into();
        self.post(Signal::Update, body.shape(), body).await
    }

    /// Asks a conductor to stop and unregister the child called `target`.
    pub async fn kill(&self, target: &str) -> Result<()> {
        self.post(Signal::Kill, MsgType::Text, Body::from(target)).await
    }

    pub async fn interrupt(&self) -> Result<()> {
        self.post(Signal::Interrupt, MsgType::None, Body::None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MailboxProbe;

    #[tokio::test]
    async fn each_call_sends_one_well_formed_message() {
        let (target, mut probe) = MailboxProbe::pair(8);
        let client = ControlClient::new("operator", target).unwrap();

        client.ping().await.unwrap();
        client.request_status().await.unwrap();
        client.trigger("go").await.unwrap();
        client.update(Body::None).await.unwrap();
        client.kill("violin").await.unwrap();
        client.interrupt().await.unwrap();

        probe.expect(Signal::Beat, MsgType::None);
        let (sender, status) = probe.expect_status();
        assert_eq!(sender, "operator");
        assert!(status.is_request());
        assert_eq!(
            probe.expect(Signal::Trigger, MsgType::Text).body().as_text(),
            Some("go")
        );
        probe.expect(Signal::Update, MsgType::None);
        assert_eq!(
            probe.expect(Signal::Kill, MsgType::Text).body().as_text(),
            Some("violin")
        );
        probe.expect(Signal::Interrupt, MsgType::None);
        probe.assert_silent();
    }

    #[tokio::test(start_paused = true)]
    async fn full_target_times_out() {
        let (target, _probe) = MailboxProbe::pair(1);
        let client = ControlClient::new("operator", target)
            .unwrap()
            .with_timeout(Some(Duration::from_millis(10)));
        client.ping().await.unwrap();
        assert_eq!(
            client.ping().await,
            Err(TheaterError::Timeout(Duration::from_millis(10)))
        );
    }

    #[test]
    fn unnamed_client_is_rejected() {
        let (target, _probe) = MailboxProbe::pair(1);
        assert!(ControlClient::new("", target).is_err());
    }
}
