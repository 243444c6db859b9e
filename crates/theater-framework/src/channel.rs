//! # Directional Mailboxes
//!
//! Every component owns exactly one bounded mailbox. [`pair`] builds it and
//! immediately splits it into two capability-restricted halves:
//!
//! - [`Producer`]: may enqueue and inspect. Held by whoever talks *to* the component
//!   (its supervisor, its siblings through the supervisor, a [`ControlClient`](crate::client::ControlClient)).
//!   Cheap to clone.
//! - [`Consumer`]: may dequeue and inspect. Held by the component's own control loop.
//!
//! The split is structural: a `Producer` wraps only the sending end of a
//! `tokio::sync::mpsc` channel and a `Consumer` only the receiving end, so neither
//! can perform the other's operation. Both implement the shared [`Mailbox`] trait
//! so code that only holds "some mailbox" still gets a uniform surface; the
//! wrong-direction methods of that trait always fail with
//! [`TheaterError::IllegalOperation`].
//!
//! ```rust
//! use theater_framework::channel::{self, Mailbox};
//! use theater_framework::message::{Body, Message, MsgType, Signal};
//! use theater_framework::TheaterError;
//!
//! let (mut producer, mut consumer) = channel::pair(4).unwrap();
//! let ping = Message::build("conductor", Signal::Beat, MsgType::None, Body::None, None).unwrap();
//!
//! producer.try_send(ping.clone()).unwrap();
//! assert_eq!(consumer.try_receive().unwrap(), ping);
//!
//! // The sending half can never read the mailbox.
//! assert!(matches!(producer.try_receive(), Err(TheaterError::IllegalOperation(_))));
//! ```

use crate::error::{Result, TheaterError};
use crate::message::Message;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TryRecvError, error::TrySendError};

/// Builds one bounded mailbox and returns its two halves.
pub fn pair(capacity: usize) -> Result<(Producer, Consumer)> {
    if capacity == 0 {
        return Err(TheaterError::InvalidArgument(
            "mailbox capacity must be at least 1".into(),
        ));
    }
    let (sender, receiver) = mpsc::channel(capacity);
    Ok((
        Producer {
            sender: Some(sender),
            capacity,
        },
        Consumer { receiver, capacity },
    ))
}

/// Operations shared by both halves of a mailbox.
///
/// Each half overrides the direction it is allowed to use; the provided
/// defaults reject the call.
#[async_trait]
pub trait Mailbox: Send {
    /// Enqueues without waiting.
    fn try_send(&self, _msg: Message) -> Result<()> {
        Err(TheaterError::IllegalOperation(
            "cannot send through the receiving half of a mailbox".into(),
        ))
    }

    /// Enqueues, waiting for room (up to `timeout` when given).
    async fn send(&self, _msg: Message, _timeout: Option<Duration>) -> Result<()> {
        Err(TheaterError::IllegalOperation(
            "cannot send through the receiving half of a mailbox".into(),
        ))
    }

    /// Dequeues without waiting.
    fn try_receive(&mut self) -> Result<Message> {
        Err(TheaterError::IllegalOperation(
            "cannot receive through the sending half of a mailbox".into(),
        ))
    }

    /// Dequeues, waiting for a message (up to `timeout` when given).
    async fn receive(&mut self, _timeout: Option<Duration>) -> Result<Message> {
        Err(TheaterError::IllegalOperation(
            "cannot receive through the sending half of a mailbox".into(),
        ))
    }

    /// Number of queued messages.
    fn size(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn is_full(&self) -> bool {
        self.size() >= self.capacity()
    }

    /// Closes this half. See the implementors for the exact effect.
    fn close(&mut self);
}

/// Sending half of a mailbox.
#[derive(Debug, Clone)]
pub struct Producer {
    sender: Option<mpsc::Sender<Message>>,
    capacity: usize,
}

impl Producer {
    fn sender(&self) -> Result<&mpsc::Sender<Message>> {
        self.sender.as_ref().ok_or(TheaterError::Closed)
    }

    /// True when this handle was closed or the receiving half is gone.
    pub fn is_closed(&self) -> bool {
        self.sender.as_ref().map_or(true, |s| s.is_closed())
    }
}

#[async_trait]
impl Mailbox for Producer {
    fn try_send(&self, msg: Message) -> Result<()> {
        self.sender()?.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => TheaterError::QueueFull,
            TrySendError::Closed(_) => TheaterError::Closed,
        })
    }

    async fn send(&self, msg: Message, timeout: Option<Duration>) -> Result<()> {
        let sender = self.sender()?;
        match timeout {
            Some(limit) => sender.send_timeout(msg, limit).await.map_err(|e| match e {
                SendTimeoutError::Timeout(_) => TheaterError::Timeout(limit),
                SendTimeoutError::Closed(_) => TheaterError::Closed,
            }),
            None => sender.send(msg).await.map_err(|_| TheaterError::Closed),
        }
    }

    fn size(&self) -> usize {
        self.sender
            .as_ref()
            .map_or(0, |s| s.max_capacity() - s.capacity())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops this handle's sending end; further sends through it fail with `Closed`.
    /// Other clones keep working.
    fn close(&mut self) {
        self.sender = None;
    }
}

/// Receiving half of a mailbox.
#[derive(Debug)]
pub struct Consumer {
    receiver: mpsc::Receiver<Message>,
    capacity: usize,
}

#[async_trait]
impl Mailbox for Consumer {
    fn try_receive(&mut self) -> Result<Message> {
        self.receiver.try_recv().map_err(|e| match e {
            TryRecvError::Empty => TheaterError::Empty,
            TryRecvError::Disconnected => TheaterError::Closed,
        })
    }

    async fn receive(&mut self, timeout: Option<Duration>) -> Result<Message> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.receiver.recv())
                .await
                .map_err(|_| TheaterError::Timeout(limit))?
                .ok_or(TheaterError::Closed),
            None => self.receiver.recv().await.ok_or(TheaterError::Closed),
        }
    }

    fn size(&self) -> usize {
        self.receiver.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stops the mailbox from accepting new messages. Already queued
    /// messages can still be received.
    fn close(&mut self) {
        self.receiver.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Body, MsgType, Signal};

    fn text(n: usize) -> Message {
        Message::build("tester", Signal::Update, MsgType::Text, Body::Text(n.to_string()), None)
            .unwrap()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(pair(0), Err(TheaterError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn producer_cannot_receive() {
        for capacity in [1, 3, 16] {
            let (mut producer, _consumer) = pair(capacity).unwrap();
            producer.try_send(text(0)).unwrap();
            assert!(matches!(
                producer.try_receive(),
                Err(TheaterError::IllegalOperation(_))
            ));
            assert!(matches!(
                producer.receive(Some(Duration::from_millis(1))).await,
                Err(TheaterError::IllegalOperation(_))
            ));
        }
    }

    #[tokio::test]
    async fn consumer_cannot_send() {
        for capacity in [1, 3, 16] {
            let (_producer, consumer) = pair(capacity).unwrap();
            assert!(matches!(
                consumer.try_send(text(0)),
                Err(TheaterError::IllegalOperation(_))
            ));
            assert!(matches!(
                consumer.send(text(0), None).await,
                Err(TheaterError::IllegalOperation(_))
            ));
        }
    }

    #[tokio::test]
    async fn delivery_is_fifo() {
        let (producer, mut consumer) = pair(8).unwrap();
        for n in 0..8 {
            producer.send(text(n), None).await.unwrap();
        }
        for n in 0..8 {
            let msg = consumer.receive(Some(Duration::from_secs(1))).await.unwrap();
            assert_eq!(msg.body().as_text(), Some(n.to_string().as_str()));
        }
    }

    #[test]
    fn full_mailbox_reports_queue_full() {
        let (producer, consumer) = pair(2).unwrap();
        producer.try_send(text(1)).unwrap();
        producer.try_send(text(2)).unwrap();
        assert!(producer.is_full());
        assert!(consumer.is_full());
        assert_eq!(producer.try_send(text(3)), Err(TheaterError::QueueFull));
    }

    #[tokio::test(start_paused = true)]
    async fn blocking_send_times_out_when_full() {
        let (producer, _consumer) = pair(1).unwrap();
        producer.try_send(text(1)).unwrap();
        let limit = Duration::from_millis(50);
        assert_eq!(
            producer.send(text(2), Some(limit)).await,
            Err(TheaterError::Timeout(limit))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn receive_times_out_when_empty() {
        let (_producer, mut consumer) = pair(1).unwrap();
        assert_eq!(consumer.try_receive(), Err(TheaterError::Empty));
        let limit = Duration::from_millis(50);
        assert_eq!(
            consumer.receive(Some(limit)).await,
            Err(TheaterError::Timeout(limit))
        );
    }

    #[test]
    fn introspection_tracks_queue_state() {
        let (producer, mut consumer) = pair(4).unwrap();
        assert!(producer.is_empty());
        assert!(consumer.is_empty());
        producer.try_send(text(1)).unwrap();
        producer.try_send(text(2)).unwrap();
        assert_eq!(producer.size(), 2);
        assert_eq!(consumer.size(), 2);
        consumer.try_receive().unwrap();
        assert_eq!(consumer.size(), 1);
        assert_eq!(producer.capacity(), 4);
    }

    #[test]
    fn closing_a_producer_only_affects_that_handle() {
        let (mut producer, mut consumer) = pair(4).unwrap();
        let other = producer.clone();
        producer.close();
        assert_eq!(producer.try_send(text(1)), Err(TheaterError::Closed));
        other.try_send(text(2)).unwrap();
        assert_eq!(consumer.try_receive().unwrap().body().as_text(), Some("2"));
    }

    #[test]
    fn closing_the_consumer_rejects_new_messages() {
        let (producer, mut consumer) = pair(4).unwrap();
        producer.try_send(text(1)).unwrap();
        consumer.close();
        assert_eq!(producer.try_send(text(2)), Err(TheaterError::Closed));
        assert_eq!(consumer.try_receive().unwrap().body().as_text(), Some("1"));
    }

    #[test]
    fn dropped_producers_close_the_mailbox() {
        let (producer, mut consumer) = pair(4).unwrap();
        drop(producer);
        assert_eq!(consumer.try_receive(), Err(TheaterError::Closed));
    }
}
