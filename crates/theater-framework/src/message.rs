//! # Envelope Protocol
//!
//! This module defines the immutable values exchanged between components:
//! [`Message`] envelopes and the [`Status`] payload used by heartbeats.
//!
//! ## Why a validating builder?
//!
//! A message declares *why* it was sent ([`Signal`]) and *what shape* its payload
//! has ([`MsgType`]). The classic bug in loosely typed actor systems is an envelope
//! that says `TEXT` but carries nothing, or says `STATUS` but carries a map. Here a
//! [`Message`] can only come out of [`Message::build`] or [`MessageBuilder::build`],
//! both of which check the body against the declared type. There is no public
//! constructor that skips the check, so an inconsistent envelope cannot exist.
//!
//! | `MsgType` | Required [`Body`] |
//! |-----------|-------------------|
//! | `None`    | [`Body::None`]    |
//! | `Text`    | [`Body::Text`]    |
//! | `Map`     | [`Body::Map`]     |
//! | `Status`  | [`Body::Status`]  |
//! | `Bytes`   | [`Body::Bytes`]   |
//!
//! ```rust
//! use theater_framework::message::{Body, MessageBuilder, MsgType, Signal};
//!
//! let msg = MessageBuilder::new("worker-1")
//!     .signal(Signal::Update)
//!     .msg_type(MsgType::Text)
//!     .body("batch 42 done")
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! assert_eq!(msg.body(), &Body::Text("batch 42 done".into()));
//!
//! // Declaring the body before its type is rejected on the spot.
//! assert!(MessageBuilder::new("worker-1").body("too early").is_err());
//! ```

use crate::error::{Result, TheaterError};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::{self, Display};

/// Wall-clock time used for every heartbeat and registry timestamp.
pub type Timestamp = DateTime<Local>;

/// Metadata attached to a message alongside its body.
pub type Extension = HashMap<String, Value>;

/// Declares why a message was sent; drives dispatch inside a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Create,
    Interrupt,
    Beat,
    Kill,
    Update,
    Trigger,
}

impl Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Signal::Create => "CREATE",
            Signal::Interrupt => "INTERRUPT",
            Signal::Beat => "BEAT",
            Signal::Kill => "KILL",
            Signal::Update => "UPDATE",
            Signal::Trigger => "TRIGGER",
        };
        f.write_str(label)
    }
}

/// Declares the shape of a message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MsgType {
    None,
    Text,
    Map,
    Status,
    Bytes,
}

impl Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MsgType::None => "NONE",
            MsgType::Text => "TEXT",
            MsgType::Map => "MAP",
            MsgType::Status => "STATUS",
            MsgType::Bytes => "BYTES",
        };
        f.write_str(label)
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Liveness/status payload carried by `STATUS` heartbeats.
///
/// Every field is independently optional. A heartbeat *request* usually only
/// sets `reqtime`; the answer fills in the rest. Updates never mutate a value,
/// the `with_*` methods return a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Status {
    reqtime: Option<Timestamp>,
    status: Option<String>,
    time: Option<Timestamp>,
    statustime: Option<Timestamp>,
    statusmessage: Option<String>,
}

impl Status {
    pub fn new(
        reqtime: Option<Timestamp>,
        status: Option<String>,
        time: Option<Timestamp>,
        statustime: Option<Timestamp>,
        statusmessage: Option<String>,
    ) -> Self {
        Self {
            reqtime,
            status,
            time,
            statustime,
            statusmessage,
        }
    }

    /// A heartbeat request: only the request time is known.
    pub fn request(reqtime: Timestamp) -> Self {
        Self {
            reqtime: Some(reqtime),
            ..Self::default()
        }
    }

    pub fn reqtime(&self) -> Option<Timestamp> {
        self.reqtime
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn time(&self) -> Option<Timestamp> {
        self.time
    }

    pub fn statustime(&self) -> Option<Timestamp> {
        self.statustime
    }

    pub fn statusmessage(&self) -> Option<&str> {
        self.statusmessage.as_deref()
    }

    /// True when nobody has answered yet (no status string filled in).
    pub fn is_request(&self) -> bool {
        self.status.is_none()
    }

    pub fn with_reqtime(self, reqtime: Option<Timestamp>) -> Self {
        Self { reqtime, ..self }
    }

    pub fn with_status(self, status: Option<String>) -> Self {
        Self { status, ..self }
    }

    pub fn with_time(self, time: Option<Timestamp>) -> Self {
        Self { time, ..self }
    }

    pub fn with_statustime(self, statustime: Option<Timestamp>) -> Self {
        Self { statustime, ..self }
    }

    pub fn with_statusmessage(self, statusmessage: Option<String>) -> Self {
        Self {
            statusmessage,
            ..self
        }
    }
}

/// Builds a [`Status`] from loosely typed data (config files, MAP bodies, JSON).
///
/// Timestamps must be RFC 3339 strings, text fields must be strings, `null` or a
/// missing key means "absent". Anything else fails with `InvalidArgument`.
impl TryFrom<Value> for Status {
    type Error = TheaterError;

    fn try_from(value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(TheaterError::InvalidArgument(format!(
                    "a status must be a map, got {other}"
                )))
            }
        };

        if let Some(key) = map.keys().find(|k| !STATUS_FIELDS.contains(&k.as_str())) {
            return Err(TheaterError::InvalidArgument(format!(
                "unknown status field '{key}'"
            )));
        }

        Ok(Self {
            reqtime: timestamp_field(&map, "reqtime")?,
            status: text_field(&map, "status")?,
            time: timestamp_field(&map, "time")?,
            statustime: timestamp_field(&map, "statustime")?,
            statusmessage: text_field(&map, "statusmessage")?,
        })
    }
}

const STATUS_FIELDS: [&str; 5] = ["reqtime", "status", "time", "statustime", "statusmessage"];

fn timestamp_field(map: &Map<String, Value>, key: &str) -> Result<Option<Timestamp>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
            .map(|t| Some(t.with_timezone(&Local)))
            .map_err(|e| {
                TheaterError::InvalidArgument(format!("'{key}' is not a timestamp: {e}"))
            }),
        Some(other) => Err(TheaterError::InvalidArgument(format!(
            "'{key}' must be a timestamp, got {other}"
        ))),
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => Err(TheaterError::InvalidArgument(format!(
            "'{key}' must be a string, got {other}"
        ))),
    }
}

// =============================================================================
// BODY
// =============================================================================

/// Polymorphic message payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    None,
    Text(String),
    Map(Map<String, Value>),
    Status(Status),
    Bytes(Vec<u8>),
}

impl Body {
    /// The [`MsgType`] this body satisfies.
    pub fn shape(&self) -> MsgType {
        match self {
            Body::None => MsgType::None,
            Body::Text(_) => MsgType::Text,
            Body::Map(_) => MsgType::Map,
            Body::Status(_) => MsgType::Status,
            Body::Bytes(_) => MsgType::Bytes,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<&Status> {
        match self {
            Body::Status(status) => Some(status),
            _ => None,
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Map<String, Value>> for Body {
    fn from(map: Map<String, Value>) -> Self {
        Body::Map(map)
    }
}

impl From<Status> for Body {
    fn from(status: Status) -> Self {
        Body::Status(status)
    }
}

fn check_body(msg_type: MsgType, body: &Body) -> Result<()> {
    if body.shape() == msg_type {
        Ok(())
    } else {
        Err(TheaterError::InvalidArgument(format!(
            "a {msg_type} message cannot carry a {} body",
            body.shape()
        )))
    }
}

fn check_sender(sender: &str) -> Result<()> {
    if sender.is_empty() {
        Err(TheaterError::InvalidArgument(
            "a message needs a non-empty sender".into(),
        ))
    } else {
        Ok(())
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

/// An immutable, validated envelope.
///
/// Its fields are private and there is no unchecked constructor; see the
/// [module documentation](self) for the shape table enforced on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    sender: String,
    signal: Signal,
    msg_type: MsgType,
    extension: Extension,
    body: Body,
}

impl Message {
    /// Validates and builds a message in one call.
    pub fn build(
        sender: impl Into<String>,
        signal: Signal,
        msg_type: MsgType,
        body: Body,
        extension: Option<Extension>,
    ) -> Result<Self> {
        let sender = sender.into();
        check_sender(&sender)?;
        check_body(msg_type, &body)?;
        Ok(Self {
            sender,
            signal,
            msg_type,
            extension: extension.unwrap_or_default(),
            body,
        })
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn msg_type(&self) -> MsgType {
        self.msg_type
    }

    pub fn extension(&self) -> &Extension {
        &self.extension
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// The same envelope re-addressed as if `sender` had sent it.
    pub fn relay_as(&self, sender: impl Into<String>) -> Result<Self> {
        let sender = sender.into();
        check_sender(&sender)?;
        Ok(Self {
            sender,
            ..self.clone()
        })
    }

    /// The same envelope with a different payload; the new body is validated.
    pub fn with_body(&self, msg_type: MsgType, body: Body) -> Result<Self> {
        check_body(msg_type, &body)?;
        Ok(Self {
            msg_type,
            body,
            ..self.clone()
        })
    }
}

/// Incremental staging area for a [`Message`].
///
/// The type must be declared before the body, because the body is checked
/// against it as soon as it is set.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    sender: String,
    signal: Option<Signal>,
    msg_type: Option<MsgType>,
    body: Body,
    extension: Extension,
}

impl MessageBuilder {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            signal: None,
            msg_type: None,
            body: Body::None,
            extension: Extension::new(),
        }
    }

    pub fn signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn msg_type(mut self, msg_type: MsgType) -> Self {
        self.msg_type = Some(msg_type);
        self
    }

    /// Stages the body; fails if no type was declared or the shape mismatches.
    pub fn body(mut self, body: impl Into<Body>) -> Result<Self> {
        let Some(msg_type) = self.msg_type else {
            return Err(TheaterError::IllegalOperation(
                "a body cannot be set before the message type".into(),
            ));
        };
        let body = body.into();
        check_body(msg_type, &body)?;
        self.body = body;
        Ok(self)
    }

    pub fn extend(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extension.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Result<Message> {
        let signal = self.signal.ok_or_else(|| {
            TheaterError::IllegalOperation("a message cannot be built without a signal".into())
        })?;
        let msg_type = self.msg_type.ok_or_else(|| {
            TheaterError::IllegalOperation("a message cannot be built without a type".into())
        })?;
        Message::build(
            self.sender,
            signal,
            msg_type,
            self.body,
            Some(self.extension),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALL_TYPES: [MsgType; 5] = [
        MsgType::None,
        MsgType::Text,
        MsgType::Map,
        MsgType::Status,
        MsgType::Bytes,
    ];

    fn sample_body(msg_type: MsgType) -> Body {
        match msg_type {
            MsgType::None => Body::None,
            MsgType::Text => Body::Text("ACAB".into()),
            MsgType::Map => Body::Map(Map::new()),
            MsgType::Status => Body::Status(Status::request(Local::now())),
            MsgType::Bytes => Body::Bytes(vec![0xde, 0xad]),
        }
    }

    #[test]
    fn matching_bodies_build_and_read_back() {
        for msg_type in ALL_TYPES {
            let body = sample_body(msg_type);
            let msg = Message::build("TestSender", Signal::Trigger, msg_type, body.clone(), None)
                .unwrap();
            assert_eq!(msg.sender(), "TestSender");
            assert_eq!(msg.signal(), Signal::Trigger);
            assert_eq!(msg.msg_type(), msg_type);
            assert_eq!(msg.body(), &body);
        }
    }

    #[test]
    fn mismatched_bodies_are_rejected() {
        for msg_type in ALL_TYPES {
            for other in ALL_TYPES.into_iter().filter(|t| *t != msg_type) {
                let result =
                    Message::build("TestSender", Signal::Trigger, msg_type, sample_body(other), None);
                assert!(
                    matches!(result, Err(TheaterError::InvalidArgument(_))),
                    "{msg_type} accepted a {other} body"
                );
            }
        }
    }

    #[test]
    fn empty_sender_is_rejected() {
        let result = Message::build("", Signal::Beat, MsgType::None, Body::None, None);
        assert!(matches!(result, Err(TheaterError::InvalidArgument(_))));
    }

    #[test]
    fn builder_requires_signal_type_and_sender() {
        let no_signal = MessageBuilder::new("TestSender").msg_type(MsgType::None).build();
        assert!(matches!(no_signal, Err(TheaterError::IllegalOperation(_))));

        let no_type = MessageBuilder::new("TestSender").signal(Signal::Beat).build();
        assert!(matches!(no_type, Err(TheaterError::IllegalOperation(_))));

        let no_sender = MessageBuilder::new("")
            .signal(Signal::Beat)
            .msg_type(MsgType::None)
            .build();
        assert!(matches!(no_sender, Err(TheaterError::InvalidArgument(_))));
    }

    #[test]
    fn builder_rejects_body_before_type() {
        let result = MessageBuilder::new("TestSender")
            .signal(Signal::Update)
            .body("early");
        assert!(matches!(result, Err(TheaterError::IllegalOperation(_))));
    }

    #[test]
    fn builder_checks_body_shape_immediately() {
        let result = MessageBuilder::new("TestSender")
            .msg_type(MsgType::Bytes)
            .body("not bytes");
        assert!(matches!(result, Err(TheaterError::InvalidArgument(_))));
    }

    #[test]
    fn builder_carries_extension_entries() {
        let msg = MessageBuilder::new("TestSender")
            .signal(Signal::Create)
            .msg_type(MsgType::Map)
            .body(Map::from_iter([("role".to_string(), json!("worker"))]))
            .unwrap()
            .extend("attempt", json!(2))
            .extend("trace", json!("abc"))
            .build()
            .unwrap();
        assert_eq!(msg.extension().get("attempt"), Some(&json!(2)));
        assert_eq!(msg.extension().len(), 2);
    }

    #[test]
    fn relay_rewrites_only_the_sender() {
        let original =
            Message::build("monitor", Signal::Beat, MsgType::Status, sample_body(MsgType::Status), None)
                .unwrap();
        let relayed = original.relay_as("conductor").unwrap();
        assert_eq!(relayed.sender(), "conductor");
        assert_eq!(relayed.body(), original.body());
        assert_eq!(original.sender(), "monitor");
        assert!(original.relay_as("").is_err());
    }

    #[test]
    fn with_body_revalidates() {
        let msg = Message::build("a", Signal::Update, MsgType::None, Body::None, None).unwrap();
        assert!(msg.with_body(MsgType::Text, Body::Bytes(vec![1])).is_err());
        let text = msg.with_body(MsgType::Text, "hi".into()).unwrap();
        assert_eq!(text.body().as_text(), Some("hi"));
    }

    #[test]
    fn empty_status_is_valid() {
        let status = Status::try_from(json!({})).unwrap();
        assert_eq!(status, Status::default());
        let nulls = Status::try_from(json!({
            "reqtime": null, "status": null, "time": null,
            "statustime": null, "statusmessage": null
        }))
        .unwrap();
        assert!(nulls.is_request());
    }

    #[test]
    fn status_parses_full_map() {
        let status = Status::try_from(json!({
            "reqtime": "2024-05-01T10:00:00+00:00",
            "status": "Running",
            "time": "2024-05-01T10:00:01+00:00",
            "statustime": "2024-05-01T09:00:00+00:00",
            "statusmessage": "all good"
        }))
        .unwrap();
        assert_eq!(status.status(), Some("Running"));
        assert_eq!(status.statusmessage(), Some("all good"));
        assert!(status.reqtime().unwrap() < status.time().unwrap());
    }

    #[test]
    fn each_malformed_status_field_fails_on_its_own() {
        let valid = json!({
            "reqtime": "2024-05-01T10:00:00+00:00",
            "status": "Test",
            "time": "2024-05-01T10:00:00+00:00",
            "statustime": "2024-05-01T10:00:00+00:00",
            "statusmessage": "Test"
        });
        let wrong = [
            ("reqtime", json!("Now")),
            ("status", json!(5)),
            ("time", json!("Now")),
            ("statustime", json!(12)),
            ("statusmessage", json!(5)),
        ];
        for (key, bad) in wrong {
            let mut candidate = valid.clone();
            candidate[key] = bad;
            assert!(
                matches!(Status::try_from(candidate), Err(TheaterError::InvalidArgument(_))),
                "{key} accepted a malformed value"
            );
        }
    }

    #[test]
    fn status_rejects_unknown_fields_and_non_maps() {
        assert!(Status::try_from(json!({"beattime": null})).is_err());
        assert!(Status::try_from(json!("Running")).is_err());
    }

    #[test]
    fn status_updates_copy_and_replace() {
        let now = Local::now();
        let request = Status::request(now);
        let answer = request
            .clone()
            .with_status(Some("Running".into()))
            .with_time(Some(now));
        assert!(request.is_request());
        assert!(!answer.is_request());
        assert_eq!(answer.reqtime(), Some(now));
    }
}
