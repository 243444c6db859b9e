//! # Framework Errors
//!
//! This module defines the error taxonomy shared by every part of the theater:
//! envelopes, mailboxes, components and the conductor's registry.
//!
//! Errors fall into three families:
//!
//! - **Contract violations** ([`TheaterError::InvalidArgument`],
//!   [`TheaterError::IllegalOperation`]) are programming defects. They surface
//!   immediately at the boundary where the contract was broken and are never retried.
//! - **Transient mailbox conditions** ([`TheaterError::QueueFull`],
//!   [`TheaterError::Timeout`], [`TheaterError::Empty`]) are expected at runtime.
//!   A full mailbox on a heartbeat reply is routed to the component's send-failure
//!   hook; an empty mailbox during a poll simply means "nothing this tick".
//! - **Lifecycle failures** ([`TheaterError::SpawnFailure`],
//!   [`TheaterError::UnknownComponent`], [`TheaterError::AlreadyRegistered`]) are
//!   reported to whoever asked the conductor to do the work.
//!
//! Stopping a component is *not* an error: an `INTERRUPT` ends the control loop
//! with a [`ScoreEnd`](crate::component::ScoreEnd) value.

use std::time::Duration;

/// Result type used throughout the framework.
pub type Result<T, E = TheaterError> = std::result::Result<T, E>;

/// Errors that can occur within the theater framework.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TheaterError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Illegal operation: {0}")]
    IllegalOperation(String),
    #[error("Mailbox full")]
    QueueFull,
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Mailbox empty")]
    Empty,
    #[error("Mailbox closed")]
    Closed,
    #[error("Failed to spawn role '{role}': {reason}")]
    SpawnFailure { role: String, reason: String },
    #[error("Unknown component: {0}")]
    UnknownComponent(String),
    #[error("Component already registered: {0}")]
    AlreadyRegistered(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TheaterError {
    /// Returns true for mailbox conditions that may clear up on their own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TheaterError::QueueFull | TheaterError::Timeout(_) | TheaterError::Empty
        )
    }

    /// Returns a short stable label for log fields.
    pub fn as_label(&self) -> &'static str {
        match self {
            TheaterError::InvalidArgument(_) => "invalid_argument",
            TheaterError::IllegalOperation(_) => "illegal_operation",
            TheaterError::QueueFull => "queue_full",
            TheaterError::Timeout(_) => "timeout",
            TheaterError::Empty => "empty",
            TheaterError::Closed => "closed",
            TheaterError::SpawnFailure { .. } => "spawn_failure",
            TheaterError::UnknownComponent(_) => "unknown_component",
            TheaterError::AlreadyRegistered(_) => "already_registered",
            TheaterError::Config(_) => "config",
        }
    }
}
