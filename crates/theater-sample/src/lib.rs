//! # Theater Sample Library
//!
//! This library exposes the sample's modules for the binary and for integration testing.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod players;

pub use config::{CastEntry, TheaterConfig};
pub use error::SampleError;
pub use lifecycle::{repertoire, Orchestra};
