//! Shared type definitions for the Ticksight telemetry collector.
//!
//! This crate holds the wire protocol envelopes exchanged over the
//! gateway's WebSocket connection and the metric/status payload types
//! composed into responses. It deliberately has no async or I/O
//! dependencies so every other crate can depend on it.

pub mod metrics;
pub mod protocol;

pub use metrics::{MetricsSnapshot, StatusReport};
pub use protocol::{Push, RequestEnvelope, Response};
