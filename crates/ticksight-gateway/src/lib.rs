//! WebSocket API gateway for the Ticksight collector.
//!
//! One WebSocket endpoint carries the whole protocol: clients send
//! request envelopes, the gateway answers with correlated responses
//! and fans unsolicited pushes (log lines) out to authenticated
//! sessions. Admission control, session bookkeeping, authentication
//! and action dispatch all live in this crate.

pub mod dispatch;
pub mod icon;
pub mod relay;
pub mod router;
pub mod server;
pub mod sessions;
pub mod startup;
pub mod ws;

pub use dispatch::{Dispatcher, DispatcherConfig};
pub use relay::LogRelay;
pub use router::build_router;
pub use server::{start_server, ServerConfig, ServerError};
pub use sessions::{Session, SessionRegistry};
pub use startup::spawn_gateway;
