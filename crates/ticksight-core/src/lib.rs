//! Core building blocks of the Ticksight telemetry collector.
//!
//! This crate contains everything that is independent of the network
//! layer: the sliding-window tick sampler, the host-runtime contract
//! the collector is injected with, the host metrics adapter, typed
//! configuration, reverse log-tail scanning, and the log-line sink
//! interface the capture backends feed into.

pub mod config;
pub mod host;
pub mod host_metrics;
pub mod logtail;
pub mod relay;
pub mod sampler;

pub use config::{CollectorConfig, ConfigError};
pub use host::{HostRuntime, PrimaryTask};
pub use host_metrics::HostMetricsAdapter;
pub use relay::LogSink;
pub use sampler::{TickSampler, TickStatsHandle};
