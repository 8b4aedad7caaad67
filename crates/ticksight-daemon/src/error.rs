//! Error types for the daemon binary.
//!
//! [`DaemonError`] is the top-level error type that wraps all possible
//! failure modes during startup, providing a single type `main` can
//! propagate with `?`.

/// Top-level error for the daemon binary.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ticksight_core::ConfigError,
    },

    /// The metric store could not be opened.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: ticksight_db::StoreError,
    },

    /// The gateway failed to start.
    #[error("gateway error: {source}")]
    Gateway {
        /// The underlying startup error.
        #[from]
        source: ticksight_gateway::startup::StartupError,
    },
}
