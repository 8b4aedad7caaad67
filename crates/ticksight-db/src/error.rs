//! Error types for the data layer.

/// Errors that can occur in the metric history store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database could not be opened or created.
    #[error("database open error: {0}")]
    Open(String),

    /// A query failed.
    #[error("database query error: {source}")]
    Query {
        /// The underlying sqlx error.
        #[from]
        source: sqlx::Error,
    },
}
