//! Data layer for Ticksight: the append-only metric history store.

pub mod error;
pub mod metric_store;

pub use error::StoreError;
pub use metric_store::{MetricRow, MetricSample, MetricStore};
