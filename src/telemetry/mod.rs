//! Telemetry for the admission engine.
//!
//! Structured logging through `tracing`, per-request wait spans, and two
//! observer implementations: one feeding the `metrics` facade and one
//! feeding an in-process store.

mod logging;
mod metrics;
mod spans;
mod store;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use metrics::{describe_metrics, MetricsObserver};
pub use spans::{RequestSpan, SpanExt};
pub use store::{
    flow_key, rejection_key, HistogramSummary, MetricsSnapshot, MetricsStore, StoreObserver,
};

/// Series names shared by [`MetricsObserver`] and [`StoreObserver`].
pub mod names {
    pub use super::metrics::{
        DISPATCHED_TOTAL, EXECUTING_REQUESTS, REJECTED_TOTAL, SEATS_IN_USE, WAITING_REQUESTS,
        WAITING_SEATS, WAIT_SECONDS,
    };
}
