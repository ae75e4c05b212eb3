//! Fair-queuing admission scheduler.
//!
//! Callers tag each request with a flow hash; the [`QueueSet`] deals the flow
//! a hand of queues, queues the request, and dispatches across queues in
//! virtual-time order so every flow gets an approximately max-min fair share
//! of the seat budget.

mod config;
mod dispatch;
mod fair_alloc;
mod observer;
mod promise;
mod queue;
mod queue_set;
mod request;
pub mod shuffle_shard;
pub mod virtual_time;

#[cfg(test)]
mod queue_set_tests;

pub use config::{ConfigError, DispatchingConfig, QueuingConfig, WorkEstimate};
pub use fair_alloc::fair_alloc;
pub use observer::{NoopObserver, QueueSetObserver, RejectReason};
pub use promise::WriteOnce;
pub use queue_set::{QueueDump, QueueSet, QueueSetBuilder, QueueSetDump};
pub use request::Request;
pub use shuffle_shard::{Dealer, DealerError};
