//! Observation hook for externally visible counter changes.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Why a request did not get to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// No free seat without queuing, or more seats than the limit allows.
    ConcurrencyLimit,
    /// The chosen queue was at its length limit.
    QueueFull,
    /// Waited for the full request wait limit.
    TimeOut,
    /// The caller's cancellation fired while waiting.
    ContextCancelled,
}

impl RejectReason {
    pub const ALL: [RejectReason; 4] = [
        Self::ConcurrencyLimit,
        Self::QueueFull,
        Self::TimeOut,
        Self::ContextCancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConcurrencyLimit => "concurrency-limit",
            Self::QueueFull => "queue-full",
            Self::TimeOut => "time-out",
            Self::ContextCancelled => "context-cancelled",
        }
    }

    /// Rejected on arrival, as opposed to abandoned after queuing.
    pub fn is_immediate(&self) -> bool {
        matches!(self, Self::ConcurrencyLimit | Self::QueueFull)
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives every change to a counter the queue set exposes.
///
/// Called with the queue set's lock held: implementations must be quick and
/// must not call back into the queue set.
pub trait QueueSetObserver: Send + Sync {
    /// Waiting requests (and their seats) changed by the given deltas.
    fn waiting_changed(&self, _queue_set: &str, _flow: &str, _requests: i64, _seats: i64) {}

    /// Executing requests changed by `delta`.
    fn executing_changed(&self, _queue_set: &str, _flow: &str, _delta: i64) {}

    /// Seats in use changed by `delta`.
    fn seats_in_use_changed(&self, _queue_set: &str, _flow: &str, _delta: i64) {}

    /// A request started executing after waiting `waited`.
    fn dispatched(&self, _queue_set: &str, _flow: &str, _waited: Duration) {}

    /// A request was rejected or abandoned.
    fn rejected(&self, _queue_set: &str, _flow: &str, _reason: RejectReason) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl QueueSetObserver for NoopObserver {}
