//! Span utilities for admission tracing.

use tracing::{info_span, Span};

use crate::scheduler::RejectReason;

/// Extension trait for recording admission outcomes on a span.
pub trait SpanExt {
    /// Record whether the request got to execute, and why not if it did not.
    fn record_outcome(&self, outcome: Result<(), RejectReason>);
}

impl SpanExt for Span {
    fn record_outcome(&self, outcome: Result<(), RejectReason>) {
        match outcome {
            Ok(()) => {
                self.record("outcome", "dispatched");
            }
            Err(reason) => {
                self.record("outcome", reason.as_str());
            }
        }
    }
}

/// Factory for per-request admission spans.
pub struct RequestSpan;

impl RequestSpan {
    /// Fields:
    /// - `queue_set`: name of the queue set
    /// - `flow`: caller-supplied flow label
    /// - `request_id`: engine-assigned id
    /// - `queue`: index of the queue the request waits in
    /// - `outcome`: filled in by `SpanExt::record_outcome`
    pub fn new(queue_set: &str, flow: &str, request_id: u64, queue: usize) -> Span {
        info_span!(
            "admission_wait",
            queue_set = %queue_set,
            flow = %flow,
            request_id = request_id,
            queue = queue,
            outcome = tracing::field::Empty,
        )
    }
}
