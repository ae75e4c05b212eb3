//! Queue set observer backed by the `metrics` crate facade.
//!
//! Whatever recorder the host application installs receives these series;
//! without one, the calls are no-ops.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

use crate::scheduler::{QueueSetObserver, RejectReason};

pub const WAITING_REQUESTS: &str = "fairgate_waiting_requests";
pub const WAITING_SEATS: &str = "fairgate_waiting_seats";
pub const EXECUTING_REQUESTS: &str = "fairgate_executing_requests";
pub const SEATS_IN_USE: &str = "fairgate_seats_in_use";
pub const DISPATCHED_TOTAL: &str = "fairgate_dispatched_requests_total";
pub const REJECTED_TOTAL: &str = "fairgate_rejected_requests_total";
pub const WAIT_SECONDS: &str = "fairgate_request_wait_seconds";

/// Register descriptions for every series this crate emits.
pub fn describe_metrics() {
    describe_gauge!(WAITING_REQUESTS, "Requests waiting in queues");
    describe_gauge!(WAITING_SEATS, "Seats requested by waiting requests");
    describe_gauge!(EXECUTING_REQUESTS, "Requests currently executing");
    describe_gauge!(SEATS_IN_USE, "Seats held by executing or lingering requests");
    describe_counter!(DISPATCHED_TOTAL, "Requests admitted for execution");
    describe_counter!(REJECTED_TOTAL, "Requests rejected or abandoned, by reason");
    describe_histogram!(WAIT_SECONDS, Unit::Seconds, "Time spent queued before dispatch");
}

/// Forwards queue set notifications to the global metrics recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsObserver;

impl QueueSetObserver for MetricsObserver {
    fn waiting_changed(&self, queue_set: &str, flow: &str, requests: i64, seats: i64) {
        let labels = [("queue_set", queue_set.to_string()), ("flow", flow.to_string())];
        gauge!(WAITING_REQUESTS, &labels).increment(requests as f64);
        gauge!(WAITING_SEATS, &labels).increment(seats as f64);
    }

    fn executing_changed(&self, queue_set: &str, flow: &str, delta: i64) {
        gauge!(EXECUTING_REQUESTS, "queue_set" => queue_set.to_string(), "flow" => flow.to_string())
            .increment(delta as f64);
    }

    fn seats_in_use_changed(&self, queue_set: &str, flow: &str, delta: i64) {
        gauge!(SEATS_IN_USE, "queue_set" => queue_set.to_string(), "flow" => flow.to_string())
            .increment(delta as f64);
    }

    fn dispatched(&self, queue_set: &str, flow: &str, waited: Duration) {
        let labels = [("queue_set", queue_set.to_string()), ("flow", flow.to_string())];
        counter!(DISPATCHED_TOTAL, &labels).increment(1);
        histogram!(WAIT_SECONDS, &labels).record(waited.as_secs_f64());
    }

    fn rejected(&self, queue_set: &str, flow: &str, reason: RejectReason) {
        counter!(
            REJECTED_TOTAL,
            "queue_set" => queue_set.to_string(),
            "flow" => flow.to_string(),
            "reason" => reason.as_str()
        )
        .increment(1);
    }
}
