//! Handle for an admitted request and the seat-release protocol.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use super::config::WorkEstimate;
use super::observer::RejectReason;
use super::queue_set::Shared;

/// Facts recorded when a request is dispatched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Dispatched {
    pub started_at: Instant,
    /// Virtual time charged to the queue at dispatch.
    pub charged: f64,
    /// Busy queues counted when the charge was computed.
    pub busy: usize,
}

/// Outcome of the submit/dispatch handshake. Set exactly once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Decision {
    Execute(Dispatched),
    Reject(RejectReason),
}

/// An admitted request. Holds its seats until finished.
///
/// Dropping the handle without calling [`Request::finish`] releases the seats
/// as if the request had executed nothing.
pub struct Request {
    shared: Arc<Shared>,
    id: u64,
    queue: Option<usize>,
    work: WorkEstimate,
    flow_label: Arc<str>,
    dispatched: Dispatched,
    finished: bool,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("queue", &self.queue)
            .field("seats", &self.work.seats)
            .field("flow_label", &self.flow_label)
            .field("finished", &self.finished)
            .finish()
    }
}

impl Request {
    pub(crate) fn new(
        shared: Arc<Shared>,
        id: u64,
        queue: Option<usize>,
        work: WorkEstimate,
        flow_label: Arc<str>,
        dispatched: Dispatched,
    ) -> Self {
        Self {
            shared,
            id,
            queue,
            work,
            flow_label,
            dispatched,
            finished: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn seats(&self) -> u32 {
        self.work.seats
    }

    pub fn work(&self) -> WorkEstimate {
        self.work
    }

    pub fn flow_label(&self) -> &str {
        &self.flow_label
    }

    /// Queue the request was dispatched from; `None` when queuing is off.
    pub fn queue_index(&self) -> Option<usize> {
        self.queue
    }

    pub(crate) fn dispatched(&self) -> Dispatched {
        self.dispatched
    }

    /// Run `execute`, then release the request.
    ///
    /// The executing count drops as soon as `execute` returns; the seats stay
    /// held for the work estimate's additional latency. If `execute` panics
    /// the release still happens before the panic leaves this call.
    ///
    /// Returns whether the queue set is idle afterwards.
    pub fn finish<F: FnOnce()>(mut self, execute: F) -> bool {
        execute();
        self.release()
    }

    /// Async counterpart of [`Request::finish`].
    pub async fn finish_async<F: Future<Output = ()>>(mut self, execute: F) -> bool {
        execute.await;
        self.release()
    }

    fn release(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;
        Shared::finish_request(&self.shared, self)
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if !self.finished {
            self.release();
        }
    }
}
