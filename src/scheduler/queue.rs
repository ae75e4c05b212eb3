//! One fair queue: FIFO of waiting requests plus its execution counters.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::promise::WriteOnce;
use super::request::Decision;

/// A request sitting in a queue, waiting to be dispatched or abandoned.
pub(crate) struct WaitingRequest {
    pub id: u64,
    pub seats: u32,
    pub additional_latency: Duration,
    pub flow_label: Arc<str>,
    /// Engine virtual time when the request arrived.
    pub arrival_r: f64,
    pub enqueued_at: Instant,
    pub decision: Arc<WriteOnce<Decision>>,
}

impl std::fmt::Debug for WaitingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitingRequest")
            .field("id", &self.id)
            .field("seats", &self.seats)
            .field("flow_label", &self.flow_label)
            .field("decided", &self.decision.is_set())
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct Queue {
    pub index: usize,
    waiting: VecDeque<WaitingRequest>,
    seats_waiting: u32,
    /// Seats held by this queue's executing (or lingering) requests.
    pub seats_in_use: u32,
    pub requests_executing: usize,
    pub virtual_start: f64,
}

impl Queue {
    pub fn new(index: usize, virtual_start: f64) -> Self {
        Self {
            index,
            waiting: VecDeque::new(),
            seats_waiting: 0,
            seats_in_use: 0,
            requests_executing: 0,
            virtual_start,
        }
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn seats_waiting(&self) -> u32 {
        self.seats_waiting
    }

    /// Has at least one executing request.
    pub fn is_busy(&self) -> bool {
        self.requests_executing > 0
    }

    /// Has anything waiting or executing.
    pub fn is_active(&self) -> bool {
        self.is_busy() || !self.is_empty()
    }

    /// Nothing waiting, executing, or still holding seats.
    pub fn is_drained(&self) -> bool {
        !self.is_active() && self.seats_in_use == 0
    }

    /// Seats this queue would need to serve everything it holds.
    pub fn seats_demanded(&self) -> u32 {
        self.seats_waiting.saturating_add(self.seats_in_use)
    }

    pub fn head(&self) -> Option<&WaitingRequest> {
        self.waiting.front()
    }

    pub fn push(&mut self, request: WaitingRequest) {
        self.seats_waiting = self.seats_waiting.saturating_add(request.seats);
        self.waiting.push_back(request);
    }

    pub fn pop_head(&mut self) -> Option<WaitingRequest> {
        let request = self.waiting.pop_front()?;
        self.seats_waiting -= request.seats;
        Some(request)
    }

    /// Remove a specific waiting request, wherever it sits.
    pub fn remove(&mut self, id: u64) -> Option<WaitingRequest> {
        let pos = self.waiting.iter().position(|r| r.id == id)?;
        let request = self.waiting.remove(pos)?;
        self.seats_waiting -= request.seats;
        Some(request)
    }

    /// Pop the head if it has waited at least `limit` by `now`.
    ///
    /// All requests in a queue share the same limit, so expired requests are
    /// always at the front.
    pub fn pop_expired(&mut self, now: Instant, limit: Duration) -> Option<WaitingRequest> {
        let head = self.waiting.front()?;
        if now.saturating_duration_since(head.enqueued_at) >= limit {
            self.pop_head()
        } else {
            None
        }
    }

    /// Pop the head if it needs more than `max_seats`.
    pub fn pop_wider_than(&mut self, max_seats: u32) -> Option<WaitingRequest> {
        if self.waiting.front()?.seats > max_seats {
            self.pop_head()
        } else {
            None
        }
    }

    /// Keep the virtual start from lagging behind the arrival of the oldest
    /// waiting request.
    pub fn bound_virtual_start(&mut self) {
        if let Some(head) = self.waiting.front() {
            if self.virtual_start < head.arrival_r {
                self.virtual_start = head.arrival_r;
            }
        }
    }
}
