//! The queue set: shuffle-sharded fair queuing in front of a seat budget.
//!
//! All state sits behind one mutex. Every transition (enqueue, dispatch,
//! abandon, finish, seat release) happens under it, so the totals always
//! equal the per-queue sums and a waiting request is resolved exactly once.
//! The only suspension point is a caller waiting in [`QueueSet::start_request`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::config::{ConfigError, DispatchingConfig, QueuingConfig, WorkEstimate};
use super::dispatch::find_dispatch_queue;
use super::observer::{NoopObserver, QueueSetObserver, RejectReason};
use super::promise::WriteOnce;
use super::queue::{Queue, WaitingRequest};
use super::request::{Decision, Dispatched, Request};
use super::shuffle_shard::Dealer;
use super::virtual_time::{work_charge, ServiceEstimator, VirtualClock};
use crate::clock::{deadline_after, Clock, TokioClock};
use crate::telemetry::{RequestSpan, SpanExt};

/// Seat-aware fair-queuing admission engine.
///
/// Cloning gives another handle to the same engine.
#[derive(Clone)]
pub struct QueueSet {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    clock: Arc<dyn Clock>,
    observer: Arc<dyn QueueSetObserver>,
    state: Mutex<State>,
}

struct State {
    qcfg: QueuingConfig,
    dcfg: DispatchingConfig,
    dealer: Option<Dealer>,
    queues: Vec<Queue>,
    robin_index: usize,
    estimator: ServiceEstimator,
    vclock: VirtualClock,
    tot_requests_waiting: usize,
    tot_seats_waiting: u32,
    tot_requests_executing: usize,
    tot_seats_in_use: u32,
    next_id: u64,
}

/// What a caller holds while its request waits in a queue.
struct WaitTicket {
    id: u64,
    queue: usize,
    work: WorkEstimate,
    flow_label: Arc<str>,
    deadline: Instant,
    decision: Arc<WriteOnce<Decision>>,
}

/// Abandons the waiting request if the waiting future is dropped.
struct AbandonOnDrop {
    shared: Arc<Shared>,
    ticket: Option<WaitTicket>,
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            // If dispatch won the race the handle is dropped here, which
            // gives the seats straight back.
            let (request, _) =
                Shared::resolve_wait(&self.shared, ticket, RejectReason::ContextCancelled);
            drop(request);
        }
    }
}

/// Builder for [`QueueSet`] with injectable clock and observer.
pub struct QueueSetBuilder {
    qcfg: QueuingConfig,
    dcfg: DispatchingConfig,
    clock: Option<Arc<dyn Clock>>,
    observer: Option<Arc<dyn QueueSetObserver>>,
}

impl QueueSetBuilder {
    pub fn dispatching(mut self, dcfg: DispatchingConfig) -> Self {
        self.dcfg = dcfg;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn QueueSetObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validate the configuration and build the engine.
    ///
    /// Without an explicit clock this binds a [`TokioClock`] to the current
    /// runtime.
    pub fn build(self) -> Result<QueueSet, ConfigError> {
        let dealer = self.qcfg.validate()?;
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(TokioClock::current()?),
        };
        let observer: Arc<dyn QueueSetObserver> = match self.observer {
            Some(observer) => observer,
            None => Arc::new(NoopObserver),
        };

        let queues = (0..self.qcfg.desired_num_queues)
            .map(|index| Queue::new(index, 0.0))
            .collect::<Vec<_>>();
        let robin_index = queues.len().saturating_sub(1);

        tracing::debug!(
            queue_set = %self.qcfg.name,
            queues = queues.len(),
            queue_length_limit = self.qcfg.queue_length_limit,
            hand_size = self.qcfg.hand_size,
            concurrency_limit = self.dcfg.concurrency_limit,
            "queue set created"
        );

        let state = State {
            qcfg: self.qcfg,
            dcfg: self.dcfg,
            dealer,
            queues,
            robin_index,
            estimator: ServiceEstimator::default(),
            vclock: VirtualClock::default(),
            tot_requests_waiting: 0,
            tot_seats_waiting: 0,
            tot_requests_executing: 0,
            tot_seats_in_use: 0,
            next_id: 1,
        };
        Ok(QueueSet {
            shared: Arc::new(Shared {
                clock,
                observer,
                state: Mutex::new(state),
            }),
        })
    }
}

impl QueueSet {
    /// Engine on the current tokio runtime with no observer.
    pub fn new(qcfg: QueuingConfig, dcfg: DispatchingConfig) -> Result<Self, ConfigError> {
        Self::builder(qcfg).dispatching(dcfg).build()
    }

    pub fn builder(qcfg: QueuingConfig) -> QueueSetBuilder {
        QueueSetBuilder {
            qcfg,
            dcfg: DispatchingConfig::default(),
            clock: None,
            observer: None,
        }
    }

    pub fn name(&self) -> String {
        self.shared.state.lock().qcfg.name.clone()
    }

    /// Submit a request and wait until it may execute.
    ///
    /// Returns the handle when the request is admitted, or `None` when it was
    /// rejected on arrival, timed out, or cancelled; the reason goes to the
    /// observer. The flag is true when the engine has nothing waiting and
    /// nothing executing after the call.
    pub async fn start_request(
        &self,
        flow_hash: u64,
        work: WorkEstimate,
        flow_label: &str,
        cancel: CancellationToken,
    ) -> (Option<Request>, bool) {
        let shared = &self.shared;
        let flow_label: Arc<str> = Arc::from(flow_label);
        let work = WorkEstimate::new(work.seats, work.additional_latency);

        let (ticket, span) = {
            let mut guard = shared.state.lock();
            let state = &mut *guard;
            let observer = shared.observer.as_ref();
            let now = shared.clock.now();

            if state.qcfg.queuing_disabled() {
                if !state.can_accommodate(work.seats) {
                    state.reject(observer, &flow_label, RejectReason::ConcurrencyLimit);
                    return (None, state.is_idle());
                }
                let (id, dispatched) = state.dispatch_sans_queue(observer, work, &flow_label, now);
                let request = Request::new(shared.clone(), id, None, work, flow_label, dispatched);
                return (Some(request), false);
            }

            let ticket = match state.enqueue(observer, flow_hash, work, &flow_label, now) {
                Ok(ticket) => ticket,
                Err(reason) => {
                    state.reject(observer, &flow_label, reason);
                    return (None, state.is_idle());
                }
            };
            state.dispatch_as_much_as_possible(observer, now);

            match ticket.decision.get() {
                Some(Decision::Execute(dispatched)) => {
                    let request = Request::new(
                        shared.clone(),
                        ticket.id,
                        Some(ticket.queue),
                        work,
                        ticket.flow_label,
                        dispatched,
                    );
                    return (Some(request), false);
                }
                Some(Decision::Reject(_)) => return (None, state.is_idle()),
                None => {}
            }
            let span = RequestSpan::new(&state.qcfg.name, &flow_label, ticket.id, ticket.queue);
            (ticket, span)
        };

        let result = self
            .await_decision(ticket, cancel)
            .instrument(span.clone())
            .await;
        span.record_outcome(match &result.0 {
            Some(_) => Ok(()),
            None => Err(result.1.unwrap_or(RejectReason::ContextCancelled)),
        });
        (result.0, result.2)
    }

    /// Race dispatch against cancellation and the wait limit.
    async fn await_decision(
        &self,
        ticket: WaitTicket,
        cancel: CancellationToken,
    ) -> (Option<Request>, Option<RejectReason>, bool) {
        let decision = ticket.decision.clone();
        let deadline = ticket.deadline;
        let mut guard = AbandonOnDrop {
            shared: self.shared.clone(),
            ticket: Some(ticket),
        };

        let abandon = tokio::select! {
            biased;
            _ = decision.wait() => None,
            _ = cancel.cancelled() => Some(RejectReason::ContextCancelled),
            _ = self.shared.clock.sleep_until(deadline) => Some(RejectReason::TimeOut),
        };

        let Some(ticket) = guard.ticket.take() else {
            return (None, abandon, self.is_idle());
        };
        // A decided promise takes precedence over the abandon reason.
        let (request, idle) = Shared::resolve_wait(
            &self.shared,
            ticket,
            abandon.unwrap_or(RejectReason::ContextCancelled),
        );
        let reason = match decision.get() {
            Some(Decision::Reject(reason)) => Some(reason),
            _ => None,
        };
        (request, reason, idle)
    }

    /// Change the concurrency limit and dispatch whatever now fits.
    pub fn set_dispatching_config(&self, dcfg: DispatchingConfig) {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        tracing::info!(
            queue_set = %state.qcfg.name,
            old = state.dcfg.concurrency_limit,
            new = dcfg.concurrency_limit,
            "concurrency limit changed"
        );
        state.dcfg = dcfg;
        let now = self.shared.clock.now();
        state.dispatch_as_much_as_possible(self.shared.observer.as_ref(), now);
    }

    /// Replace the queuing configuration.
    ///
    /// New queues are added at once. Surplus queues are kept until they have
    /// drained and are then removed from the end. With zero queues, new
    /// arrivals are admitted or rejected immediately while existing waiters
    /// still get dispatched.
    pub fn reconfigure(&self, qcfg: QueuingConfig) -> Result<(), ConfigError> {
        let dealer = qcfg.validate()?;
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;
        let now = self.shared.clock.now();

        let vnow = state.sync_virtual_time();
        let current = state.queues.len();
        for index in current..qcfg.desired_num_queues {
            state.queues.push(Queue::new(index, vnow));
        }
        tracing::info!(
            queue_set = %qcfg.name,
            old_queues = current,
            desired_queues = qcfg.desired_num_queues,
            queue_length_limit = qcfg.queue_length_limit,
            hand_size = qcfg.hand_size,
            "queue set reconfigured"
        );
        state.dealer = dealer;
        state.qcfg = qcfg;
        state.shed_surplus_queues();
        state.dispatch_as_much_as_possible(self.shared.observer.as_ref(), now);
        Ok(())
    }

    /// True when nothing is waiting and nothing is executing.
    pub fn is_idle(&self) -> bool {
        self.shared.state.lock().is_idle()
    }

    /// Snapshot of the engine's counters and queues.
    pub fn dump(&self) -> QueueSetDump {
        let state = self.shared.state.lock();
        QueueSetDump {
            name: state.qcfg.name.clone(),
            concurrency_limit: state.dcfg.concurrency_limit,
            queuing_disabled: state.qcfg.queuing_disabled(),
            requests_waiting: state.tot_requests_waiting,
            seats_waiting: state.tot_seats_waiting,
            requests_executing: state.tot_requests_executing,
            seats_in_use: state.tot_seats_in_use,
            robin_index: state.robin_index,
            virtual_time: state.vclock.now(),
            estimated_service_secs: state.estimator.estimate().as_secs_f64(),
            queues: state
                .queues
                .iter()
                .map(|q| QueueDump {
                    index: q.index,
                    waiting: q.len(),
                    seats_waiting: q.seats_waiting(),
                    requests_executing: q.requests_executing,
                    seats_in_use: q.seats_in_use,
                    virtual_start: q.virtual_start,
                })
                .collect(),
        }
    }
}

impl Shared {
    /// Settle a waiter that woke up. Exactly one of dispatch or abandonment
    /// wins; if dispatch already did, the caller gets its handle.
    fn resolve_wait(
        shared: &Arc<Shared>,
        ticket: WaitTicket,
        reason: RejectReason,
    ) -> (Option<Request>, bool) {
        let mut guard = shared.state.lock();
        let state = &mut *guard;
        let observer = shared.observer.as_ref();

        if let Some(decision) = ticket.decision.get() {
            return match decision {
                Decision::Execute(dispatched) => {
                    let request = Request::new(
                        shared.clone(),
                        ticket.id,
                        Some(ticket.queue),
                        ticket.work,
                        ticket.flow_label,
                        dispatched,
                    );
                    (Some(request), false)
                }
                Decision::Reject(_) => (None, state.is_idle()),
            };
        }

        ticket.decision.set(Decision::Reject(reason));
        let removed = state
            .queues
            .get_mut(ticket.queue)
            .and_then(|queue| queue.remove(ticket.id));
        match removed {
            Some(waiting) => {
                state.forget_waiting(observer, &waiting);
                state.queues[ticket.queue].bound_virtual_start();
                state.reject(observer, &waiting.flow_label, reason);
            }
            None => tracing::warn!(
                request_id = ticket.id,
                queue = ticket.queue,
                "undecided request missing from its queue"
            ),
        }
        // The queue's head changed, which may let a different request fit.
        let now = shared.clock.now();
        state.dispatch_as_much_as_possible(observer, now);
        state.shed_surplus_queues();
        (None, state.is_idle())
    }

    /// Bookkeeping when an admitted request finishes executing.
    pub(crate) fn finish_request(shared: &Arc<Shared>, request: &Request) -> bool {
        let dispatched = request.dispatched();
        let work = request.work();
        let queue = request.queue_index();

        let idle = {
            let mut guard = shared.state.lock();
            let state = &mut *guard;
            let observer = shared.observer.as_ref();
            let now = shared.clock.now();
            let execution = now.saturating_duration_since(dispatched.started_at);

            state.tot_requests_executing = state.tot_requests_executing.saturating_sub(1);
            observer.executing_changed(&state.qcfg.name, request.flow_label(), -1);
            state.estimator.observe(execution);

            if let Some(index) = queue {
                match state.queues.get_mut(index) {
                    Some(q) => {
                        q.requests_executing = q.requests_executing.saturating_sub(1);
                        let actual =
                            work_charge(work.seats, execution, work.additional_latency, dispatched.busy);
                        q.virtual_start -= dispatched.charged - actual;
                        q.bound_virtual_start();
                    }
                    None => tracing::warn!(
                        request_id = request.id(),
                        queue = index,
                        "finished request's queue no longer exists"
                    ),
                }
            }

            if work.additional_latency.is_zero() {
                state.release_seats(observer, queue, work.seats, request.flow_label());
                state.dispatch_as_much_as_possible(observer, now);
                state.shed_surplus_queues();
            }
            state.is_idle()
        };

        if !work.additional_latency.is_zero() {
            let lingering = Arc::clone(shared);
            let flow_label = request.flow_label().to_string();
            shared.clock.after(
                work.additional_latency,
                Box::new(move || lingering.release_lingering_seats(queue, work.seats, &flow_label)),
            );
        }
        idle
    }

    /// Deferred half of finishing: the additional latency has passed.
    fn release_lingering_seats(&self, queue: Option<usize>, seats: u32, flow_label: &str) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let observer = self.observer.as_ref();
        let now = self.clock.now();
        state.release_seats(observer, queue, seats, flow_label);
        state.dispatch_as_much_as_possible(observer, now);
        state.shed_surplus_queues();
    }
}

impl State {
    fn is_idle(&self) -> bool {
        self.tot_requests_waiting == 0 && self.tot_requests_executing == 0
    }

    fn can_accommodate(&self, seats: u32) -> bool {
        self.tot_seats_in_use.saturating_add(seats) <= self.dcfg.concurrency_limit
    }

    fn next_request_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn busy_queues(&self) -> usize {
        self.queues.iter().filter(|q| q.is_busy()).count()
    }

    fn sync_virtual_time(&mut self) -> f64 {
        self.vclock.sync(
            self.queues
                .iter()
                .filter(|q| q.is_active())
                .map(|q| q.virtual_start),
        )
    }

    fn reject(&self, observer: &dyn QueueSetObserver, flow_label: &str, reason: RejectReason) {
        tracing::debug!(
            queue_set = %self.qcfg.name,
            flow = %flow_label,
            reason = %reason,
            "request rejected"
        );
        observer.rejected(&self.qcfg.name, flow_label, reason);
    }

    /// Pick a queue from the flow's hand and append the request to it.
    fn enqueue(
        &mut self,
        observer: &dyn QueueSetObserver,
        flow_hash: u64,
        work: WorkEstimate,
        flow_label: &Arc<str>,
        now: Instant,
    ) -> Result<WaitTicket, RejectReason> {
        let Some(dealer) = self.dealer else {
            return Err(RejectReason::ConcurrencyLimit);
        };
        // Could never fit, and would block every request queued behind it.
        if work.seats > self.dcfg.concurrency_limit {
            return Err(RejectReason::ConcurrencyLimit);
        }

        let queues = &self.queues;
        let mut best: Option<(usize, u32)> = None;
        dealer.deal(flow_hash, |card| {
            let demand = queues[card].seats_demanded();
            let better = match best {
                None => true,
                Some((idx, least)) => demand < least || (demand == least && card < idx),
            };
            if better {
                best = Some((card, demand));
            }
        });
        let Some((index, _)) = best else {
            return Err(RejectReason::QueueFull);
        };

        self.expire_queue(observer, index, now);
        if self.queues[index].len() >= self.qcfg.queue_length_limit {
            return Err(RejectReason::QueueFull);
        }

        let vnow = self.sync_virtual_time();
        let id = self.next_request_id();
        let decision = Arc::new(WriteOnce::new());
        let queue = &mut self.queues[index];
        if !queue.is_active() {
            queue.virtual_start = vnow;
        }
        queue.push(WaitingRequest {
            id,
            seats: work.seats,
            additional_latency: work.additional_latency,
            flow_label: flow_label.clone(),
            arrival_r: vnow,
            enqueued_at: now,
            decision: decision.clone(),
        });
        self.tot_requests_waiting += 1;
        self.tot_seats_waiting = self.tot_seats_waiting.saturating_add(work.seats);
        observer.waiting_changed(&self.qcfg.name, flow_label, 1, i64::from(work.seats));

        Ok(WaitTicket {
            id,
            queue: index,
            work,
            flow_label: flow_label.clone(),
            deadline: deadline_after(now, self.qcfg.request_wait_limit),
            decision,
        })
    }

    /// Drop waiting-side totals for a request that left a queue undispatched.
    fn forget_waiting(&mut self, observer: &dyn QueueSetObserver, waiting: &WaitingRequest) {
        self.tot_requests_waiting = self.tot_requests_waiting.saturating_sub(1);
        self.tot_seats_waiting = self.tot_seats_waiting.saturating_sub(waiting.seats);
        observer.waiting_changed(&self.qcfg.name, &waiting.flow_label, -1, -i64::from(waiting.seats));
    }

    /// Reject requests at the head of one queue that timed out, or that
    /// can no longer fit because the concurrency limit was lowered.
    fn expire_queue(&mut self, observer: &dyn QueueSetObserver, index: usize, now: Instant) {
        let limit = self.qcfg.request_wait_limit;
        let max_seats = self.dcfg.concurrency_limit;
        let mut expired = false;
        loop {
            let (waiting, reason) = match self.queues[index].pop_expired(now, limit) {
                Some(waiting) => (waiting, RejectReason::TimeOut),
                None => match self.queues[index].pop_wider_than(max_seats) {
                    Some(waiting) => (waiting, RejectReason::ConcurrencyLimit),
                    None => break,
                },
            };
            expired = true;
            waiting.decision.set(Decision::Reject(reason));
            self.forget_waiting(observer, &waiting);
            self.reject(observer, &waiting.flow_label, reason);
        }
        if expired {
            self.queues[index].bound_virtual_start();
        }
    }

    fn dispatch_as_much_as_possible(&mut self, observer: &dyn QueueSetObserver, now: Instant) {
        for index in 0..self.queues.len() {
            self.expire_queue(observer, index, now);
        }
        loop {
            let available = self
                .dcfg
                .concurrency_limit
                .saturating_sub(self.tot_seats_in_use);
            if available == 0 || self.tot_requests_waiting == 0 {
                break;
            }
            let busy = self.busy_queues();
            let Some(index) = find_dispatch_queue(
                &self.queues,
                &mut self.robin_index,
                available,
                &self.estimator,
                busy,
            ) else {
                break;
            };
            self.dispatch_from(observer, index, busy, now);
        }
    }

    fn dispatch_from(
        &mut self,
        observer: &dyn QueueSetObserver,
        index: usize,
        busy: usize,
        now: Instant,
    ) {
        let busy_after = busy + usize::from(!self.queues[index].is_busy());
        let Some(waiting) = self.queues[index].pop_head() else {
            return;
        };
        self.forget_waiting(observer, &waiting);
        if waiting.decision.is_set() {
            tracing::warn!(request_id = waiting.id, "skipping already-resolved request at dispatch");
            return;
        }

        let charged = self
            .estimator
            .charge(waiting.seats, waiting.additional_latency, busy_after);
        let queue = &mut self.queues[index];
        queue.requests_executing += 1;
        queue.seats_in_use += waiting.seats;
        queue.virtual_start += charged;
        self.tot_requests_executing += 1;
        self.tot_seats_in_use += waiting.seats;

        let name = &self.qcfg.name;
        observer.executing_changed(name, &waiting.flow_label, 1);
        observer.seats_in_use_changed(name, &waiting.flow_label, i64::from(waiting.seats));
        observer.dispatched(name, &waiting.flow_label, now.saturating_duration_since(waiting.enqueued_at));

        tracing::trace!(
            queue_set = %name,
            request_id = waiting.id,
            queue = index,
            seats = waiting.seats,
            charged,
            seats_in_use = self.tot_seats_in_use,
            "dispatched"
        );
        waiting.decision.set(Decision::Execute(Dispatched {
            started_at: now,
            charged,
            busy: busy_after,
        }));
        // The new head may be one that can never fit.
        self.expire_queue(observer, index, now);
    }

    /// Admit without queuing. Caller has checked the seats fit.
    fn dispatch_sans_queue(
        &mut self,
        observer: &dyn QueueSetObserver,
        work: WorkEstimate,
        flow_label: &str,
        now: Instant,
    ) -> (u64, Dispatched) {
        let id = self.next_request_id();
        self.tot_requests_executing += 1;
        self.tot_seats_in_use += work.seats;
        let name = &self.qcfg.name;
        observer.executing_changed(name, flow_label, 1);
        observer.seats_in_use_changed(name, flow_label, i64::from(work.seats));
        observer.dispatched(name, flow_label, Duration::ZERO);
        (
            id,
            Dispatched {
                started_at: now,
                charged: 0.0,
                busy: 0,
            },
        )
    }

    fn release_seats(
        &mut self,
        observer: &dyn QueueSetObserver,
        queue: Option<usize>,
        seats: u32,
        flow_label: &str,
    ) {
        if self.tot_seats_in_use < seats {
            tracing::warn!(
                queue_set = %self.qcfg.name,
                in_use = self.tot_seats_in_use,
                releasing = seats,
                "releasing more seats than in use"
            );
        }
        self.tot_seats_in_use = self.tot_seats_in_use.saturating_sub(seats);
        if let Some(q) = queue.and_then(|index| self.queues.get_mut(index)) {
            q.seats_in_use = q.seats_in_use.saturating_sub(seats);
        }
        observer.seats_in_use_changed(&self.qcfg.name, flow_label, -i64::from(seats));
    }

    /// Remove drained queues beyond the desired count, from the end.
    fn shed_surplus_queues(&mut self) {
        let desired = self.qcfg.desired_num_queues;
        let before = self.queues.len();
        while self.queues.len() > desired && self.queues.last().map_or(false, Queue::is_drained) {
            self.queues.pop();
        }
        if self.queues.len() != before {
            tracing::info!(
                queue_set = %self.qcfg.name,
                removed = before - self.queues.len(),
                remaining = self.queues.len(),
                "surplus queues removed"
            );
            self.robin_index = match self.queues.len() {
                0 => 0,
                n => self.robin_index % n,
            };
        }
    }
}

/// Serializable snapshot of a queue set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSetDump {
    pub name: String,
    pub concurrency_limit: u32,
    pub queuing_disabled: bool,
    pub requests_waiting: usize,
    pub seats_waiting: u32,
    pub requests_executing: usize,
    pub seats_in_use: u32,
    pub robin_index: usize,
    pub virtual_time: f64,
    pub estimated_service_secs: f64,
    pub queues: Vec<QueueDump>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDump {
    pub index: usize,
    pub waiting: usize,
    pub seats_waiting: u32,
    pub requests_executing: usize,
    pub seats_in_use: u32,
    pub virtual_start: f64,
}

impl QueueSetDump {
    /// Check that the totals match the per-queue sums and the seat budget.
    ///
    /// Seats of requests admitted without a queue are not attributed to any
    /// queue, so this only holds while queuing is enabled.
    pub fn totals_consistent(&self) -> bool {
        let waiting: usize = self.queues.iter().map(|q| q.waiting).sum();
        let seats_waiting: u32 = self.queues.iter().map(|q| q.seats_waiting).sum();
        let executing: usize = self.queues.iter().map(|q| q.requests_executing).sum();
        let seats: u32 = self.queues.iter().map(|q| q.seats_in_use).sum();
        waiting == self.requests_waiting
            && seats_waiting == self.seats_waiting
            && executing == self.requests_executing
            && seats == self.seats_in_use
            && self.seats_in_use <= self.concurrency_limit
    }
}
