//! Virtual-time bookkeeping for fair dispatch ordering.
//!
//! Each queue carries a virtual start time. Dispatching a request charges the
//! queue its estimated work divided by the number of busy queues, so queues
//! that have received less service sort first. Finishing a request replaces
//! the estimate with what the request actually used.
//!
//! Virtual times are plain `f64` seconds. They only ever get compared with
//! each other.

use std::time::Duration;

/// Service duration assumed before anything has been observed.
pub const INITIAL_SERVICE_ESTIMATE: Duration = Duration::from_secs(1);

/// Weight of the newest observation in the moving average.
const ESTIMATE_WEIGHT: f64 = 0.1;

/// Running estimate of how long a request executes.
#[derive(Debug, Clone, Copy)]
pub struct ServiceEstimator {
    estimate_secs: f64,
}

impl ServiceEstimator {
    pub fn new(initial: Duration) -> Self {
        Self {
            estimate_secs: initial.as_secs_f64(),
        }
    }

    pub fn estimate(&self) -> Duration {
        Duration::from_secs_f64(self.estimate_secs)
    }

    /// Fold an observed execution duration into the estimate.
    pub fn observe(&mut self, actual: Duration) {
        self.estimate_secs += ESTIMATE_WEIGHT * (actual.as_secs_f64() - self.estimate_secs);
    }

    /// Virtual time charged when a request is dispatched.
    pub fn charge(&self, seats: u32, additional_latency: Duration, busy_queues: usize) -> f64 {
        work_charge(seats, self.estimate(), additional_latency, busy_queues)
    }
}

impl Default for ServiceEstimator {
    fn default() -> Self {
        Self::new(INITIAL_SERVICE_ESTIMATE)
    }
}

/// `seats * (execution + additional_latency) / max(1, busy_queues)`.
pub fn work_charge(
    seats: u32,
    execution: Duration,
    additional_latency: Duration,
    busy_queues: usize,
) -> f64 {
    let seat_seconds =
        f64::from(seats) * (execution.as_secs_f64() + additional_latency.as_secs_f64());
    seat_seconds / busy_queues.max(1) as f64
}

/// Engine-wide virtual time. Self-clocked from the queues and never moves
/// backwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualClock {
    now: f64,
}

impl VirtualClock {
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Advance to the lowest virtual start among active queues, if that is
    /// ahead of the current reading.
    pub fn sync(&mut self, active_starts: impl Iterator<Item = f64>) -> f64 {
        let floor = active_starts.fold(f64::INFINITY, f64::min);
        if floor.is_finite() && floor > self.now {
            self.now = floor;
        }
        self.now
    }
}
