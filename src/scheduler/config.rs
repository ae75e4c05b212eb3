//! Queue set configuration and work estimates.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::shuffle_shard::{Dealer, DealerError};
use crate::clock::ClockError;

/// Shape of the queues. Fixed for an engine unless it is reconfigured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuingConfig {
    /// Name used in logs and metric labels.
    pub name: String,
    /// Number of queues. Zero disables queuing.
    pub desired_num_queues: usize,
    /// Maximum waiting requests per queue. Zero disables queuing.
    pub queue_length_limit: usize,
    /// Number of candidate queues dealt to each flow.
    pub hand_size: usize,
    /// Longest a request may wait in a queue before it is timed out.
    pub request_wait_limit: Duration,
}

impl Default for QueuingConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            desired_num_queues: 64,
            queue_length_limit: 50,
            hand_size: 8,
            request_wait_limit: Duration::from_secs(15),
        }
    }
}

impl QueuingConfig {
    /// True when arrivals are admitted or rejected without ever waiting.
    pub fn queuing_disabled(&self) -> bool {
        self.desired_num_queues == 0 || self.queue_length_limit == 0
    }

    /// Check the configuration and build the dealer it implies.
    ///
    /// Returns `None` for the dealer when there are no queues.
    pub fn validate(&self) -> Result<Option<Dealer>, ConfigError> {
        if self.desired_num_queues == 0 {
            return Ok(None);
        }
        if self.request_wait_limit.is_zero() && self.queue_length_limit > 0 {
            return Err(ConfigError::ZeroWaitLimit);
        }
        let dealer = Dealer::new(self.desired_num_queues, self.hand_size)?;
        Ok(Some(dealer))
    }
}

/// Knobs that may change between dispatch cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchingConfig {
    /// Total seats shared by all executing requests.
    pub concurrency_limit: u32,
}

impl Default for DispatchingConfig {
    fn default() -> Self {
        Self { concurrency_limit: 100 }
    }
}

/// Cost of one request: seats held while executing, plus how long they stay
/// held after the execute function returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkEstimate {
    pub seats: u32,
    pub additional_latency: Duration,
}

impl WorkEstimate {
    /// A zero seat count is raised to one.
    pub fn new(seats: u32, additional_latency: Duration) -> Self {
        Self {
            seats: seats.max(1),
            additional_latency,
        }
    }

    pub fn single_seat() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for WorkEstimate {
    fn default() -> Self {
        Self::single_seat()
    }
}

/// Construction-time configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid shuffle sharding parameters: {0}")]
    ShuffleSharding(#[from] DealerError),

    #[error("Request wait limit must be positive when queuing is enabled")]
    ZeroWaitLimit,

    #[error("Clock unavailable: {0}")]
    Clock(#[from] ClockError),
}
