//! Clock abstraction for the admission engine.
//!
//! The engine never reads the wall clock directly. Everything that needs a
//! timestamp, a sleep, or a deferred callback goes through [`Clock`], so the
//! same code runs against tokio's timer in production and against a manually
//! stepped [`FakeClock`] in tests.

mod fake;

pub use fake::FakeClock;

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tokio::runtime::Handle;

/// Roughly thirty years: stands in for deadlines past the end of `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + delay`, capped instead of overflowing.
pub(crate) fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Deferred callback scheduled through [`Clock::after`].
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Time source used by the queue set.
pub trait Clock: Send + Sync + 'static {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Future that completes once `deadline` has been reached.
    fn sleep_until(&self, deadline: Instant) -> BoxFuture<'static, ()>;

    /// Run `callback` once `delay` has elapsed. Must not run it inline.
    fn after(&self, delay: Duration, callback: Callback);
}

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}

/// Clock backed by tokio's timer.
///
/// Honours `tokio::time::pause()`, which makes it usable for simulated-time
/// tests as well.
#[derive(Debug, Clone)]
pub struct TokioClock {
    handle: Handle,
}

impl TokioClock {
    /// Bind to the runtime of the calling context.
    pub fn current() -> Result<Self, ClockError> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|e| ClockError::NoRuntime(e.to_string()))
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep_until(&self, deadline: Instant) -> BoxFuture<'static, ()> {
        tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).boxed()
    }

    fn after(&self, delay: Duration, callback: Callback) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
    }
}
