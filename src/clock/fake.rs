//! Manually stepped clock for deterministic tests.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{deadline_after, Callback, Clock};

enum Timer {
    Wake(oneshot::Sender<()>),
    Run(Callback),
}

struct FakeState {
    now: Instant,
    next_seq: u64,
    /// Keyed by (deadline, registration order) so equal deadlines fire FIFO.
    timers: BTreeMap<(Instant, u64), Timer>,
}

/// Clock whose time only moves when [`FakeClock::step`] is called.
pub struct FakeClock {
    state: Mutex<FakeState>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            state: Mutex::new(FakeState {
                now,
                next_seq: 0,
                timers: BTreeMap::new(),
            }),
        }
    }

    /// Number of sleepers and callbacks not yet fired.
    ///
    /// Sleepers whose future was dropped are discarded first.
    pub fn pending_timers(&self) -> usize {
        let mut state = self.state.lock();
        state
            .timers
            .retain(|_, timer| !matches!(timer, Timer::Wake(tx) if tx.is_closed()));
        state.timers.len()
    }

    /// Advance time by `delta`, firing everything that comes due on the way.
    ///
    /// Timers fire with the clock set to their own deadline, and the clock's
    /// lock is released while each one runs.
    pub fn step(&self, delta: Duration) {
        let target = self.state.lock().now + delta;
        loop {
            let timer = {
                let mut state = self.state.lock();
                let due = match state.timers.keys().next() {
                    Some(&key) if key.0 <= target => key,
                    _ => {
                        state.now = target;
                        return;
                    }
                };
                if due.0 > state.now {
                    state.now = due.0;
                }
                state.timers.remove(&due)
            };
            match timer {
                Some(Timer::Wake(tx)) => {
                    let _ = tx.send(());
                }
                Some(Timer::Run(callback)) => callback(),
                None => {}
            }
        }
    }

    fn register(&self, deadline: Instant, timer: Timer) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.timers.insert((deadline, seq), timer);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().now
    }

    fn sleep_until(&self, deadline: Instant) -> BoxFuture<'static, ()> {
        if deadline <= self.now() {
            return futures::future::ready(()).boxed();
        }
        let (tx, rx) = oneshot::channel();
        self.register(deadline, Timer::Wake(tx));
        async move {
            let _ = rx.await;
        }
        .boxed()
    }

    fn after(&self, delay: Duration, callback: Callback) {
        let deadline = deadline_after(self.now(), delay);
        self.register(deadline, Timer::Run(callback));
    }
}
