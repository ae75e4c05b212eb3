//! Tests for queue set admission, dispatch, and release.

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio_test::{assert_pending, assert_ready, task};
    use tokio_util::sync::CancellationToken;

    use crate::clock::FakeClock;
    use crate::scheduler::{
        DispatchingConfig, QueueSet, QueueSetObserver, QueuingConfig, RejectReason, WorkEstimate,
    };

    #[derive(Default)]
    struct Recorder {
        rejected: Mutex<Vec<RejectReason>>,
        dispatched: AtomicUsize,
    }

    impl Recorder {
        fn rejections(&self) -> Vec<RejectReason> {
            self.rejected.lock().clone()
        }
    }

    impl QueueSetObserver for Recorder {
        fn dispatched(&self, _queue_set: &str, _flow: &str, _waited: Duration) {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
        }

        fn rejected(&self, _queue_set: &str, _flow: &str, reason: RejectReason) {
            self.rejected.lock().push(reason);
        }
    }

    struct Fixture {
        qs: QueueSet,
        clock: Arc<FakeClock>,
        recorder: Arc<Recorder>,
    }

    fn fixture(queues: usize, length: usize, hand: usize, wait_ms: u64, limit: u32) -> Fixture {
        let clock = Arc::new(FakeClock::new());
        let recorder = Arc::new(Recorder::default());
        let qs = QueueSet::builder(QueuingConfig {
            name: "test".into(),
            desired_num_queues: queues,
            queue_length_limit: length,
            hand_size: hand,
            request_wait_limit: Duration::from_millis(wait_ms),
        })
        .dispatching(DispatchingConfig {
            concurrency_limit: limit,
        })
        .clock(clock.clone())
        .observer(recorder.clone())
        .build()
        .unwrap();
        Fixture { qs, clock, recorder }
    }

    /// One queue, one seat, ten second wait limit.
    fn serial() -> Fixture {
        fixture(1, 10, 1, 10_000, 1)
    }

    fn one_seat() -> WorkEstimate {
        WorkEstimate::single_seat()
    }

    fn never() -> CancellationToken {
        CancellationToken::new()
    }

    #[test]
    fn serial_requests_run_one_at_a_time() {
        let f = serial();

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (a, idle) = assert_ready!(first.poll());
        let a = a.expect("first request admitted");
        assert!(!idle);

        let mut second = task::spawn(f.qs.start_request(2, one_seat(), "b", never()));
        assert_pending!(second.poll());
        let dump = f.qs.dump();
        assert_eq!(dump.requests_waiting, 1);
        assert_eq!(dump.requests_executing, 1);
        assert_eq!(dump.seats_in_use, 1);

        let clock = f.clock.clone();
        assert!(!a.finish(|| clock.step(Duration::from_millis(5))));
        assert!(second.is_woken());
        let (b, _) = assert_ready!(second.poll());
        let b = b.expect("second request admitted after first finished");

        assert!(b.finish(|| {}));
        assert!(f.qs.is_idle());
        assert_eq!(f.recorder.dispatched.load(Ordering::SeqCst), 2);
        assert!(f.recorder.rejections().is_empty());
    }

    #[test]
    fn zero_length_limit_admits_or_rejects_immediately() {
        let f = fixture(4, 0, 2, 1_000, 1);

        let mut first = task::spawn(f.qs.start_request(7, one_seat(), "a", never()));
        let (a, _) = assert_ready!(first.poll());
        let a = a.expect("fits within the limit");
        assert_eq!(a.queue_index(), None);

        let mut second = task::spawn(f.qs.start_request(7, one_seat(), "a", never()));
        let (b, idle) = assert_ready!(second.poll());
        assert!(b.is_none());
        assert!(!idle);
        assert_eq!(f.recorder.rejections(), vec![RejectReason::ConcurrencyLimit]);

        assert!(a.finish(|| {}));
    }

    #[test]
    fn full_queue_rejects_on_arrival() {
        let f = fixture(1, 1, 1, 10_000, 1);

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (_a, _) = assert_ready!(first.poll());

        let mut second = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        assert_pending!(second.poll());

        let mut third = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (c, idle) = assert_ready!(third.poll());
        assert!(c.is_none());
        assert!(!idle);
        assert_eq!(f.recorder.rejections(), vec![RejectReason::QueueFull]);
        assert_eq!(f.qs.dump().requests_waiting, 1);
    }

    #[test]
    fn waiter_times_out_at_wait_limit() {
        let f = fixture(1, 5, 1, 100, 1);

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (_a, _) = assert_ready!(first.poll());

        let mut second = task::spawn(f.qs.start_request(1, one_seat(), "b", never()));
        assert_pending!(second.poll());

        f.clock.step(Duration::from_millis(99));
        assert_pending!(second.poll());

        f.clock.step(Duration::from_millis(1));
        assert!(second.is_woken());
        let (b, idle) = assert_ready!(second.poll());
        assert!(b.is_none());
        assert!(!idle);
        assert_eq!(f.recorder.rejections(), vec![RejectReason::TimeOut]);

        let dump = f.qs.dump();
        assert_eq!(dump.requests_waiting, 0);
        assert_eq!(dump.seats_waiting, 0);
        assert!(dump.totals_consistent());
    }

    #[test]
    fn expired_waiters_are_dropped_by_later_arrivals() {
        let f = fixture(1, 1, 1, 100, 1);

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (_a, _) = assert_ready!(first.poll());
        let mut second = task::spawn(f.qs.start_request(1, one_seat(), "b", never()));
        assert_pending!(second.poll());

        // Queue is full, but its head has already waited past the limit.
        f.clock.step(Duration::from_millis(150));
        let mut third = task::spawn(f.qs.start_request(1, one_seat(), "c", never()));
        assert_pending!(third.poll());

        let (b, _) = assert_ready!(second.poll());
        assert!(b.is_none());
        assert_eq!(f.recorder.rejections(), vec![RejectReason::TimeOut]);
        assert_eq!(f.qs.dump().requests_waiting, 1);
    }

    #[test]
    fn cancellation_removes_waiter() {
        let f = serial();

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (a, _) = assert_ready!(first.poll());

        let cancel = CancellationToken::new();
        let mut second = task::spawn(f.qs.start_request(1, one_seat(), "b", cancel.clone()));
        assert_pending!(second.poll());

        cancel.cancel();
        assert!(second.is_woken());
        let (b, idle) = assert_ready!(second.poll());
        assert!(b.is_none());
        assert!(!idle);
        assert_eq!(f.recorder.rejections(), vec![RejectReason::ContextCancelled]);
        assert_eq!(f.qs.dump().requests_waiting, 0);

        assert!(a.expect("admitted").finish(|| {}));
    }

    #[test]
    fn dispatch_beats_later_cancellation() {
        let f = serial();

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (a, _) = assert_ready!(first.poll());

        let cancel = CancellationToken::new();
        let mut second = task::spawn(f.qs.start_request(1, one_seat(), "b", cancel.clone()));
        assert_pending!(second.poll());

        a.expect("admitted").finish(|| {});
        cancel.cancel();

        let (b, _) = assert_ready!(second.poll());
        let b = b.expect("dispatch happened before the cancel was observed");
        assert!(f.recorder.rejections().is_empty());
        assert_eq!(f.qs.dump().requests_executing, 1);
        assert!(b.finish(|| {}));
    }

    #[test]
    fn dropping_waiting_future_abandons_request() {
        let f = serial();

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (a, _) = assert_ready!(first.poll());

        let mut second = task::spawn(f.qs.start_request(1, one_seat(), "b", never()));
        assert_pending!(second.poll());
        drop(second);

        assert_eq!(f.recorder.rejections(), vec![RejectReason::ContextCancelled]);
        assert_eq!(f.qs.dump().requests_waiting, 0);
        assert!(a.expect("admitted").finish(|| {}));
    }

    #[test]
    fn dropping_dispatched_future_returns_seats() {
        let f = serial();

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (a, _) = assert_ready!(first.poll());

        let mut second = task::spawn(f.qs.start_request(1, one_seat(), "b", never()));
        assert_pending!(second.poll());

        a.expect("admitted").finish(|| {});
        assert_eq!(f.qs.dump().seats_in_use, 1);

        // Dispatched but never observed by the caller.
        drop(second);
        let dump = f.qs.dump();
        assert_eq!(dump.seats_in_use, 0);
        assert_eq!(dump.requests_executing, 0);
        assert!(f.qs.is_idle());
    }

    #[test]
    fn finish_releases_even_when_execution_panics() {
        let f = serial();

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (a, _) = assert_ready!(first.poll());
        let a = a.expect("admitted");

        let mut second = task::spawn(f.qs.start_request(1, one_seat(), "b", never()));
        assert_pending!(second.poll());

        let outcome = catch_unwind(AssertUnwindSafe(|| a.finish(|| panic!("execution failed"))));
        assert!(outcome.is_err());

        let (b, _) = assert_ready!(second.poll());
        assert!(b.is_some());
        assert_eq!(f.qs.dump().requests_executing, 1);
    }

    #[test]
    fn dropped_handle_releases_seats() {
        let f = serial();

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (a, _) = assert_ready!(first.poll());
        drop(a);

        assert!(f.qs.is_idle());
        assert_eq!(f.qs.dump().seats_in_use, 0);
    }

    #[test]
    fn additional_latency_holds_seats_after_finish() {
        let f = serial();
        let lingering = WorkEstimate::new(1, Duration::from_millis(50));

        let mut first = task::spawn(f.qs.start_request(1, lingering, "a", never()));
        let (a, _) = assert_ready!(first.poll());

        let mut second = task::spawn(f.qs.start_request(1, one_seat(), "b", never()));
        assert_pending!(second.poll());

        assert!(!a.expect("admitted").finish(|| {}));
        let dump = f.qs.dump();
        assert_eq!(dump.requests_executing, 0);
        assert_eq!(dump.seats_in_use, 1);
        assert_pending!(second.poll());

        f.clock.step(Duration::from_millis(49));
        assert_pending!(second.poll());

        f.clock.step(Duration::from_millis(1));
        let (b, _) = assert_ready!(second.poll());
        assert!(b.is_some());
        assert_eq!(f.qs.dump().seats_in_use, 1);
    }

    #[test]
    fn requests_in_one_queue_dispatch_in_arrival_order() {
        let f = serial();

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (a, _) = assert_ready!(first.poll());

        let mut waiters: Vec<_> = ["b", "c", "d"]
            .into_iter()
            .map(|label| task::spawn(f.qs.start_request(1, one_seat(), label, never())))
            .collect();
        for waiter in waiters.iter_mut() {
            assert_pending!(waiter.poll());
        }

        let mut current = a.expect("admitted");
        for (i, expected) in ["b", "c", "d"].into_iter().enumerate() {
            current.finish(|| {});
            let (next, _) = assert_ready!(waiters[i].poll());
            let next = next.expect("next in line");
            assert_eq!(next.flow_label(), expected);
            for later in waiters.iter_mut().skip(i + 1) {
                assert_pending!(later.poll());
            }
            current = next;
        }
        assert!(current.finish(|| {}));
    }

    #[test]
    fn wide_request_waits_for_enough_seats() {
        let f = fixture(1, 10, 1, 10_000, 4);

        let mut first = task::spawn(f.qs.start_request(1, WorkEstimate::new(3, Duration::ZERO), "a", never()));
        let (a, _) = assert_ready!(first.poll());

        let mut wide = task::spawn(f.qs.start_request(1, WorkEstimate::new(2, Duration::ZERO), "b", never()));
        assert_pending!(wide.poll());
        assert_eq!(f.qs.dump().seats_in_use, 3);

        a.expect("admitted").finish(|| {});
        let (b, _) = assert_ready!(wide.poll());
        assert_eq!(b.expect("fits now").seats(), 2);
        assert_eq!(f.qs.dump().seats_in_use, 2);
    }

    #[test]
    fn request_wider_than_limit_is_rejected_on_arrival() {
        let f = fixture(1, 10, 1, 5_000, 2);

        let mut wide = task::spawn(f.qs.start_request(1, WorkEstimate::new(3, Duration::ZERO), "w", never()));
        let (w, idle) = assert_ready!(wide.poll());
        assert!(w.is_none());
        assert!(idle);
        assert_eq!(f.recorder.rejections(), vec![RejectReason::ConcurrencyLimit]);

        let mut narrow = task::spawn(f.qs.start_request(1, one_seat(), "n", never()));
        let (n, _) = assert_ready!(narrow.poll());
        assert!(n.expect("idle engine admits a narrow request").finish(|| {}));
    }

    #[test]
    fn lowering_limit_evicts_heads_that_no_longer_fit() {
        let f = fixture(1, 10, 1, 10_000, 3);

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (a, _) = assert_ready!(first.poll());
        let mut blocker = task::spawn(f.qs.start_request(1, WorkEstimate::new(3, Duration::ZERO), "w", never()));
        let mut behind = task::spawn(f.qs.start_request(1, one_seat(), "b", never()));
        assert_pending!(blocker.poll());
        assert_pending!(behind.poll());

        f.qs.set_dispatching_config(DispatchingConfig {
            concurrency_limit: 2,
        });
        let (w, _) = assert_ready!(blocker.poll());
        assert!(w.is_none());
        assert_eq!(f.recorder.rejections(), vec![RejectReason::ConcurrencyLimit]);

        let (b, _) = assert_ready!(behind.poll());
        assert!(b.is_some());
        assert_eq!(f.qs.dump().seats_in_use, 2);
        assert!(f.qs.dump().totals_consistent());
        drop(a);
    }

    #[test]
    fn huge_additional_latency_does_not_break_dispatch() {
        let f = serial();

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (a, _) = assert_ready!(first.poll());
        let forever = WorkEstimate::new(1, Duration::MAX);
        let mut second = task::spawn(f.qs.start_request(1, forever, "b", never()));
        assert_pending!(second.poll());

        a.expect("admitted").finish(|| {});
        let (b, _) = assert_ready!(second.poll());
        let b = b.expect("dispatched despite the huge estimate");

        assert!(b.finish(|| {}));
        let dump = f.qs.dump();
        assert_eq!(dump.requests_executing, 0);
        assert_eq!(dump.seats_in_use, 1);
        assert!(dump.virtual_time.is_finite());
    }

    #[test]
    fn zero_seat_estimate_counts_as_one() {
        let f = serial();
        let zero = WorkEstimate {
            seats: 0,
            additional_latency: Duration::ZERO,
        };
        let mut first = task::spawn(f.qs.start_request(1, zero, "a", never()));
        let (a, _) = assert_ready!(first.poll());
        assert_eq!(a.expect("admitted").seats(), 1);
    }

    #[test]
    fn raising_concurrency_limit_dispatches_waiters() {
        let f = serial();

        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (_a, _) = assert_ready!(first.poll());
        let mut second = task::spawn(f.qs.start_request(1, one_seat(), "b", never()));
        let mut third = task::spawn(f.qs.start_request(1, one_seat(), "c", never()));
        assert_pending!(second.poll());
        assert_pending!(third.poll());

        f.qs.set_dispatching_config(DispatchingConfig {
            concurrency_limit: 3,
        });

        let (b, _) = assert_ready!(second.poll());
        let (c, _) = assert_ready!(third.poll());
        assert!(b.is_some() && c.is_some());
        assert_eq!(f.qs.dump().seats_in_use, 3);
    }

    #[test]
    fn reconfigure_grows_at_once_and_shrinks_when_drained() {
        let f = fixture(2, 10, 1, 10_000, 1);
        let mut grown = QueuingConfig {
            name: "test".into(),
            desired_num_queues: 4,
            queue_length_limit: 10,
            hand_size: 1,
            request_wait_limit: Duration::from_secs(10),
        };
        f.qs.reconfigure(grown.clone()).unwrap();
        assert_eq!(f.qs.dump().queues.len(), 4);

        // With a hand of one the hash picks the queue directly.
        let mut first = task::spawn(f.qs.start_request(0, one_seat(), "a", never()));
        let (a, _) = assert_ready!(first.poll());
        let mut second = task::spawn(f.qs.start_request(3, one_seat(), "b", never()));
        assert_pending!(second.poll());
        assert_eq!(f.qs.dump().queues[3].waiting, 1);

        grown.desired_num_queues = 2;
        f.qs.reconfigure(grown).unwrap();
        assert_eq!(f.qs.dump().queues.len(), 4);

        a.expect("admitted").finish(|| {});
        let (b, _) = assert_ready!(second.poll());
        let b = b.expect("surplus queue still dispatches");
        assert_eq!(b.queue_index(), Some(3));
        assert_eq!(f.qs.dump().queues.len(), 4);

        b.finish(|| {});
        let dump = f.qs.dump();
        assert_eq!(dump.queues.len(), 2);
        assert!(dump.robin_index < 2);
    }

    #[test]
    fn reconfigure_to_zero_queues_stops_queuing() {
        let f = serial();
        let mut first = task::spawn(f.qs.start_request(1, one_seat(), "a", never()));
        let (a, _) = assert_ready!(first.poll());

        f.qs.reconfigure(QueuingConfig {
            desired_num_queues: 0,
            ..QueuingConfig::default()
        })
        .unwrap();

        let mut second = task::spawn(f.qs.start_request(1, one_seat(), "b", never()));
        let (b, _) = assert_ready!(second.poll());
        assert!(b.is_none());
        assert_eq!(f.recorder.rejections(), vec![RejectReason::ConcurrencyLimit]);

        a.expect("admitted").finish(|| {});
        assert!(f.qs.dump().queues.is_empty());
    }

    #[test]
    fn invalid_reconfigure_leaves_engine_unchanged() {
        let f = serial();
        let bad = QueuingConfig {
            desired_num_queues: 2,
            hand_size: 3,
            ..QueuingConfig::default()
        };
        assert!(f.qs.reconfigure(bad).is_err());
        assert_eq!(f.qs.dump().queues.len(), 1);
    }

    #[test]
    fn flows_spread_across_their_hands() {
        let f = fixture(8, 10, 2, 10_000, 1);

        let mut first = task::spawn(f.qs.start_request(11, one_seat(), "a", never()));
        let (_a, _) = assert_ready!(first.poll());
        let mut pending: Vec<_> = (0..4)
            .map(|_| task::spawn(f.qs.start_request(11, one_seat(), "a", never())))
            .collect();
        for waiter in pending.iter_mut() {
            assert_pending!(waiter.poll());
        }

        // A flow with a hand of two never touches more than two queues.
        let dump = f.qs.dump();
        let touched = dump
            .queues
            .iter()
            .filter(|q| q.waiting > 0 || q.requests_executing > 0)
            .count();
        assert!(touched <= 2);
        assert_eq!(dump.requests_waiting, 4);
        assert!(dump.totals_consistent());
    }

    #[test]
    fn dump_stays_consistent_and_serializes() {
        let f = fixture(4, 3, 2, 200, 2);

        let mut admitted = Vec::new();
        let mut waiting = Vec::new();
        for hash in 0..8u64 {
            let mut fut = task::spawn(f.qs.start_request(hash * 7919, one_seat(), "mix", never()));
            match fut.poll() {
                std::task::Poll::Ready((Some(req), _)) => admitted.push(req),
                std::task::Poll::Ready((None, _)) => {}
                std::task::Poll::Pending => waiting.push(fut),
            }
            assert!(f.qs.dump().totals_consistent());
        }
        assert_eq!(admitted.len(), 2);

        f.clock.step(Duration::from_millis(10));
        admitted.pop().expect("two admitted").finish(|| {});
        assert!(f.qs.dump().totals_consistent());

        let dump = f.qs.dump();
        let json = serde_json::to_value(&dump).unwrap();
        assert_eq!(json["name"], "test");
        assert_eq!(json["queues"].as_array().map(Vec::len), Some(4));
        assert!(dump.virtual_time >= 0.0);

        drop(waiting);
        drop(admitted);
        assert!(f.qs.is_idle());
        assert!(f.qs.dump().totals_consistent());
    }

    #[test]
    fn name_comes_from_config() {
        let f = serial();
        assert_eq!(f.qs.name(), "test");
        assert_eq!(f.qs.dump().concurrency_limit, 1);
    }
}
