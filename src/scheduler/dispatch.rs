//! Choice of the next queue to dispatch from.

use super::queue::Queue;
use super::virtual_time::ServiceEstimator;

/// Pick the queue whose head request should be dispatched next.
///
/// Queues are scanned round-robin starting after `robin_index`. Only queues
/// whose head fits in `available_seats` are eligible; among them the one with
/// the smallest virtual finish (virtual start plus the head's prospective
/// charge) wins, ties going to the earlier queue in scan order.
///
/// On success `robin_index` moves to the chosen queue. When heads exist but
/// none fits, it still moves on by one so repeated capacity rejections do not
/// always restart the scan at the same place.
pub(crate) fn find_dispatch_queue(
    queues: &[Queue],
    robin_index: &mut usize,
    available_seats: u32,
    estimator: &ServiceEstimator,
    busy_queues: usize,
) -> Option<usize> {
    let n = queues.len();
    if n == 0 {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    let mut saw_waiting = false;
    for step in 1..=n {
        let idx = (*robin_index + step) % n;
        let queue = &queues[idx];
        let Some(head) = queue.head() else {
            continue;
        };
        saw_waiting = true;
        if head.seats > available_seats {
            continue;
        }
        let busy_after = busy_queues + usize::from(!queue.is_busy());
        let finish = queue.virtual_start
            + estimator.charge(head.seats, head.additional_latency, busy_after);
        if best.map_or(true, |(_, best_finish)| finish < best_finish) {
            best = Some((idx, finish));
        }
    }

    match best {
        Some((idx, _)) => {
            *robin_index = idx;
            Some(idx)
        }
        None => {
            if saw_waiting {
                *robin_index = (*robin_index + 1) % n;
            }
            None
        }
    }
}
