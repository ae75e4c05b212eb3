//! Max-min fair allocation ("water filling").
//!
//! Reference answer for what the queue set should converge to: demands below
//! the fair share are met in full and the remainder is split evenly among the
//! rest.

/// Allocate `capacity` across `demands` max-min fairly.
///
/// The result is in the same order as `demands`. Negative demands count as
/// zero.
pub fn fair_alloc(demands: &[f64], capacity: f64) -> Vec<f64> {
    let mut order: Vec<usize> = (0..demands.len()).collect();
    order.sort_by(|&a, &b| demands[a].total_cmp(&demands[b]));

    let mut alloc = vec![0.0; demands.len()];
    let mut remaining = capacity.max(0.0);
    let mut left = demands.len();
    for idx in order {
        let share = remaining / left as f64;
        let give = demands[idx].max(0.0).min(share);
        alloc[idx] = give;
        remaining -= give;
        left -= 1;
    }
    alloc
}
