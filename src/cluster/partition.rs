//! Task partitioning over the canonical pair enumeration.
//!
//! The task universe for N items is every unordered pair, flattened in a fixed
//! order: outer `i = 1..N`, inner `j = 0..i`. The partitioner and the worker
//! loop must agree on this flattening exactly; it is the single source of
//! truth for task index <-> pair translation.

use crate::error::{ClusterError, ClusterResult};
use crate::types::WorkRange;

/// Total number of pair tasks for `n_items` images.
pub fn task_count(n_items: usize) -> usize {
    n_items * n_items.saturating_sub(1) / 2
}

/// Inverse of the canonical flattening: pair `(j, i)` with `j < i` for a task
/// index. The worker walks the enumeration incrementally and never calls
/// this; it exists for tests and diagnostics.
pub fn pair_for_task(task: usize) -> (usize, usize) {
    // Row i holds tasks [i*(i-1)/2, i*(i+1)/2).
    let i = ((1.0 + (1.0 + 8.0 * task as f64).sqrt()) / 2.0) as usize;
    let j = task - i * (i - 1) / 2;
    (j, i)
}

/// Split `total_tasks` task indices into one contiguous [`WorkRange`] per
/// rank. Rank 0 is the coordinator and always gets the empty range `[0, 0)`;
/// the remaining ranks split `[0, total_tasks)` as evenly as the remainder
/// allows, earliest workers taking one extra task.
///
/// The worker ranges are disjoint and their union is exactly
/// `[0, total_tasks)`.
pub fn partition(total_tasks: usize, rank_count: usize) -> ClusterResult<Vec<WorkRange>> {
    if rank_count < 2 {
        return Err(ClusterError::InvalidTopology { ranks: rank_count });
    }

    let workers = rank_count - 1;
    let base = total_tasks / workers;
    let remainder = total_tasks % workers;

    let mut ranges = Vec::with_capacity(rank_count);
    ranges.push(WorkRange::new(0, 0));

    let mut start = 0;
    for w in 0..workers {
        let size = base + usize::from(w < remainder);
        ranges.push(WorkRange::new(start, start + size));
        start += size;
    }

    Ok(ranges)
}
