//! Coordinator: partitions the workload, runs the workers, collects results.

use anyhow::{Result, anyhow};
use crossbeam_channel::SendError;
use log::debug;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::cluster::{
    ClusterMessage, collect_records, create_cluster_channels, partition, spawn_workers, task_count,
};
use crate::error::ClusterError;
use crate::features::{FeatureStore, matcher::Matcher};
use crate::types::MatchBuffer;

/// Pick a worker count: explicit override, else available parallelism minus
/// the coordinator's own thread, but always at least one worker.
pub fn resolve_worker_count(requested: Option<usize>) -> usize {
    requested.unwrap_or_else(|| {
        let avail = std::thread::available_parallelism().map_or(2, |n| n.get());
        avail.saturating_sub(1).max(1)
    })
}

/// Run the full coordinator role for `n_items`: partition the pair tasks over
/// the workers, spawn them, collect every record and end signal, join the
/// worker threads, and return the filled buffer.
///
/// `on_message` is forwarded to the collector (one call per received
/// message). Any worker error or protocol violation aborts the run; there is
/// no partial result.
pub fn run_cluster(
    store: Arc<dyn FeatureStore>,
    matcher: Arc<dyn Matcher>,
    worker_count: usize,
    on_message: Option<&dyn Fn(usize)>,
) -> Result<MatchBuffer> {
    let total_tasks = task_count(store.items());
    let rank_count = worker_count + 1;
    let ranges = partition(total_tasks, rank_count)?;
    debug!(
        "coordinator: {total_tasks} tasks over {worker_count} workers: {:?}",
        &ranges[1..]
    );

    let channels = create_cluster_channels(worker_count);
    let handles = spawn_workers(&ranges[1..], &store, &matcher, channels.txs)?;

    let collected = collect_records(&channels.rxs, on_message);

    // Unblock any worker stuck on a full channel before joining.
    drop(channels.rxs);

    // A worker that dies before its end signal also shows up on the collector
    // side as a closed channel; the worker's own error is the root cause, so
    // report it first. The converse holds too: when the collector aborted,
    // workers fail on their next send, and those failures are side effects of
    // the abort, not its cause.
    join_workers(handles, collected.is_err())?;
    Ok(collected?)
}

/// Join all worker threads, surfacing the first failure with its rank. With
/// `collector_failed` set, send failures are discounted as fallout from the
/// collector hanging up.
fn join_workers(handles: Vec<JoinHandle<Result<()>>>, collector_failed: bool) -> Result<()> {
    let mut first_failure: Option<ClusterError> = None;
    for (w, handle) in handles.into_iter().enumerate() {
        let rank = w + 1;
        let outcome = handle
            .join()
            .map_err(|_| anyhow!("worker thread {rank} panicked"))?;
        let Err(e) = outcome else { continue };
        if collector_failed && is_send_failure(&e) {
            debug!("worker {rank} aborted on send after collector failure");
            continue;
        }
        if first_failure.is_none() {
            first_failure = Some(ClusterError::WorkerFailed {
                rank,
                reason: format!("{e:#}"),
            });
        }
    }
    match first_failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn is_send_failure(e: &anyhow::Error) -> bool {
    e.chain()
        .any(|cause| cause.is::<SendError<ClusterMessage>>())
}
