//! Cluster components: partitioning, wire codec, worker loop, collector.
//!
//! Ranks are threads connected by bounded crossbeam channels, one channel per
//! worker so per-sender FIFO order is structural. Rank 0 is the coordinator;
//! it never executes pair tasks and turns into the collector once workers are
//! running.

pub mod collector;
pub mod coordinator;
pub mod partition;
pub mod wire;
pub mod worker;

pub use collector::collect_records;
pub use coordinator::run_cluster;
pub use partition::{pair_for_task, partition, task_count};
pub use wire::{ClusterMessage, decode, encode};
pub use worker::run_worker;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::features::{FeatureStore, matcher::Matcher};
use crate::types::WorkRange;

/// Per-worker result channel capacity. Bounded so a fast worker blocks on
/// send instead of buffering an unbounded backlog ahead of the collector.
pub const RESULT_CHANNEL_CAP: usize = 1024;

/// One channel per worker, in rank order (index 0 = rank 1).
pub struct ClusterChannels {
    pub txs: Vec<Sender<ClusterMessage>>,
    pub rxs: Vec<Receiver<ClusterMessage>>,
}

pub fn create_cluster_channels(worker_count: usize) -> ClusterChannels {
    let mut txs = Vec::with_capacity(worker_count);
    let mut rxs = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let (tx, rx) = bounded::<ClusterMessage>(RESULT_CHANNEL_CAP);
        txs.push(tx);
        rxs.push(rx);
    }
    ClusterChannels { txs, rxs }
}

/// Spawn one thread per worker range. `ranges` excludes the coordinator's
/// empty slot; `ranges[w]` belongs to rank `w + 1`. Each thread consumes its
/// sender, so the channel closes when the worker exits. Threads are named
/// after their rank so log lines identify the emitting role.
pub fn spawn_workers(
    ranges: &[WorkRange],
    store: &Arc<dyn FeatureStore>,
    matcher: &Arc<dyn Matcher>,
    txs: Vec<Sender<ClusterMessage>>,
) -> Result<Vec<JoinHandle<Result<()>>>> {
    ranges
        .iter()
        .zip(txs)
        .enumerate()
        .map(|(w, (&range, tx))| {
            let rank = w + 1;
            let store = Arc::clone(store);
            let matcher = Arc::clone(matcher);
            std::thread::Builder::new()
                .name(format!("worker-{rank}"))
                .spawn(move || run_worker(rank, range, store.as_ref(), matcher.as_ref(), &tx))
                .with_context(|| format!("spawn worker thread {rank}"))
        })
        .collect()
}
