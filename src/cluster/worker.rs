//! Worker executor: runs one assigned task range to completion.

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use log::debug;

use crate::cluster::wire::{self, ClusterMessage};
use crate::features::{FeatureSet, FeatureStore, matcher::Matcher};
use crate::types::{PairId, WorkRange};

/// Execute every task in `range`, streaming one encoded record per task to
/// the collector, then send exactly one [`ClusterMessage::Done`].
///
/// A single `seek` counter walks the full canonical enumeration (outer
/// `i = 1..`, inner `j = 0..i`), because knowing when `i` increments requires
/// visiting every pair in order. Features for the outer image are loaded once
/// per distinct `i`, and only after `seek` has entered the assigned range, so
/// a worker never touches items ahead of its slice. The inner image is loaded
/// per task.
pub fn run_worker(
    rank: usize,
    range: WorkRange,
    store: &dyn FeatureStore,
    matcher: &dyn Matcher,
    tx: &Sender<ClusterMessage>,
) -> Result<()> {
    debug!(
        "worker {rank}: tasks [{}, {}) of {} items",
        range.start,
        range.end,
        store.items()
    );

    if !range.is_empty() {
        run_range(range, store, matcher, tx)
            .with_context(|| format!("worker rank {rank}"))?;
    }

    tx.send(ClusterMessage::Done)
        .context("send end signal to collector")?;
    debug!("worker {rank}: done");
    Ok(())
}

fn run_range(
    range: WorkRange,
    store: &dyn FeatureStore,
    matcher: &dyn Matcher,
    tx: &Sender<ClusterMessage>,
) -> Result<()> {
    let mut seek = 0usize;
    // Cached features of the current outer image; Some(_) iff seek is inside
    // the assigned range.
    let mut outer: Option<FeatureSet> = None;

    'enumeration: for i in 1.. {
        if outer.is_some() {
            // New outer image while active: refresh the cache.
            outer = Some(store.load(i)?);
        }

        for j in 0..i {
            if seek == range.start {
                outer = Some(store.load(i)?);
            }

            if let Some(train) = outer.as_ref() {
                let query = store.load(j)?;
                let record =
                    matcher.match_pair(PairId::new(j as u32, i as u32), &query, train);
                tx.send(ClusterMessage::Record(wire::encode(&record)))
                    .context("send record to collector")?;
            }

            seek += 1;
            if seek == range.end {
                break 'enumeration;
            }
        }
    }

    Ok(())
}
