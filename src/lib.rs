//! Parmatch: distributed pairwise image matcher.
//!
//! Partitions the O(N^2) pair workload over worker threads, streams
//! wire-encoded match records to a collector over bounded channels, and
//! writes Bundler-compatible match files.

pub mod cluster;
pub mod engine;
pub mod error;
pub mod features;
pub mod types;
pub mod utils;
pub mod writer;

/// Re-export types for API
pub use error::{ClusterError, ClusterResult};
pub use types::*;

use kdam::Animation;
use log::debug;
use std::path::Path;
use std::sync::Arc;

use crate::cluster::{coordinator::resolve_worker_count, run_cluster, task_count};
use crate::engine::progress::{
    ProgressBarConfig, create_progress_bar, finish_bar, progress_callback,
};
use crate::features::matcher::{Matcher, RatioMatcher};
use crate::features::{FeatureStore, KeyFileStore};
use crate::writer::write_matches;

/// Result alias used by public parmatch API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: match every image pair under `root` with `opts` and
/// write `matches.init.txt` (plus `matches.geo.txt` when geometry is on)
/// into the same directory.
///
/// `root` must hold one `.key` feature file per image; file-name order
/// defines the image indexing in the output.
pub fn match_dir(root: &Path, opts: &MatchOpts) -> Result<MatchSummary> {
    let opts = Opts::from(opts);
    match_dir_with_opts(root, &opts)
}

/// Full-options variant of [`match_dir`], used by the CLI.
pub fn match_dir_with_opts(root: &Path, opts: &Opts) -> Result<MatchSummary> {
    debug!("{} CONFIG:{:#?}", env!("CARGO_PKG_NAME").to_uppercase(), opts);

    let store: Arc<dyn FeatureStore> = Arc::new(KeyFileStore::open(root)?);
    let n_items = store.items();
    let total_tasks = task_count(n_items);
    let worker_count = resolve_worker_count(opts.num_workers);
    let matcher: Arc<dyn Matcher> = Arc::new(RatioMatcher::new(opts.ratio, opts.with_geometry));

    // One message per record plus one end signal per worker.
    let match_bar = opts.verbose.then(|| {
        create_progress_bar(ProgressBarConfig::new(
            total_tasks + worker_count,
            "Matching",
            Animation::Classic,
        ))
    });
    let on_message = progress_callback(&match_bar);
    let buffer = run_cluster(
        store,
        matcher,
        worker_count,
        callback_ref(&on_message),
    )?;
    if let Some(bar) = &match_bar {
        finish_bar(bar);
    }

    let write_bar = opts.verbose.then(|| {
        create_progress_bar(ProgressBarConfig::new(
            n_items * n_items,
            "Writing",
            Animation::Classic,
        ))
    });
    let on_cell = progress_callback(&write_bar);
    write_matches(
        root,
        &buffer,
        n_items,
        opts.with_geometry,
        callback_ref(&on_cell),
    )?;
    if let Some(bar) = &write_bar {
        finish_bar(bar);
    }

    Ok(MatchSummary {
        items: n_items,
        tasks: total_tasks,
        records: buffer.len(),
    })
}

fn callback_ref(cb: &Option<Box<dyn Fn(usize) + Send>>) -> Option<&dyn Fn(usize)> {
    cb.as_ref().map(|f| f.as_ref() as &dyn Fn(usize))
}
