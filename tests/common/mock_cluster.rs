//! In-memory feature store and deterministic matcher for simulating a
//! cluster run without touching the filesystem or real descriptors.

use std::sync::Mutex;

use parmatch::features::matcher::Matcher;
use parmatch::features::{FeatureSet, FeatureStore, Keypoint};
use parmatch::types::{Correspondence, IDENTITY_H, MatchRecord, PairId};

/// Store holding one synthetic feature set per item.
pub struct InMemoryStore {
    sets: Vec<FeatureSet>,
}

impl InMemoryStore {
    /// `n` items with a few keypoints each; descriptors are one-hot so every
    /// set is distinct but matching them is not the point here.
    pub fn with_items(n: usize) -> Self {
        let sets = (0..n)
            .map(|item| {
                let keypoints = (0..4)
                    .map(|k| Keypoint {
                        x: k as f32,
                        y: item as f32,
                        scale: 1.0,
                        orientation: 0.0,
                    })
                    .collect();
                FeatureSet {
                    keypoints,
                    descriptors: vec![item as f32; 4 * 2],
                    descriptor_dim: 2,
                }
            })
            .collect();
        InMemoryStore { sets }
    }
}

impl FeatureStore for InMemoryStore {
    fn items(&self) -> usize {
        self.sets.len()
    }

    fn load(&self, item: usize) -> anyhow::Result<FeatureSet> {
        self.sets
            .get(item)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("item {item} out of range"))
    }
}

/// Store wrapper that records every `load` call, for asserting the worker's
/// lazy-fetch behavior.
pub struct LoadCountingStore {
    inner: InMemoryStore,
    pub loads: Mutex<Vec<usize>>,
}

impl LoadCountingStore {
    pub fn with_items(n: usize) -> Self {
        LoadCountingStore {
            inner: InMemoryStore::with_items(n),
            loads: Mutex::new(Vec::new()),
        }
    }

    pub fn loads_of(&self, item: usize) -> usize {
        self.loads.lock().unwrap().iter().filter(|&&i| i == item).count()
    }
}

impl FeatureStore for LoadCountingStore {
    fn items(&self) -> usize {
        self.inner.items()
    }

    fn load(&self, item: usize) -> anyhow::Result<FeatureSet> {
        self.loads.lock().unwrap().push(item);
        self.inner.load(item)
    }
}

/// Matcher producing one deterministic correspondence per pair, so tests can
/// trace every record back to the task that produced it.
pub struct MockMatcher;

impl Matcher for MockMatcher {
    fn match_pair(&self, pair: PairId, _query: &FeatureSet, _train: &FeatureSet) -> MatchRecord {
        MatchRecord {
            pair,
            correspondences: vec![Correspondence {
                query: pair.first * 10,
                train: pair.second * 10,
            }],
            inliers: 1,
            homography: IDENTITY_H,
            inlier_ratio: 1.0,
        }
    }
}
