//! Public and internal types for the parmatch API and cluster protocol.

use std::collections::HashMap;

/// Sentinel written to the inlier-ratio field when geometric verification was
/// skipped or infeasible. A real ratio is always in `[0, 1]`.
pub const RATIO_SENTINEL: f32 = -1.0;

/// Identity homography, used when verification is off or failed.
pub const IDENTITY_H: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Unordered image pair in canonical orientation: `first < second` at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PairId {
    pub first: u32,
    pub second: u32,
}

impl PairId {
    pub fn new(first: u32, second: u32) -> Self {
        PairId { first, second }
    }

    /// Orientation-independent lookup key `(min, max)`.
    pub fn key(&self) -> (u32, u32) {
        if self.first <= self.second {
            (self.first, self.second)
        } else {
            (self.second, self.first)
        }
    }
}

/// One feature correspondence. `query` indexes the feature set of
/// `pair.first`, `train` that of `pair.second`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Correspondence {
    pub query: u32,
    pub train: u32,
}

/// Result of matching one image pair. Constructed fresh per task by a worker
/// and owned by the collector once decoded from the wire.
///
/// Geometry fields are always present to keep the wire format fixed-shape:
/// when verification is off or failed, `inliers` is 0, `homography` is the
/// identity and `inlier_ratio` is [`RATIO_SENTINEL`].
#[derive(Clone, Debug, PartialEq)]
pub struct MatchRecord {
    pub pair: PairId,
    pub correspondences: Vec<Correspondence>,
    /// Correspondences consistent with the estimated homography.
    pub inliers: u32,
    /// 3x3 homography, row-major.
    pub homography: [f32; 9],
    /// `inliers / correspondences.len()`, or [`RATIO_SENTINEL`].
    pub inlier_ratio: f32,
}

impl MatchRecord {
    /// Record with no geometry information (verification skipped).
    pub fn without_geometry(pair: PairId, correspondences: Vec<Correspondence>) -> Self {
        MatchRecord {
            pair,
            correspondences,
            inliers: 0,
            homography: IDENTITY_H,
            inlier_ratio: RATIO_SENTINEL,
        }
    }
}

/// Half-open interval `[start, end)` over task indices, assigned to one rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkRange {
    pub start: usize,
    pub end: usize,
}

impl WorkRange {
    pub fn new(start: usize, end: usize) -> Self {
        WorkRange { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, task: usize) -> bool {
        task >= self.start && task < self.end
    }
}

/// Collector-owned buffer of match records, keyed by unordered pair.
/// Each pair is stored in whichever orientation it arrived in, never both.
#[derive(Debug, Default)]
pub struct MatchBuffer {
    records: HashMap<(u32, u32), MatchRecord>,
}

impl MatchBuffer {
    pub fn new() -> Self {
        MatchBuffer::default()
    }

    /// Insert a record under its unordered key. A duplicate pair cannot occur
    /// under a correct partition; if one does, the last record wins.
    pub fn insert(&mut self, record: MatchRecord) {
        let key = record.pair.key();
        if self.records.insert(key, record).is_some() {
            log::warn!("duplicate match record for pair {:?}", key);
        }
    }

    /// Look up the ordered cell `(i, j)`. Returns the stored record and
    /// whether it is stored in the reversed orientation (`stored.first == j`).
    pub fn get(&self, i: u32, j: u32) -> Option<(&MatchRecord, bool)> {
        let key = if i <= j { (i, j) } else { (j, i) };
        self.records
            .get(&key)
            .map(|rec| (rec, rec.pair.first != i))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Lib-only options for [`match_dir`](crate::match_dir).
#[derive(Clone, Debug)]
pub struct MatchOpts {
    /// Worker thread count. When None, derived from available parallelism.
    pub num_workers: Option<usize>,
    /// Run geometric verification (RANSAC homography) on each pair.
    pub with_geometry: bool,
    /// Lowe distance-ratio threshold for the nearest-neighbour test.
    pub ratio: f32,
}

impl Default for MatchOpts {
    fn default() -> Self {
        MatchOpts {
            num_workers: None,
            with_geometry: true,
            ratio: crate::features::matcher::NN_RATIO,
        }
    }
}

/// Full options (CLI). Use [`MatchOpts`] for lib.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Worker thread count. When None, derived from available parallelism.
    pub num_workers: Option<usize>,
    /// Run geometric verification (RANSAC homography) on each pair.
    pub with_geometry: bool,
    /// Lowe distance-ratio threshold.
    pub ratio: f32,
    /// Show progress bars.
    pub verbose: bool,
}

impl From<&MatchOpts> for Opts {
    fn from(o: &MatchOpts) -> Self {
        Opts {
            num_workers: o.num_workers,
            with_geometry: o.with_geometry,
            ratio: o.ratio,
            verbose: false,
        }
    }
}

/// Run summary returned by [`match_dir`](crate::match_dir).
#[derive(Clone, Copy, Debug)]
pub struct MatchSummary {
    /// Number of images found under the root.
    pub items: usize,
    /// Number of pair tasks executed (`N * (N - 1) / 2`).
    pub tasks: usize,
    /// Number of records collected.
    pub records: usize,
}
