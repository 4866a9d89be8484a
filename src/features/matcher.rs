//! Pairwise descriptor matching.
//!
//! Nearest-neighbour search with Lowe's distance-ratio test, plus optional
//! RANSAC homography verification. The cluster core only sees the
//! [`Matcher`] trait; this implementation is a swappable collaborator.

use crate::types::{Correspondence, MatchRecord, PairId, RATIO_SENTINEL};

use super::FeatureSet;
use super::geometry;

/// Lowe's distance-ratio threshold (best / second-best).
pub const NN_RATIO: f32 = 0.6;

/// Produces the match record for one pair of feature sets.
///
/// `query` is the feature set of `pair.first`, `train` that of `pair.second`;
/// correspondence indices follow the same convention. Must populate
/// correspondences always, and geometry fields only meaningfully when
/// verification is enabled (otherwise 0 inliers, identity H, sentinel ratio).
pub trait Matcher: Send + Sync {
    fn match_pair(&self, pair: PairId, query: &FeatureSet, train: &FeatureSet) -> MatchRecord;
}

/// Brute-force nearest-neighbour matcher with ratio test and optional
/// geometric verification.
pub struct RatioMatcher {
    /// Distance-ratio threshold; a candidate is kept when
    /// `best < ratio * second_best` (on L2 distance).
    pub ratio: f32,
    /// Estimate a homography per pair and count inliers.
    pub verify_geometry: bool,
}

impl RatioMatcher {
    pub fn new(ratio: f32, verify_geometry: bool) -> Self {
        RatioMatcher {
            ratio,
            verify_geometry,
        }
    }
}

impl Default for RatioMatcher {
    fn default() -> Self {
        RatioMatcher::new(NN_RATIO, true)
    }
}

/// Squared L2 distance between two descriptor rows.
fn distance_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Nearest-neighbour correspondences from `query` into `train`, filtered by
/// the ratio test on squared distances (`d1 < r^2 * d2`).
fn ratio_test_matches(query: &FeatureSet, train: &FeatureSet, ratio: f32) -> Vec<Correspondence> {
    let mut out = Vec::new();
    if query.is_empty() || train.len() < 2 || query.descriptor_dim != train.descriptor_dim {
        return out;
    }
    let ratio_sq = ratio * ratio;

    for qi in 0..query.len() {
        let q = query.descriptor(qi);
        let mut best = f32::INFINITY;
        let mut second = f32::INFINITY;
        let mut best_ti = 0usize;

        for ti in 0..train.len() {
            let d = distance_sq(q, train.descriptor(ti));
            if d < best {
                second = best;
                best = d;
                best_ti = ti;
            } else if d < second {
                second = d;
            }
        }

        if best < ratio_sq * second {
            out.push(Correspondence {
                query: qi as u32,
                train: best_ti as u32,
            });
        }
    }
    out
}

impl Matcher for RatioMatcher {
    fn match_pair(&self, pair: PairId, query: &FeatureSet, train: &FeatureSet) -> MatchRecord {
        let correspondences = ratio_test_matches(query, train, self.ratio);

        if !self.verify_geometry {
            return MatchRecord::without_geometry(pair, correspondences);
        }

        match geometry::verify_homography(query, train, &correspondences) {
            Some(fit) => {
                let nm = correspondences.len();
                let inlier_ratio = if nm > 0 {
                    fit.inliers as f32 / nm as f32
                } else {
                    RATIO_SENTINEL
                };
                MatchRecord {
                    pair,
                    correspondences,
                    inliers: fit.inliers,
                    homography: fit.homography,
                    inlier_ratio,
                }
            }
            // Too few correspondences or degenerate geometry: stable
            // skipped-verification values.
            None => MatchRecord::without_geometry(pair, correspondences),
        }
    }
}
