//! RANSAC homography verification for a matched pair.
//!
//! Estimates a 3x3 homography mapping query keypoints onto train keypoints
//! from 4-point samples (DLT, fixing `h22 = 1`) and counts correspondences
//! within a reprojection threshold. Sampling uses a fixed-seed xorshift so a
//! pair always verifies to the same result regardless of which worker ran it.

use nalgebra::{SMatrix, SVector};

use crate::types::Correspondence;

use super::FeatureSet;

const RANSAC_ITERATIONS: usize = 256;
/// Reprojection distance (pixels) below which a correspondence is an inlier.
const INLIER_THRESHOLD: f32 = 4.0;

/// Result of a successful verification pass.
#[derive(Clone, Copy, Debug)]
pub struct HomographyFit {
    pub inliers: u32,
    /// Row-major 3x3 homography, `h22` normalized to 1.
    pub homography: [f32; 9],
}

/// Verify a correspondence set geometrically. Returns `None` when there are
/// fewer than 4 correspondences or every sampled system was degenerate.
pub fn verify_homography(
    query: &FeatureSet,
    train: &FeatureSet,
    correspondences: &[Correspondence],
) -> Option<HomographyFit> {
    if correspondences.len() < 4 {
        return None;
    }

    let pairs: Vec<([f64; 2], [f64; 2])> = correspondences
        .iter()
        .map(|c| {
            let q = query.keypoints[c.query as usize];
            let t = train.keypoints[c.train as usize];
            ([q.x as f64, q.y as f64], [t.x as f64, t.y as f64])
        })
        .collect();

    let mut rng = XorShift::new(0x9e37_79b9 ^ pairs.len() as u64);
    let mut best: Option<(u32, [f64; 9])> = None;

    for _ in 0..RANSAC_ITERATIONS {
        let sample = sample_indices(&mut rng, pairs.len());
        let Some(h) = solve_homography([
            pairs[sample[0]],
            pairs[sample[1]],
            pairs[sample[2]],
            pairs[sample[3]],
        ]) else {
            continue;
        };

        let inliers = count_inliers(&pairs, &h);
        if best.is_none_or(|(n, _)| inliers > n) {
            best = Some((inliers, h));
        }
    }

    best.map(|(inliers, h)| HomographyFit {
        inliers,
        homography: h.map(|v| v as f32),
    })
}

/// Solve the 8x8 DLT system for 4 point pairs. `None` for degenerate
/// configurations (collinear samples).
fn solve_homography(pairs: [([f64; 2], [f64; 2]); 4]) -> Option<[f64; 9]> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for (k, ([x, y], [u, v])) in pairs.into_iter().enumerate() {
        let r = 2 * k;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let h = a.lu().solve(&b)?;
    Some([h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0])
}

fn count_inliers(pairs: &[([f64; 2], [f64; 2])], h: &[f64; 9]) -> u32 {
    let thresh_sq = (INLIER_THRESHOLD as f64) * (INLIER_THRESHOLD as f64);
    let mut count = 0;
    for ([x, y], [u, v]) in pairs {
        let w = h[6] * x + h[7] * y + h[8];
        if w.abs() < 1e-12 {
            continue;
        }
        let px = (h[0] * x + h[1] * y + h[2]) / w;
        let py = (h[3] * x + h[4] * y + h[5]) / w;
        let dx = px - u;
        let dy = py - v;
        if dx * dx + dy * dy < thresh_sq {
            count += 1;
        }
    }
    count
}

/// 4 distinct indices in `0..n` (requires `n >= 4`).
fn sample_indices(rng: &mut XorShift, n: usize) -> [usize; 4] {
    let mut out = [0usize; 4];
    let mut filled = 0;
    while filled < 4 {
        let candidate = rng.next() as usize % n;
        if !out[..filled].contains(&candidate) {
            out[filled] = candidate;
            filled += 1;
        }
    }
    out
}

struct XorShift(u64);

impl XorShift {
    fn new(seed: u64) -> Self {
        XorShift(seed.max(1))
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Keypoint;

    fn scene(offset: f32) -> (FeatureSet, FeatureSet, Vec<Correspondence>) {
        // Pure translation: every correspondence is an exact inlier.
        let pts: Vec<(f32, f32)> = (0..12)
            .map(|k| ((k % 4) as f32 * 10.0, (k / 4) as f32 * 10.0))
            .collect();
        let make = |dx: f32| FeatureSet {
            keypoints: pts
                .iter()
                .map(|&(x, y)| Keypoint {
                    x: x + dx,
                    y,
                    scale: 1.0,
                    orientation: 0.0,
                })
                .collect(),
            descriptors: vec![0.0; 12],
            descriptor_dim: 1,
        };
        let corr = (0..12)
            .map(|k| Correspondence {
                query: k,
                train: k,
            })
            .collect();
        (make(0.0), make(offset), corr)
    }

    #[test]
    fn translation_scene_is_all_inliers() {
        let (query, train, corr) = scene(5.0);
        let fit = verify_homography(&query, &train, &corr).unwrap();
        assert_eq!(fit.inliers, 12);
    }

    #[test]
    fn too_few_correspondences_skip_verification() {
        let (query, train, corr) = scene(5.0);
        assert!(verify_homography(&query, &train, &corr[..3]).is_none());
    }
}
