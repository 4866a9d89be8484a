//! Wire format for match records.
//!
//! A record travels as a flat `f32` buffer:
//!
//! ```text
//! [len, first, second, NM, (query, train) x NM, NI, H[0..9], ratio]
//! ```
//!
//! `len` is the total element count (`15 + 2 * NM`) so a receiver can size or
//! validate its allocation before decoding. Integer fields stored as f32
//! round-trip exactly up to 2^24, which covers the supported item and feature
//! counts. The geometry tail (NI, H, ratio) is always present so the format
//! stays fixed-shape per mode.
//!
//! The end-of-stream signal is not a wire buffer; it is carried as a
//! distinct message variant ([`ClusterMessage::Done`]).

use crate::error::{ClusterError, ClusterResult};
use crate::types::{Correspondence, MatchRecord, PairId};

/// Header elements before the correspondence list: len, first, second, NM.
const HEADER_LEN: usize = 4;
/// Trailing geometry elements: NI, 9 homography values, ratio.
const GEO_TAIL_LEN: usize = 11;

/// Total buffer length for a record with `nm` correspondences.
pub fn wire_len(nm: usize) -> usize {
    HEADER_LEN + 2 * nm + GEO_TAIL_LEN
}

/// Message passed from a worker to the collector. `Done` marks a worker's
/// stream exhausted; each worker sends it exactly once, after its last record.
#[derive(Clone, Debug, PartialEq)]
pub enum ClusterMessage {
    Record(Vec<f32>),
    Done,
}

/// Serialize a record into its wire buffer. Pure and infallible for any
/// well-formed [`MatchRecord`].
pub fn encode(record: &MatchRecord) -> Vec<f32> {
    let nm = record.correspondences.len();
    let mut buf = Vec::with_capacity(wire_len(nm));

    buf.push(wire_len(nm) as f32);
    buf.push(record.pair.first as f32);
    buf.push(record.pair.second as f32);
    buf.push(nm as f32);

    for c in &record.correspondences {
        buf.push(c.query as f32);
        buf.push(c.train as f32);
    }

    buf.push(record.inliers as f32);
    buf.extend_from_slice(&record.homography);
    buf.push(record.inlier_ratio);

    buf
}

/// Decode a wire buffer back into a [`MatchRecord`]. Exact inverse of
/// [`encode`]. Fails with [`ClusterError::MalformedRecord`] when the buffer
/// length disagrees with the declared `len` field or the NM-derived size.
pub fn decode(buf: &[f32]) -> ClusterResult<MatchRecord> {
    if buf.len() < wire_len(0) {
        return Err(ClusterError::malformed(format!(
            "buffer too short: {} elements, minimum {}",
            buf.len(),
            wire_len(0)
        )));
    }

    let declared = buf[0] as usize;
    if declared != buf.len() {
        return Err(ClusterError::malformed(format!(
            "declared length {} but buffer holds {} elements",
            declared,
            buf.len()
        )));
    }

    let nm = buf[3] as usize;
    // Cap NM by what the buffer could possibly hold before deriving the
    // expected size from it, so a garbage NM cannot overflow the arithmetic.
    let capacity = (buf.len() - wire_len(0)) / 2;
    if nm > capacity {
        return Err(ClusterError::malformed(format!(
            "correspondence count {nm} exceeds buffer capacity {capacity}"
        )));
    }
    if wire_len(nm) != buf.len() {
        return Err(ClusterError::malformed(format!(
            "{} correspondences imply length {} but buffer holds {} elements",
            nm,
            wire_len(nm),
            buf.len()
        )));
    }

    let pair = PairId::new(buf[1] as u32, buf[2] as u32);

    let mut correspondences = Vec::with_capacity(nm);
    for c in 0..nm {
        let at = HEADER_LEN + 2 * c;
        correspondences.push(Correspondence {
            query: buf[at] as u32,
            train: buf[at + 1] as u32,
        });
    }

    let seek = HEADER_LEN + 2 * nm;
    let inliers = buf[seek] as u32;
    let mut homography = [0.0f32; 9];
    homography.copy_from_slice(&buf[seek + 1..seek + 10]);
    let inlier_ratio = buf[seek + 10];

    Ok(MatchRecord {
        pair,
        correspondences,
        inliers,
        homography,
        inlier_ratio,
    })
}
