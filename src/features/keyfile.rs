//! Parser for Lowe's ASCII key format.
//!
//! Layout: a header line `count dim`, then per keypoint one line
//! `y x scale orientation` followed by `dim` integer descriptor values
//! (wrapped over several lines; wrapping is not significant). This is the
//! format emitted by the SIFT extraction stage.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

use super::{FeatureSet, Keypoint};

/// Parse one key file into a [`FeatureSet`].
pub fn parse_key_file(path: &Path) -> Result<FeatureSet> {
    let text = fs::read_to_string(path)?;
    parse_key_text(&text)
}

/// Parse the key format from a string. Token-based: line wrapping inside a
/// descriptor block is ignored.
pub fn parse_key_text(text: &str) -> Result<FeatureSet> {
    let mut tokens = text.split_ascii_whitespace();

    let mut next_f32 = |what: &str| -> Result<f32> {
        let tok = tokens
            .next()
            .with_context(|| format!("unexpected end of file reading {what}"))?;
        tok.parse::<f32>()
            .with_context(|| format!("bad {what} value {tok:?}"))
    };

    let count = next_f32("keypoint count")? as usize;
    let dim = next_f32("descriptor dimension")? as usize;
    if dim == 0 && count > 0 {
        bail!("descriptor dimension is 0 for {count} keypoints");
    }

    let mut keypoints = Vec::with_capacity(count);
    let mut descriptors = Vec::with_capacity(count * dim);

    for _ in 0..count {
        // Header stores y before x.
        let y = next_f32("keypoint y")?;
        let x = next_f32("keypoint x")?;
        let scale = next_f32("keypoint scale")?;
        let orientation = next_f32("keypoint orientation")?;
        keypoints.push(Keypoint {
            x,
            y,
            scale,
            orientation,
        });
        for _ in 0..dim {
            descriptors.push(next_f32("descriptor component")?);
        }
    }

    Ok(FeatureSet {
        keypoints,
        descriptors,
        descriptor_dim: dim,
    })
}
