//! Match list writer: reconstructs the dense N x N view and emits the two
//! output files.
//!
//! The buffer stores each unordered pair once, in whichever orientation its
//! worker produced it. The writer visits every grid cell in row-major order
//! and resolves orientation per cell, so output order is canonical no matter
//! in which order records arrived.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::types::{MatchBuffer, MatchRecord};

/// Primary output: pair indices and raw correspondence lists.
pub const MATCH_LIST_FILE: &str = "matches.init.txt";
/// Secondary output: per-pair geometry (inlier count, ratio, homography).
pub const GEOMETRY_LIST_FILE: &str = "matches.geo.txt";

/// Fixed re-indexing of the stored homography for a reversed cell: the matrix
/// transpose. This mirrors what the output format has always contained for
/// reversed pairs; it is a structural re-indexing, deliberately not a true
/// geometric inverse, and consumers may depend on it.
const REVERSED_H_ORDER: [usize; 9] = [0, 3, 6, 1, 4, 7, 2, 5, 8];

/// Write `matches.init.txt` (and `matches.geo.txt` when `with_geometry`) for
/// `n_items` images into `dir`. `on_cell` is called once per visited grid
/// cell, for progress reporting.
pub fn write_matches(
    dir: &Path,
    buffer: &MatchBuffer,
    n_items: usize,
    with_geometry: bool,
    on_cell: Option<&dyn Fn(usize)>,
) -> Result<()> {
    let primary_path = dir.join(MATCH_LIST_FILE);
    let mut primary = BufWriter::new(
        File::create(&primary_path)
            .with_context(|| format!("create {}", primary_path.display()))?,
    );

    let mut secondary = if with_geometry {
        let path = dir.join(GEOMETRY_LIST_FILE);
        Some(BufWriter::new(
            File::create(&path).with_context(|| format!("create {}", path.display()))?,
        ))
    } else {
        None
    };

    for i in 0..n_items as u32 {
        for j in 0..n_items as u32 {
            // The diagonal and never-assigned pairs miss; emit nothing.
            if let Some((record, reversed)) = buffer.get(i, j) {
                if reversed {
                    write_reversed(&mut primary, secondary.as_mut(), record, i, j)?;
                } else {
                    write_canonical(&mut primary, secondary.as_mut(), record, i, j)?;
                }
            }
            if let Some(f) = on_cell {
                f(1);
            }
        }
    }

    primary.flush()?;
    if let Some(mut sec) = secondary {
        sec.flush()?;
    }
    Ok(())
}

/// Cell matches the stored orientation: emit fields as recorded.
fn write_canonical(
    primary: &mut impl Write,
    secondary: Option<&mut impl Write>,
    record: &MatchRecord,
    i: u32,
    j: u32,
) -> Result<()> {
    writeln!(primary, "{i} {j}")?;
    writeln!(primary, "{}", record.correspondences.len())?;
    for c in &record.correspondences {
        writeln!(primary, "{} {}", c.query, c.train)?;
    }

    if let Some(sec) = secondary
        && record.inliers > 0
    {
        writeln!(sec, "{i} {j}")?;
        writeln!(sec, "{}", record.inliers)?;
        writeln!(sec, "{:.6}", record.inlier_ratio)?;
        write_h_line(sec, &record.homography, &[0, 1, 2, 3, 4, 5, 6, 7, 8])?;
    }
    Ok(())
}

/// Cell is the mirror of the stored orientation: swap the pair and every
/// correspondence; geometry keeps the stored H values transposed, with the
/// inlier statistics zeroed since they were computed for the canonical
/// direction only.
fn write_reversed(
    primary: &mut impl Write,
    secondary: Option<&mut impl Write>,
    record: &MatchRecord,
    i: u32,
    j: u32,
) -> Result<()> {
    writeln!(primary, "{i} {j}")?;
    writeln!(primary, "{}", record.correspondences.len())?;
    for c in &record.correspondences {
        writeln!(primary, "{} {}", c.train, c.query)?;
    }

    if let Some(sec) = secondary
        && record.inliers > 0
    {
        writeln!(sec, "{i} {j}")?;
        writeln!(sec, "0")?;
        writeln!(sec, "{:.6}", 0.0f32)?;
        write_h_line(sec, &record.homography, &REVERSED_H_ORDER)?;
    }
    Ok(())
}

fn write_h_line(out: &mut impl Write, h: &[f32; 9], order: &[usize; 9]) -> Result<()> {
    let line = order
        .iter()
        .map(|&k| format!("{:.6}", h[k]))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "{line}")?;
    Ok(())
}
