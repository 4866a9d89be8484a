//! Per-image feature data and the seams the cluster core depends on.
//!
//! The core never computes features or matches itself; it consumes a
//! [`FeatureStore`] (read-only, safely shared across workers) and a
//! [`Matcher`](matcher::Matcher). Both are traits so tests and embedders can
//! swap in their own implementations.

pub mod geometry;
pub mod keyfile;
pub mod matcher;

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One detected keypoint, as stored in Lowe's key format.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub orientation: f32,
}

/// Keypoints plus their descriptors for one image. Descriptors are stored as
/// a flat row-major block of `keypoints.len() * descriptor_dim` values.
#[derive(Clone, Debug, Default)]
pub struct FeatureSet {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<f32>,
    pub descriptor_dim: usize,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Descriptor row for keypoint `idx`.
    pub fn descriptor(&self, idx: usize) -> &[f32] {
        let at = idx * self.descriptor_dim;
        &self.descriptors[at..at + self.descriptor_dim]
    }
}

/// Read-only source of per-item feature sets. Deterministic: the same item
/// index always yields the same features for the duration of a run.
pub trait FeatureStore: Send + Sync {
    /// Number of items in the store. Item indices run `0..items()`.
    fn items(&self) -> usize;

    /// Load the feature set for one item.
    fn load(&self, item: usize) -> Result<FeatureSet>;
}

/// Store backed by `.key` files under a directory, one per image, ordered by
/// file name. The ordering defines the item indexing for the whole run.
pub struct KeyFileStore {
    files: Vec<PathBuf>,
}

impl KeyFileStore {
    /// Enumerate `*.key` files directly under `root`, sorted by name.
    pub fn open(root: &Path) -> Result<Self> {
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "key"))
            .collect();
        files.sort();

        if files.is_empty() {
            bail!("no .key files found under {}", root.display());
        }
        log::debug!("key store: {} files under {}", files.len(), root.display());

        Ok(KeyFileStore { files })
    }

    pub fn file(&self, item: usize) -> &Path {
        &self.files[item]
    }
}

impl FeatureStore for KeyFileStore {
    fn items(&self) -> usize {
        self.files.len()
    }

    fn load(&self, item: usize) -> Result<FeatureSet> {
        let path = self.files.get(item).with_context(|| {
            format!("item index {item} out of range ({} files)", self.files.len())
        })?;
        keyfile::parse_key_file(path)
            .with_context(|| format!("reading key file {}", path.display()))
    }
}
