//! Error types for the cluster protocol.
//!
//! Every variant is fatal: the protocol has no retry or resumption mechanism,
//! because a partially complete run cannot be told apart from one still in
//! progress until the end-signal count reaches its expected value.

use thiserror::Error;

/// Result type alias for cluster protocol operations.
pub type ClusterResult<T> = std::result::Result<T, ClusterError>;

/// Errors that can occur in the partition / wire / collect protocol.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Fewer than 2 ranks: at least one coordinator and one worker required.
    #[error("invalid topology: need at least 2 ranks (1 coordinator + 1 worker), got {ranks}")]
    InvalidTopology { ranks: usize },

    /// A wire buffer disagrees with its declared or NM-derived size.
    #[error("malformed wire record: {reason}")]
    MalformedRecord { reason: String },

    /// The collector saw something the protocol forbids: an undecodable
    /// record, or a worker channel closing before its end signal.
    #[error("protocol violation from worker rank {rank}: {reason}")]
    ProtocolViolation { rank: usize, reason: String },

    /// A worker aborted before finishing its range.
    #[error("worker rank {rank} failed: {reason}")]
    WorkerFailed { rank: usize, reason: String },
}

impl ClusterError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ClusterError::MalformedRecord {
            reason: reason.into(),
        }
    }
}
