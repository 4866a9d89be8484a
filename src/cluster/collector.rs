//! Collector: drains worker streams into a [`MatchBuffer`].

use crossbeam_channel::{Receiver, Select};
use log::debug;

use crate::cluster::wire::{self, ClusterMessage};
use crate::error::{ClusterError, ClusterResult};
use crate::types::MatchBuffer;

/// Receive records from all workers until every one has sent its end signal.
///
/// A [`Select`] over the worker receivers is the probe: each iteration blocks
/// until *any* worker has a message ready, so a slow worker never holds up the
/// others' streams. Per-worker order is FIFO by channel construction; nothing
/// here depends on cross-worker interleaving.
///
/// `on_message` is called once per received message (records and end signals
/// both), for progress reporting.
///
/// There is no receive timeout: a hung worker blocks this loop forever. That
/// is the documented failure mode of the base protocol; a timeout would be an
/// extension here.
pub fn collect_records(
    receivers: &[Receiver<ClusterMessage>],
    on_message: Option<&dyn Fn(usize)>,
) -> ClusterResult<MatchBuffer> {
    let mut sel = Select::new();
    for rx in receivers {
        sel.recv(rx);
    }

    let expected = receivers.len();
    let mut finished = 0usize;
    let mut buffer = MatchBuffer::new();

    while finished < expected {
        let oper = sel.select();
        let idx = oper.index();
        // Rank 0 is the collector itself; receiver idx belongs to rank idx+1.
        let rank = idx + 1;

        match oper.recv(&receivers[idx]) {
            Ok(ClusterMessage::Record(buf)) => {
                let record = wire::decode(&buf).map_err(|e| ClusterError::ProtocolViolation {
                    rank,
                    reason: e.to_string(),
                })?;
                buffer.insert(record);
            }
            Ok(ClusterMessage::Done) => {
                finished += 1;
                debug!("collector: worker {rank} finished ({finished}/{expected})");
                // A finished worker drops its sender; take the now-closed
                // channel out of the probe set.
                sel.remove(idx);
            }
            Err(_) => {
                return Err(ClusterError::ProtocolViolation {
                    rank,
                    reason: "channel closed before end signal".to_string(),
                });
            }
        }

        if let Some(f) = on_message {
            f(1);
        }
    }

    debug!("collector: {} records buffered", buffer.len());
    Ok(buffer)
}
