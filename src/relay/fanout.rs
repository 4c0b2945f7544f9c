//! Concurrent fan-out over relay connections.

use log::warn;
use tokio::task::JoinSet;

use crate::relay::connection::RelayConnection;
use crate::relay::types::{FailureReason, RelayOutcome, RelayUrl};

/// Runs every connection as its own task and collects one outcome per
/// connection, in input order.
///
/// Tasks never wait on each other. A task that panics or is cancelled is
/// reported as [`FailureReason::TaskFailed`] for its relay.
pub async fn run_all(connections: Vec<(RelayUrl, RelayConnection)>) -> Vec<RelayOutcome> {
    let mut relays = Vec::with_capacity(connections.len());
    let mut tasks = JoinSet::new();

    for (index, (relay, connection)) in connections.into_iter().enumerate() {
        relays.push(relay);
        tasks.spawn(async move { (index, connection.run().await) });
    }

    let mut slots: Vec<Option<RelayOutcome>> = vec![None; relays.len()];

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(outcome);
                }
            }
            Err(e) => warn!("relay task failed: {e}"),
        }
    }

    relays
        .into_iter()
        .zip(slots)
        .map(|(relay, slot)| {
            slot.unwrap_or_else(|| RelayOutcome::failed(relay, FailureReason::TaskFailed))
        })
        .collect()
}
