use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::hub::{PushEnvelope, PushHub};
use crate::stats::snapshot::StatisticSnapshot;

/// Forwards every produced snapshot to all push clients, in production order.
/// Ends when the producer closes its output or on cancellation.
pub async fn run_statistics_relay(
    mut snapshots: mpsc::Receiver<StatisticSnapshot>,
    hub: Arc<PushHub>,
    cancel: CancellationToken,
) {
    loop {
        let snapshot = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = snapshots.recv() => match next {
                Some(snapshot) => snapshot,
                None => {
                    info!("statistics feed ended");
                    break;
                }
            },
        };

        let delivered = hub.broadcast_all(&PushEnvelope::statistic(snapshot));
        debug!(time = snapshot.time, delivered, "statistic broadcast");
    }
}
