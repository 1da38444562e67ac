use crate::server::pool::WorkRequest;
use flakeless::{Flakeless, TimeSource};
use flakeless_net_core::Batch;
use tokio::sync::mpsc;

/// Steps taken between cooperative yields, one full millisecond of sequence.
const YIELD_EVERY: u32 = 4_096;

/// Worker task owning the generator bound to `channel`.
///
/// Requests are handled strictly one at a time, which is what keeps the
/// generator single-owner. The loop ends on [`WorkRequest::Shutdown`] or when
/// every sender is gone, which is how a replaced binding retires: the queued
/// requests are still answered first.
pub async fn worker_loop<T: TimeSource>(
    channel: String,
    mut rx: mpsc::Receiver<WorkRequest>,
    mut generator: Flakeless<T>,
) {
    tracing::trace!(%channel, worker_id = generator.worker_id(), "worker started");

    while let Some(work) = rx.recv().await {
        match work {
            WorkRequest::Batch { amount, response } => {
                let batch = generate_batch(&mut generator, amount).await;
                let exhausted = batch.iter().filter(|id| id.is_none()).count();
                if exhausted > 0 {
                    tracing::warn!(%channel, amount, exhausted, "sequence exhausted within batch");
                } else {
                    tracing::trace!(%channel, amount, "batch generated");
                }
                if response.send(batch).is_err() {
                    tracing::debug!(%channel, "requester went away before the batch was ready");
                }
            }
            WorkRequest::Shutdown { response } => {
                tracing::debug!(%channel, "worker received shutdown signal");
                if response.send(()).is_err() {
                    tracing::error!(%channel, "worker failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    tracing::trace!(%channel, state = %generator.serialize(), "worker stopped");
}

/// Calls `next()` exactly `amount` times, in order. Exhausted steps stay in
/// place as `None`.
///
/// Yields to the scheduler every [`YIELD_EVERY`] steps so a large batch does
/// not hold the runtime thread.
pub async fn generate_batch<T: TimeSource>(generator: &mut Flakeless<T>, amount: u32) -> Batch {
    let mut batch = Vec::with_capacity(amount as usize);
    let mut remaining = amount;
    while remaining > 0 {
        let chunk = remaining.min(YIELD_EVERY);
        batch.extend((0..chunk).map(|_| generator.next().ready()));
        remaining -= chunk;
        if remaining > 0 {
            tokio::task::yield_now().await;
        }
    }
    batch
}
