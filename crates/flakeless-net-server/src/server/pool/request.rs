use flakeless_net_core::Batch;
use tokio::sync::oneshot;

/// Messages understood by a channel worker.
#[derive(Debug)]
pub enum WorkRequest {
    /// Step the generator `amount` times and answer with the ordered batch.
    Batch {
        amount: u32,
        response: oneshot::Sender<Batch>,
    },
    /// Stop after acknowledging.
    Shutdown { response: oneshot::Sender<()> },
}
