//! Registry of channel workers.
//!
//! [`ChannelPool`] maps each namespace to the queue of the worker task that
//! owns its generator. Dispatch looks the namespace up per request, so a
//! rebinding takes effect for the very next request on every connection.

use crate::server::pool::{WorkRequest, worker_loop};
use core::time::Duration;
use flakeless::{Flakeless, TimeSource};
use flakeless_net_core::{Batch, Error, Result, normalize_namespace};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

/// Requests a worker may have queued before dispatchers wait.
const WORK_QUEUE_DEPTH: usize = 64;

/// Named generator bindings, each served by its own worker task.
pub struct ChannelPool {
    channels: RwLock<HashMap<String, mpsc::Sender<WorkRequest>>>,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl ChannelPool {
    pub fn new(shutdown_token: CancellationToken, shutdown_timeout: Duration) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            shutdown_token,
            shutdown_timeout,
        }
    }

    /// Binds `generator` to `name`, spawning its worker.
    ///
    /// A previous binding under the same name is replaced. Its worker
    /// finishes whatever is already queued and then stops.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceShutdown`] once [`Self::shutdown`] has begun.
    pub fn bind<T>(&self, name: &str, generator: Flakeless<T>) -> Result<()>
    where
        T: TimeSource + Send + 'static,
    {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let name = normalize_namespace(name);
        let worker_id = generator.worker_id();
        let format = generator.output_format();
        let (tx, rx) = mpsc::channel(WORK_QUEUE_DEPTH);
        tokio::spawn(worker_loop(name.clone(), rx, generator));

        let previous = self.channels.write().insert(name.clone(), tx);
        if previous.is_some() {
            tracing::info!(channel = %name, worker_id, %format, "channel rebound");
        } else {
            tracing::info!(channel = %name, worker_id, %format, "channel bound");
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.read().contains_key(name)
    }

    /// Bound namespaces, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.channels.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Has the worker bound to `name` generate `amount` IDs.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceShutdown`] during shutdown.
    /// - [`Error::InvalidNamespace`] if nothing is bound to `name`.
    /// - [`Error::ChannelError`] if the worker stopped mid-request.
    pub async fn dispatch(&self, name: &str, amount: u32) -> Result<Batch> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let worker = self
            .channels
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::InvalidNamespace {
                namespace: name.to_owned(),
            })?;

        let (tx, rx) = oneshot::channel();
        worker
            .send(WorkRequest::Batch {
                amount,
                response: tx,
            })
            .await
            .map_err(|_| Error::ChannelError {
                context: format!("worker for {name} is gone"),
            })?;

        rx.await.map_err(|_| Error::ChannelError {
            context: format!("worker for {name} dropped the request"),
        })
    }

    /// Refuses further work and releases every worker without waiting.
    ///
    /// Each worker answers what it already has queued and then stops once
    /// its last sender is gone.
    pub fn close(&self) {
        self.shutdown_token.cancel();
        let released = self.channels.write().drain().count();
        if released > 0 {
            tracing::debug!(count = released, "released channel workers");
        }
    }

    /// Stops every worker.
    ///
    /// - Cancels the token so no new work or bindings are accepted.
    /// - Sends a [`WorkRequest::Shutdown`] to each worker.
    /// - Waits up to the configured timeout per worker for acknowledgements.
    pub async fn shutdown(&self) {
        tracing::debug!("Refusing new work");
        self.shutdown_token.cancel();

        let workers: Vec<_> = self.channels.write().drain().collect();
        tracing::debug!(count = workers.len(), "Notifying all workers to shut down");

        let mut acknowledgements = Vec::with_capacity(workers.len());
        for (channel, worker) in workers {
            let (tx, rx) = oneshot::channel();
            if let Err(e) = worker.send(WorkRequest::Shutdown { response: tx }).await {
                tracing::error!(%channel, "failed to send shutdown to worker: {e}");
            } else {
                acknowledgements.push((channel, rx));
            }
        }

        let limit = self.shutdown_timeout;
        let waits = acknowledgements
            .into_iter()
            .map(|(channel, rx)| async move {
                match timeout(limit, rx).await {
                    Ok(Ok(())) => tracing::trace!(%channel, "worker shutdown acknowledged"),
                    Ok(Err(e)) => tracing::error!(%channel, "worker returned error: {e}"),
                    Err(_) => tracing::warn!(%channel, "worker shutdown timed out"),
                }
            });
        futures::future::join_all(waits).await;

        tracing::info!("Channel pool shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flakeless::{FlakeId, GeneratorConfig, OutputFormat};

    fn hex_generator(worker_id: u64) -> Flakeless {
        let config = GeneratorConfig::new()
            .with_worker_id(worker_id)
            .with_output_format(OutputFormat::Hex);
        Flakeless::new(config).unwrap()
    }

    fn pool() -> ChannelPool {
        ChannelPool::new(CancellationToken::new(), Duration::from_secs(1))
    }

    fn worker_of(id: &Option<String>) -> u64 {
        FlakeId::decode(id.as_deref().unwrap(), OutputFormat::Hex)
            .unwrap()
            .worker_id()
    }

    #[tokio::test]
    async fn dispatches_to_the_bound_generator() {
        let pool = pool();
        pool.bind("a", hex_generator(1)).unwrap();
        pool.bind("/b", hex_generator(2)).unwrap();
        assert_eq!(pool.names(), vec!["/a", "/b"]);

        let a = pool.dispatch("/a", 5).await.unwrap();
        let b = pool.dispatch("/b", 5).await.unwrap();
        assert!(a.iter().all(|id| worker_of(id) == 1));
        assert!(b.iter().all(|id| worker_of(id) == 2));
    }

    #[tokio::test]
    async fn unknown_namespace() {
        let err = pool().dispatch("/missing", 1).await.unwrap_err();
        assert_eq!(
            err,
            Error::InvalidNamespace {
                namespace: "/missing".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn rebinding_replaces_the_worker() {
        let pool = pool();
        pool.bind("/a", hex_generator(1)).unwrap();
        pool.bind("/a", hex_generator(9)).unwrap();

        let ids = pool.dispatch("/a", 3).await.unwrap();
        assert!(ids.iter().all(|id| worker_of(id) == 9));
        assert_eq!(pool.names().len(), 1);
    }

    #[tokio::test]
    async fn shutdown_refuses_further_work() {
        let pool = pool();
        pool.bind("/a", hex_generator(1)).unwrap();
        pool.shutdown().await;

        assert_eq!(pool.dispatch("/a", 1).await, Err(Error::ServiceShutdown));
        assert_eq!(
            pool.bind("/a", hex_generator(1)),
            Err(Error::ServiceShutdown)
        );
        assert!(pool.names().is_empty());
    }

    #[tokio::test]
    async fn close_releases_workers_without_waiting() {
        let pool = pool();
        pool.bind("/a", hex_generator(1)).unwrap();
        let worker = pool.channels.read().get("/a").map(mpsc::Sender::downgrade).unwrap();

        pool.close();

        assert!(pool.names().is_empty());
        assert!(worker.upgrade().is_none());
        assert_eq!(pool.dispatch("/a", 1).await, Err(Error::ServiceShutdown));
    }
}
