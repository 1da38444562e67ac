//! The request server.
//!
//! [`Server`] owns the listener, the [`ChannelPool`] and every connection
//! task.
//!
//! ## Responsibilities
//!
//! - Accept connections and hand each one to its own task.
//! - Bind and rebind channels while running.
//! - Enforce the per-request batch limit.
//! - Shut down in phases: stop accepting, drain connections, stop workers.

use crate::server::{config::ServerConfig, pool::ChannelPool, service::connection::serve_connection};
use core::time::Duration;
use flakeless::{Flakeless, TimeSource};
use flakeless_net_core::Result;
use parking_lot::Mutex;
use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::{
    net::TcpListener,
    task::JoinHandle,
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;

pub(crate) struct ServerInner {
    pub(crate) pool: ChannelPool,
    pub(crate) max_batch_size: u32,
    pub(crate) shutdown: CancellationToken,
    connections_inflight: AtomicUsize,
}

impl ServerInner {
    pub(crate) fn track_connection(self: &Arc<Self>) -> ConnectionGuard {
        self.connections_inflight.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard(Arc::clone(self))
    }

    fn connections_inflight(&self) -> usize {
        self.connections_inflight.load(Ordering::Relaxed)
    }
}

/// Counts a live connection until dropped.
pub(crate) struct ConnectionGuard(Arc<ServerInner>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.connections_inflight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A running ID server.
///
/// Dropping it without [`Self::shutdown`] stops the accept loop, closes
/// every connection and releases the channel workers without waiting.
pub struct Server {
    inner: Arc<ServerInner>,
    local_addr: SocketAddr,
    shutdown_timeout: Duration,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    /// Binds `config.server_addr` and starts accepting connections.
    ///
    /// Returns once the listener is bound, so clients may connect as soon as
    /// this resolves. Channels are added afterwards with [`Self::bind`].
    ///
    /// # Errors
    ///
    /// Returns [`flakeless_net_core::Error::Io`] if the address cannot be
    /// bound.
    pub async fn start(config: &ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.server_addr).await?;
        let local_addr = listener.local_addr()?;

        let inner = Arc::new(ServerInner {
            pool: ChannelPool::new(CancellationToken::new(), config.shutdown_timeout),
            max_batch_size: config.max_batch_size,
            shutdown: CancellationToken::new(),
            connections_inflight: AtomicUsize::new(0),
        });
        let accept_task = tokio::spawn(accept_loop(listener, Arc::clone(&inner)));

        tracing::info!(%local_addr, max_batch_size = config.max_batch_size, "listening");
        Ok(Self {
            inner,
            local_addr,
            shutdown_timeout: config.shutdown_timeout,
            accept_task: Mutex::new(Some(accept_task)),
        })
    }

    /// Binds `generator` to the namespace `name`, replacing any previous
    /// binding. Takes effect for the next request on every connection.
    ///
    /// # Errors
    ///
    /// Returns [`flakeless_net_core::Error::ServiceShutdown`] after
    /// [`Self::shutdown`].
    pub fn bind<T>(&self, name: &str, generator: Flakeless<T>) -> Result<()>
    where
        T: TimeSource + Send + 'static,
    {
        self.inner.pool.bind(name, generator)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Bound namespaces, sorted.
    pub fn channels(&self) -> Vec<String> {
        self.inner.pool.names()
    }

    pub fn connections(&self) -> usize {
        self.inner.connections_inflight()
    }

    /// Gracefully stops the server. Calling it again is a no-op.
    ///
    /// - Stops accepting and tells every connection to close.
    /// - Waits up to the shutdown timeout for connections to finish.
    /// - Stops every channel worker.
    pub async fn shutdown(&self) -> Result<()> {
        // === Phase 0: Stop accepting, close connections ===
        tracing::info!("Refusing new connections");
        self.inner.shutdown.cancel();
        let accept_task = self.accept_task.lock().take();
        if let Some(task) = accept_task {
            let _ = task.await;
        }

        // === Phase 1: Wait for connection tasks to wind down ===
        tracing::info!(
            active = self.inner.connections_inflight(),
            "Draining connections"
        );
        let drained = timeout(self.shutdown_timeout, async {
            while self.inner.connections_inflight() > 0 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        match drained {
            Ok(()) => tracing::debug!("All connections closed"),
            Err(_) => tracing::warn!(
                active = self.inner.connections_inflight(),
                "Connection drain timed out"
            ),
        }

        // === Phase 2: Stop workers ===
        self.inner.pool.shutdown().await;

        tracing::info!("Server shut down");
        Ok(())
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
        self.inner.pool.close();
    }
}

async fn accept_loop(listener: TcpListener, inner: Arc<ServerInner>) {
    loop {
        let accepted = tokio::select! {
            () = inner.shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, peer)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!(%peer, "failed to set TCP_NODELAY: {e}");
                }
                tokio::spawn(serve_connection(stream, peer, Arc::clone(&inner)));
            }
            Err(e) => {
                tracing::warn!("failed to accept connection: {e}");
                // avoid spinning on persistent errors such as fd exhaustion
                sleep(Duration::from_millis(50)).await;
            }
        }
    }
    tracing::debug!("accept loop stopped");
}
