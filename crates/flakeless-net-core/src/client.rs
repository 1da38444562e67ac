//! # Request Client
//!
//! One [`Client`] holds one TCP connection bound to one namespace. Requests
//! are pipelined: each carries an `ack` number and the read task routes the
//! matching answer back to the waiting caller, so any number of
//! [`Client::request_next`] calls may be in flight at once.
//!
//! ```no_run
//! # async fn run() -> flakeless_net_core::Result<()> {
//! use flakeless_net_core::Client;
//!
//! let client = Client::connect("127.0.0.1:4000/orders").await?;
//! let ids = client.request_next(3).await?;
//! assert_eq!(ids.len(), 3);
//! # Ok(())
//! # }
//! ```

use crate::{
    Batch, ClientCodec, ClientFrame, Endpoint, Error, INVALID_NAMESPACE, Result, ServerFrame,
};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot},
};
use tokio_util::{codec::Framed, sync::CancellationToken};

/// Budget for reaching the server and completing the handshake.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

const OUTBOUND_BUFFER: usize = 256;

type Transport = Framed<TcpStream, ClientCodec>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Batch>>>>>;

/// A connection to one namespace of a flakeless server.
///
/// Methods take `&self`; share a client across tasks with an `Arc`. Dropping
/// the client closes the connection and fails any requests still waiting.
#[derive(Debug)]
pub struct Client {
    endpoint: Endpoint,
    outbound: mpsc::Sender<ClientFrame>,
    pending: Pending,
    next_ack: AtomicU64,
    shutdown: CancellationToken,
}

impl Client {
    /// Connects to `address` (`host:port/namespace`) within
    /// [`CONNECT_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidAddress`] if `address` cannot be parsed.
    /// - [`Error::ConnectionTimeout`] if the server is unreachable, refuses
    ///   the connection, or does not answer the handshake in time.
    /// - [`Error::InvalidNamespace`] if no channel is bound to the namespace.
    pub async fn connect(address: &str) -> Result<Self> {
        Self::connect_with_timeout(address, CONNECT_TIMEOUT).await
    }

    /// Like [`Self::connect`] with a custom budget.
    pub async fn connect_with_timeout(address: &str, timeout: Duration) -> Result<Self> {
        let endpoint: Endpoint = address.parse()?;
        let transport = match tokio::time::timeout(timeout, handshake(&endpoint)).await {
            Ok(transport) => transport?,
            Err(_) => {
                tracing::debug!(%endpoint, ?timeout, "handshake timed out");
                return Err(Error::ConnectionTimeout {
                    address: endpoint.to_string(),
                });
            }
        };
        tracing::debug!(%endpoint, "connected");

        let (sink, stream) = transport.split();
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let pending = Pending::default();
        let shutdown = CancellationToken::new();

        tokio::spawn(write_loop(sink, outbound_rx, shutdown.clone()));
        tokio::spawn(read_loop(stream, Arc::clone(&pending), shutdown.clone()));

        Ok(Self {
            endpoint,
            outbound,
            pending,
            next_ack: AtomicU64::new(0),
            shutdown,
        })
    }

    /// Requests `amount` IDs and waits for the ordered batch.
    ///
    /// Entries are `None` where the server's generator was exhausted for the
    /// millisecond. Nothing is retried. Dropping the returned future discards
    /// the eventual answer.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] if the server refused the amount.
    /// - [`Error::ConnectionClosed`] if the connection ends first.
    pub async fn request_next(&self, amount: u32) -> Result<Batch> {
        let ack = self.next_ack.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(ack, tx);
        let _registration = Registration {
            pending: &self.pending,
            ack,
        };

        // The read task cancels before draining, so anything inserted after
        // the drain is caught here.
        if self.shutdown.is_cancelled() {
            return Err(Error::ConnectionClosed);
        }
        if self
            .outbound
            .send(ClientFrame::Request { ack, amount })
            .await
            .is_err()
        {
            return Err(Error::ConnectionClosed);
        }

        rx.await.unwrap_or(Err(Error::ConnectionClosed))
    }

    /// Requests a single ID.
    pub async fn request_one(&self) -> Result<Option<String>> {
        let mut batch = self.request_next(1).await?;
        batch.pop().ok_or_else(|| Error::Protocol {
            context: "empty batch for a single id".to_owned(),
        })
    }

    /// Closes the connection. Waiting requests fail with
    /// [`Error::ConnectionClosed`].
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn namespace(&self) -> &str {
        &self.endpoint.namespace
    }
}

/// Removes a request's pending entry when `request_next` returns or its
/// future is dropped, whichever comes first.
struct Registration<'a> {
    pending: &'a Pending,
    ack: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.ack);
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handshake(endpoint: &Endpoint) -> Result<Transport> {
    let stream = TcpStream::connect(&endpoint.addr).await.map_err(|e| {
        tracing::debug!(%endpoint, error = %e, "connect failed");
        Error::ConnectionTimeout {
            address: endpoint.to_string(),
        }
    })?;
    stream.set_nodelay(true)?;

    let mut transport = Framed::new(stream, ClientCodec::new());
    transport
        .send(ClientFrame::Connect {
            namespace: endpoint.namespace.clone(),
        })
        .await?;

    match transport.next().await {
        Some(Ok(ServerFrame::Connected)) => Ok(transport),
        Some(Ok(ServerFrame::Error { message })) if message == INVALID_NAMESPACE => {
            Err(Error::InvalidNamespace {
                namespace: endpoint.namespace.clone(),
            })
        }
        Some(Ok(ServerFrame::Error { message })) => Err(Error::Protocol { context: message }),
        Some(Ok(other)) => Err(Error::Protocol {
            context: format!("unexpected handshake frame: {other:?}"),
        }),
        Some(Err(e)) => Err(e.into()),
        None => Err(Error::ConnectionClosed),
    }
}

async fn write_loop(
    mut sink: SplitSink<Transport, ClientFrame>,
    mut outbound: mpsc::Receiver<ClientFrame>,
    shutdown: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            () = shutdown.cancelled() => break,
            frame = outbound.recv() => frame,
        };
        let Some(frame) = frame else { break };
        if let Err(e) = sink.send(frame).await {
            tracing::warn!(error = %e, "failed to write request");
            shutdown.cancel();
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_loop(
    mut stream: SplitStream<Transport>,
    pending: Pending,
    shutdown: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            () = shutdown.cancelled() => break,
            frame = stream.next() => frame,
        };
        match frame {
            Some(Ok(ServerFrame::Ack { ack, ids })) => complete(&pending, ack, Ok(ids)),
            Some(Ok(ServerFrame::Rejected { ack, reason })) => {
                complete(&pending, ack, Err(Error::InvalidRequest { reason }));
            }
            Some(Ok(ServerFrame::Error { message })) => {
                tracing::warn!(%message, "server reported an error");
                break;
            }
            Some(Ok(ServerFrame::Connected)) => {
                tracing::warn!("duplicate handshake acknowledgement");
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "failed to read response");
                break;
            }
            None => {
                tracing::debug!("server closed the connection");
                break;
            }
        }
    }

    shutdown.cancel();
    let waiting: Vec<_> = pending.lock().drain().map(|(_, tx)| tx).collect();
    if !waiting.is_empty() {
        tracing::debug!(count = waiting.len(), "failing requests in flight");
    }
    for tx in waiting {
        let _ = tx.send(Err(Error::ConnectionClosed));
    }
}

fn complete(pending: &Pending, ack: u64, result: Result<Batch>) {
    // Missing entries belong to requests whose caller gave up.
    if let Some(tx) = pending.lock().remove(&ack) {
        let _ = tx.send(result);
    }
}
