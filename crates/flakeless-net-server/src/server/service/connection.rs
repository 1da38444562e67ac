use crate::server::service::handler::ServerInner;
use core::time::Duration;
use flakeless_net_core::{
    ClientFrame, Error, INVALID_NAMESPACE, Result, ServerCodec, ServerFrame, normalize_namespace,
};
use futures::{SinkExt, StreamExt};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

/// A client that connects but never sends `connect` is dropped after this.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

type Transport = Framed<TcpStream, ServerCodec>;

/// Runs one client connection to completion.
///
/// The first frame must be `connect`. After a successful handshake, requests
/// are answered strictly in arrival order, one at a time.
pub(crate) async fn serve_connection(stream: TcpStream, peer: SocketAddr, inner: Arc<ServerInner>) {
    let _guard = inner.track_connection();
    let mut transport = Framed::new(stream, ServerCodec::new());

    let outcome = tokio::select! {
        () = inner.shutdown.cancelled() => return,
        result = tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(&mut transport, &inner)) => result,
    };
    let namespace = match outcome {
        Ok(Ok(namespace)) => namespace,
        Ok(Err(e)) => {
            tracing::debug!(%peer, error = %e, "handshake failed");
            return;
        }
        Err(_) => {
            tracing::debug!(%peer, "handshake timed out");
            return;
        }
    };
    tracing::debug!(%peer, %namespace, "connection accepted");

    loop {
        let frame = tokio::select! {
            () = inner.shutdown.cancelled() => break,
            frame = transport.next() => frame,
        };
        let reply = match frame {
            Some(Ok(ClientFrame::Request { ack, amount })) => {
                tokio::select! {
                    () = inner.shutdown.cancelled() => break,
                    reply = answer(&inner, &namespace, ack, amount) => reply,
                }
            }
            Some(Ok(ClientFrame::Connect { .. })) => {
                tracing::debug!(%peer, "repeated handshake");
                let _ = transport
                    .send(ServerFrame::Error {
                        message: "already connected".to_owned(),
                    })
                    .await;
                break;
            }
            Some(Err(e)) => {
                tracing::debug!(%peer, error = %e, "failed to read request");
                break;
            }
            None => break,
        };
        if let Err(e) = transport.send(reply).await {
            tracing::debug!(%peer, error = %e, "failed to write response");
            break;
        }
    }

    tracing::debug!(%peer, %namespace, "connection closed");
}

/// Reads the `connect` frame and confirms the namespace is bound.
async fn handshake(transport: &mut Transport, inner: &ServerInner) -> Result<String> {
    let namespace = match transport.next().await {
        Some(Ok(ClientFrame::Connect { namespace })) => normalize_namespace(&namespace),
        Some(Ok(other)) => {
            let _ = transport
                .send(ServerFrame::Error {
                    message: "expected connect".to_owned(),
                })
                .await;
            return Err(Error::Protocol {
                context: format!("expected connect, got {other:?}"),
            });
        }
        Some(Err(e)) => return Err(e.into()),
        None => return Err(Error::ConnectionClosed),
    };

    if !inner.pool.contains(&namespace) {
        transport
            .send(ServerFrame::Error {
                message: INVALID_NAMESPACE.to_owned(),
            })
            .await?;
        return Err(Error::InvalidNamespace { namespace });
    }

    transport.send(ServerFrame::Connected).await?;
    Ok(namespace)
}

async fn answer(inner: &ServerInner, namespace: &str, ack: u64, amount: u32) -> ServerFrame {
    if amount > inner.max_batch_size {
        return ServerFrame::Rejected {
            ack,
            reason: format!(
                "amount {amount} exceeds maximum allowed ({})",
                inner.max_batch_size
            ),
        };
    }

    match inner.pool.dispatch(namespace, amount).await {
        Ok(ids) => {
            tracing::trace!(%namespace, ack, amount, "batch served");
            ServerFrame::Ack { ack, ids }
        }
        Err(e) => {
            tracing::warn!(%namespace, ack, error = %e, "request failed");
            ServerFrame::Rejected {
                ack,
                reason: e.to_string(),
            }
        }
    }
}
