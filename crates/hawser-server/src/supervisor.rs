//! Per-connection supervision
//!
//! One supervisor per accepted TCP connection: it drives the SSH handshake,
//! drains global requests, and pumps channel-open requests into dispatch
//! tasks. Channels on one connection are surfaced in order but handled
//! concurrently. On exit the supervisor joins its tasks and closes the
//! connection exactly once.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{debug, warn};
use uuid::Uuid;

use hawser_core::ShutdownToken;
use hawser_transport::{discard_requests, HandshakeConfig, ServerConnection, ServerTransport};

use crate::consumer::RequestConsumer;
use crate::dispatcher::Dispatcher;
use crate::task::TaskGroup;

/// Connection-handling state shared by every supervisor of one server.
pub(crate) struct Shared {
    pub(crate) transport: Arc<dyn ServerTransport>,
    pub(crate) handshake: HandshakeConfig,
    pub(crate) dispatcher: Arc<dyn Dispatcher>,
    pub(crate) consumer: Option<Arc<dyn RequestConsumer>>,
}

pub(crate) async fn supervise(
    stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<Shared>,
    parent: ShutdownToken,
) {
    // a connection accepted during shutdown is simply dropped
    if parent.is_cancelled() {
        return;
    }

    let conn_id = Uuid::new_v4();

    let ServerConnection {
        conn,
        mut channels,
        requests,
    } = match shared.transport.handshake(stream, &shared.handshake).await {
        Ok(connection) => connection,
        Err(e) => {
            warn!(%peer, error = %e, "ssh handshake failed");
            return;
        }
    };
    debug!(%peer, %conn_id, user = conn.user(), "handshake successful");

    let mut group = TaskGroup::with_parent(&parent);
    let token = group.token();

    // global requests go to the consumer, or into the void; the drain is
    // infrastructure and ends with the scope, not with the stream
    let consumer = shared.consumer.clone();
    let drain_token = token.clone();
    group.spawn(async move {
        let drain = async {
            match consumer {
                Some(consumer) => consumer.consume(requests).await,
                None => discard_requests(requests).await,
            }
        };
        tokio::select! {
            _ = drain_token.cancelled() => {}
            _ = drain => {}
        }
    });
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            next = channels.recv() => {
                let Some(channel) = next else { break };
                let dispatcher = shared.dispatcher.clone();
                let conn = conn.clone();
                let token = token.clone();
                group.spawn(async move {
                    dispatcher.dispatch(token, conn, channel).await;
                });
            }
        }
    }

    group.cancel();
    group.wait().await;

    if let Err(e) = conn.close().await {
        debug!(%conn_id, error = %e, "connection close reported an error");
    }
    if let Err(e) = conn.wait().await {
        debug!(%conn_id, error = %e, "connection shut down with an error");
    }
    debug!(%conn_id, "connection supervisor exited");
}
