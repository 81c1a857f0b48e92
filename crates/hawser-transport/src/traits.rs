//! Transport trait definitions
//!
//! These traits mirror the surface a server-side SSH library exposes after
//! a successful handshake: a connection handle, a stream of channel-open
//! requests, and a stream of global requests. Implementations adapt a
//! concrete SSH library; the `mock` module provides scripted stand-ins.

use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use hawser_core::RejectionReason;

use crate::config::HandshakeConfig;
use crate::error::Result;

/// An out-of-band SSH request, either global or channel-scoped
/// (RFC 4254 section 4 / 5.4).
#[derive(Debug)]
pub struct Request {
    /// Request name, e.g. `tcpip-forward` or `env`
    pub name: String,
    /// Whether the peer expects a success/failure reply
    pub want_reply: bool,
    /// Type-specific payload
    pub payload: Bytes,
    reply_tx: Option<oneshot::Sender<bool>>,
}

impl Request {
    /// A request the peer does not want a reply to.
    pub fn new(name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            want_reply: false,
            payload: payload.into(),
            reply_tx: None,
        }
    }

    /// A request that expects a reply; the returned receiver resolves with
    /// the success flag once the request is answered.
    pub fn with_reply(
        name: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> (Self, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        let request = Self {
            name: name.into(),
            want_reply: true,
            payload: payload.into(),
            reply_tx: Some(tx),
        };
        (request, rx)
    }

    /// Answer the request. A no-op if no reply was requested or one was
    /// already sent.
    pub fn reply(&mut self, success: bool) {
        if let Some(tx) = self.reply_tx.take() {
            let _ = tx.send(success);
        }
    }
}

/// A bidirectional SSH channel stream, owned by its handler.
#[async_trait]
pub trait Channel: Send {
    /// Read up to `buf.len()` bytes; `Ok(0)` signals end of stream.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write bytes to the channel.
    async fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Write bytes to the channel's stderr extended stream.
    async fn write_stderr(&mut self, buf: &[u8]) -> Result<usize>;

    /// Signal the end of outgoing data; reads may still proceed.
    async fn close_write(&mut self) -> Result<()>;

    /// Close the channel entirely.
    async fn close(&mut self) -> Result<()>;

    /// Send an in-band channel request; when `want_reply` is set the result
    /// carries the peer's answer.
    async fn send_request(&mut self, name: &str, want_reply: bool, payload: &[u8])
        -> Result<bool>;
}

/// A pending channel-open request from the peer.
#[async_trait]
pub trait NewChannel: Send {
    /// The type name the client chose when opening the channel.
    fn channel_type(&self) -> &str;

    /// Opaque type-specific payload supplied by the client.
    fn extra_data(&self) -> &[u8];

    /// Accept the channel, yielding its stream and in-band request feed.
    /// The request feed must be serviced or discarded.
    async fn accept(&mut self) -> Result<(Box<dyn Channel>, mpsc::Receiver<Request>)>;

    /// Refuse the channel with a reason code and human-readable message.
    async fn reject(&mut self, reason: RejectionReason, message: &str) -> Result<()>;
}

/// An established, authenticated SSH connection.
#[async_trait]
pub trait Connection: Send + Sync {
    /// The authenticated user.
    fn user(&self) -> &str;

    fn remote_addr(&self) -> Option<SocketAddr>;

    fn local_addr(&self) -> Option<SocketAddr>;

    /// Close the underlying network connection. Idempotent.
    async fn close(&self) -> Result<()>;

    /// Block until the connection has shut down.
    async fn wait(&self) -> Result<()>;
}

/// Everything a successful handshake yields.
pub struct ServerConnection {
    /// The connection handle, shared across channel tasks.
    pub conn: Arc<dyn Connection>,
    /// Channel-open requests in the order the library surfaces them.
    pub channels: mpsc::Receiver<Box<dyn NewChannel>>,
    /// Global (connection-scoped) requests.
    pub requests: mpsc::Receiver<Request>,
}

/// Server side of the SSH handshake.
#[async_trait]
pub trait ServerTransport: Send + Sync {
    /// Drive the version exchange, key exchange, and user authentication on
    /// an accepted TCP stream. On failure the stream is dropped and the
    /// connection is gone.
    async fn handshake(
        &self,
        stream: TcpStream,
        config: &HandshakeConfig,
    ) -> Result<ServerConnection>;
}

/// Drain a request stream, answering failure to anything that wants a
/// reply. SSH semantics for requests nobody is listening to.
pub async fn discard_requests(mut requests: mpsc::Receiver<Request>) {
    while let Some(mut request) = requests.recv().await {
        request.reply(false);
    }
}
