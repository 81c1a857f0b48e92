//! Scripted transport implementations for tests
//!
//! The framework's own tests exercise dispatch and supervision against
//! these mocks instead of a real SSH stack: a `MockServerTransport` yields
//! pre-scripted connections, and each `MockNewChannel` records how it was
//! accepted or rejected. Embedders can use them to test handlers without
//! opening sockets.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};

use hawser_core::RejectionReason;

use crate::config::{HandshakeConfig, Signer};
use crate::error::{Result, TransportError};
use crate::traits::{Channel, Connection, NewChannel, Request, ServerConnection, ServerTransport};

const CHANNEL_BUFFER: usize = 16;

/// A throwaway host key for tests. Signing just echoes the input.
pub struct MockSigner {
    algorithm: String,
    public_key: Vec<u8>,
}

impl MockSigner {
    pub fn new() -> Self {
        Self {
            algorithm: "ssh-ed25519".to_string(),
            public_key: b"mock-ed25519-host-key".to_vec(),
        }
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer for MockSigner {
    fn algorithm(&self) -> &str {
        &self.algorithm
    }

    fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

// ============================================================================
// MockChannel
// ============================================================================

#[derive(Default)]
struct ChannelState {
    reads: Mutex<VecDeque<Bytes>>,
    writes: Mutex<Vec<u8>>,
    stderr: Mutex<Vec<u8>>,
    requests_sent: Mutex<Vec<(String, bool, Bytes)>>,
    closed: AtomicBool,
    write_closed: AtomicBool,
}

/// An in-memory channel stream. Cloning yields a handle onto the same
/// state, so tests can keep one for assertions after the channel has been
/// handed to a handler.
#[derive(Clone, Default)]
pub struct MockChannel {
    inner: Arc<ChannelState>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue data for the handler to read.
    pub fn push_read(&self, data: impl Into<Bytes>) {
        self.inner.reads.lock().push_back(data.into());
    }

    /// Everything written to the channel so far.
    pub fn written(&self) -> Vec<u8> {
        self.inner.writes.lock().clone()
    }

    /// Everything written to the stderr stream so far.
    pub fn stderr_written(&self) -> Vec<u8> {
        self.inner.stderr.lock().clone()
    }

    /// In-band requests sent through the channel.
    pub fn sent_requests(&self) -> Vec<(String, bool, Bytes)> {
        self.inner.requests_sent.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn is_write_closed(&self) -> bool {
        self.inner.write_closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Ok(0);
        }
        let mut reads = self.inner.reads.lock();
        let Some(mut chunk) = reads.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            reads.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.is_closed() || self.is_write_closed() {
            return Err(TransportError::ConnectionClosed);
        }
        self.inner.writes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn write_stderr(&mut self, buf: &[u8]) -> Result<usize> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed);
        }
        self.inner.stderr.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn close_write(&mut self) -> Result<()> {
        self.inner.write_closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send_request(
        &mut self,
        name: &str,
        want_reply: bool,
        payload: &[u8],
    ) -> Result<bool> {
        self.inner.requests_sent.lock().push((
            name.to_string(),
            want_reply,
            Bytes::copy_from_slice(payload),
        ));
        Ok(true)
    }
}

// ============================================================================
// MockNewChannel
// ============================================================================

struct NewChannelState {
    channel_type: String,
    extra_data: Bytes,
    channel: MockChannel,
    accept_error: Mutex<Option<String>>,
    accepted: AtomicBool,
    rejections: Mutex<Vec<(RejectionReason, String)>>,
    request_rx: Mutex<Option<mpsc::Receiver<Request>>>,
    request_tx: mpsc::Sender<Request>,
}

/// A scripted channel-open request. Cloning yields a handle for assertions.
#[derive(Clone)]
pub struct MockNewChannel {
    inner: Arc<NewChannelState>,
}

impl MockNewChannel {
    pub fn new(channel_type: impl Into<String>) -> Self {
        Self::with_extra_data(channel_type, Bytes::new())
    }

    pub fn with_extra_data(channel_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let (request_tx, request_rx) = mpsc::channel(CHANNEL_BUFFER);
        Self {
            inner: Arc::new(NewChannelState {
                channel_type: channel_type.into(),
                extra_data: data.into(),
                channel: MockChannel::new(),
                accept_error: Mutex::new(None),
                accepted: AtomicBool::new(false),
                rejections: Mutex::new(Vec::new()),
                request_rx: Mutex::new(Some(request_rx)),
                request_tx,
            }),
        }
    }

    /// Make the next `accept` call fail with the given message.
    pub fn fail_accept(self, message: impl Into<String>) -> Self {
        *self.inner.accept_error.lock() = Some(message.into());
        self
    }

    /// Handle onto the channel stream this mock yields on accept.
    pub fn channel(&self) -> MockChannel {
        self.inner.channel.clone()
    }

    /// Sender for scripting in-band channel requests.
    pub fn request_sender(&self) -> mpsc::Sender<Request> {
        self.inner.request_tx.clone()
    }

    pub fn was_accepted(&self) -> bool {
        self.inner.accepted.load(Ordering::SeqCst)
    }

    /// Every `(reason, message)` rejection recorded against this channel.
    pub fn rejections(&self) -> Vec<(RejectionReason, String)> {
        self.inner.rejections.lock().clone()
    }
}

#[async_trait]
impl NewChannel for MockNewChannel {
    fn channel_type(&self) -> &str {
        &self.inner.channel_type
    }

    fn extra_data(&self) -> &[u8] {
        &self.inner.extra_data
    }

    async fn accept(&mut self) -> Result<(Box<dyn Channel>, mpsc::Receiver<Request>)> {
        if let Some(message) = self.inner.accept_error.lock().take() {
            return Err(TransportError::AcceptFailed(message));
        }
        let requests = self
            .inner
            .request_rx
            .lock()
            .take()
            .ok_or(TransportError::AlreadyAccepted)?;
        self.inner.accepted.store(true, Ordering::SeqCst);
        Ok((Box::new(self.inner.channel.clone()), requests))
    }

    async fn reject(&mut self, reason: RejectionReason, message: &str) -> Result<()> {
        self.inner
            .rejections
            .lock()
            .push((reason, message.to_string()));
        Ok(())
    }
}

// ============================================================================
// MockConnection
// ============================================================================

struct ConnectionState {
    user: String,
    remote_addr: Option<SocketAddr>,
    close_calls: AtomicUsize,
    closed: AtomicBool,
    closed_notify: Notify,
}

/// A scripted connection handle. Cloning yields a handle onto the same
/// state for assertions.
#[derive(Clone)]
pub struct MockConnection {
    inner: Arc<ConnectionState>,
}

impl MockConnection {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ConnectionState {
                user: user.into(),
                remote_addr: None,
                close_calls: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                closed_notify: Notify::new(),
            }),
        }
    }

    /// How many times `close` has been invoked.
    pub fn close_count(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new("mock")
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn user(&self) -> &str {
        &self.inner.user
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.inner.remote_addr
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        None
    }

    async fn close(&self) -> Result<()> {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.closed_notify.notify_waiters();
        Ok(())
    }

    async fn wait(&self) -> Result<()> {
        let notified = self.inner.closed_notify.notified();
        if self.inner.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        notified.await;
        Ok(())
    }
}

// ============================================================================
// MockServerTransport
// ============================================================================

struct ScriptedAuth {
    user: String,
    password: Bytes,
}

struct ScriptedHandshake {
    conn: MockConnection,
    channels: mpsc::Receiver<Box<dyn NewChannel>>,
    requests: mpsc::Receiver<Request>,
    auth: Option<ScriptedAuth>,
}

enum Script {
    Fail(String),
    Connect(Box<ScriptedHandshake>),
}

/// Test-side handles for one scripted connection.
pub struct ScriptedConnectionHandle {
    /// The connection the supervisor will see.
    pub conn: MockConnection,
    /// Push channel-open requests through here.
    pub channels: mpsc::Sender<Box<dyn NewChannel>>,
    /// Push global requests through here.
    pub requests: mpsc::Sender<Request>,
}

/// A `ServerTransport` that replays scripted handshakes in order.
#[derive(Default)]
pub struct MockServerTransport {
    scripts: Mutex<VecDeque<Script>>,
}

impl MockServerTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next handshake will fail with this message.
    pub fn script_failure(&self, message: impl Into<String>) {
        self.scripts
            .lock()
            .push_back(Script::Fail(message.into()));
    }

    /// The next handshake will succeed, yielding a connection the test
    /// feeds through the returned handle.
    pub fn script_connection(&self, user: &str) -> ScriptedConnectionHandle {
        self.script(user, None)
    }

    /// Like `script_connection`, but the handshake attempts password
    /// authentication through the configured callbacks first.
    pub fn script_connection_with_password(
        &self,
        user: &str,
        password: impl Into<Bytes>,
    ) -> ScriptedConnectionHandle {
        self.script(
            user,
            Some(ScriptedAuth {
                user: user.to_string(),
                password: password.into(),
            }),
        )
    }

    fn script(&self, user: &str, auth: Option<ScriptedAuth>) -> ScriptedConnectionHandle {
        let (channel_tx, channel_rx) = mpsc::channel(CHANNEL_BUFFER);
        let (request_tx, request_rx) = mpsc::channel(CHANNEL_BUFFER);
        let conn = MockConnection::new(user);
        self.scripts
            .lock()
            .push_back(Script::Connect(Box::new(ScriptedHandshake {
                conn: conn.clone(),
                channels: channel_rx,
                requests: request_rx,
                auth,
            })));
        ScriptedConnectionHandle {
            conn,
            channels: channel_tx,
            requests: request_tx,
        }
    }
}

#[async_trait]
impl ServerTransport for MockServerTransport {
    async fn handshake(
        &self,
        stream: TcpStream,
        config: &HandshakeConfig,
    ) -> Result<ServerConnection> {
        drop(stream);
        let script = self.scripts.lock().pop_front();
        match script {
            None => Err(TransportError::HandshakeFailed(
                "no scripted connection".to_string(),
            )),
            Some(Script::Fail(message)) => Err(TransportError::HandshakeFailed(message)),
            Some(Script::Connect(handshake)) => {
                if let Some(auth) = &handshake.auth {
                    let accepted = config
                        .password_callback
                        .as_ref()
                        .map(|cb| cb(&auth.user, &auth.password))
                        .unwrap_or(false);
                    if let Some(log) = &config.auth_log_callback {
                        log(&auth.user, "password", accepted);
                    }
                    if !accepted {
                        return Err(TransportError::AuthFailed(auth.user.clone()));
                    }
                }
                Ok(ServerConnection {
                    conn: Arc::new(handshake.conn),
                    channels: handshake.channels,
                    requests: handshake.requests,
                })
            }
        }
    }
}
