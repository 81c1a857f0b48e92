//! Server configuration

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hawser_core::ShutdownToken;
use hawser_transport::{
    AuthLogCallback, HandshakeConfig, PasswordCallback, PublicKeyCallback, ServerTransport,
    Signer,
};

use crate::consumer::RequestConsumer;
use crate::dispatcher::Dispatcher;

/// Everything needed to build a [`Server`](crate::Server).
///
/// `bind` must be non-empty and resolvable; the host key, transport,
/// dispatcher, and shutdown scope are required by construction. The
/// authentication callbacks are handed to the transport's handshake
/// verbatim.
#[derive(Clone)]
pub struct Config {
    /// Listener address, e.g. `127.0.0.1:2022`.
    pub bind: String,
    /// Maximum time one accept call may block. Bounds how long shutdown
    /// can go unnoticed by the acceptor.
    pub deadline: Duration,
    /// The SSH transport implementation driving handshakes.
    pub transport: Arc<dyn ServerTransport>,
    /// The server's host key.
    pub host_key: Arc<dyn Signer>,
    /// Password authentication, if enabled.
    pub password_callback: Option<PasswordCallback>,
    /// Public-key authentication, if enabled.
    pub public_key_callback: Option<PublicKeyCallback>,
    /// Authentication attempt logging, if wanted.
    pub auth_log_callback: Option<AuthLogCallback>,
    /// Routes each opened channel to a handler.
    pub dispatcher: Arc<dyn Dispatcher>,
    /// Sink for global requests; without one they are discarded.
    pub consumer: Option<Arc<dyn RequestConsumer>>,
    /// Shutdown scope the server lives in.
    pub shutdown: ShutdownToken,
}

impl Config {
    /// The handshake configuration handed to the transport for every
    /// accepted connection.
    pub fn handshake_config(&self) -> HandshakeConfig {
        HandshakeConfig {
            host_key: self.host_key.clone(),
            password_callback: self.password_callback.clone(),
            public_key_callback: self.public_key_callback.clone(),
            auth_log_callback: self.auth_log_callback.clone(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind", &self.bind)
            .field("deadline", &self.deadline)
            .field("host_key", &self.host_key.algorithm())
            .field("password_callback", &self.password_callback.is_some())
            .field("public_key_callback", &self.public_key_callback.is_some())
            .field("auth_log_callback", &self.auth_log_callback.is_some())
            .field("consumer", &self.consumer.is_some())
            .finish()
    }
}
