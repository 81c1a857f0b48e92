//! Handshake configuration
//!
//! The host key and authentication callbacks are plumbed through to the SSH
//! library verbatim; Hawser imposes no policy of its own here.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// A host key signer. The SSH library uses it to prove the server's
/// identity during key exchange.
pub trait Signer: Send + Sync {
    /// Key algorithm name, e.g. `ssh-ed25519`.
    fn algorithm(&self) -> &str;

    /// Public key blob in SSH wire format.
    fn public_key(&self) -> &[u8];

    /// Sign the given data with the private half.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Called for password authentication attempts; returns whether the
/// credentials are acceptable.
pub type PasswordCallback = Arc<dyn Fn(&str, &[u8]) -> bool + Send + Sync>;

/// Called for public-key authentication attempts with the user name and the
/// key blob in SSH wire format.
pub type PublicKeyCallback = Arc<dyn Fn(&str, &[u8]) -> bool + Send + Sync>;

/// Called once per authentication attempt with user, method, and outcome.
pub type AuthLogCallback = Arc<dyn Fn(&str, &str, bool) + Send + Sync>;

/// Configuration handed to [`ServerTransport::handshake`].
///
/// [`ServerTransport::handshake`]: crate::traits::ServerTransport::handshake
#[derive(Clone)]
pub struct HandshakeConfig {
    /// The server's host key.
    pub host_key: Arc<dyn Signer>,
    /// Password authentication, if enabled.
    pub password_callback: Option<PasswordCallback>,
    /// Public-key authentication, if enabled.
    pub public_key_callback: Option<PublicKeyCallback>,
    /// Authentication attempt logging, if wanted.
    pub auth_log_callback: Option<AuthLogCallback>,
}

impl HandshakeConfig {
    pub fn new(host_key: Arc<dyn Signer>) -> Self {
        Self {
            host_key,
            password_callback: None,
            public_key_callback: None,
            auth_log_callback: None,
        }
    }
}

impl fmt::Debug for HandshakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeConfig")
            .field("host_key", &self.host_key.algorithm())
            .field("password_callback", &self.password_callback.is_some())
            .field("public_key_callback", &self.public_key_callback.is_some())
            .field("auth_log_callback", &self.auth_log_callback.is_some())
            .finish()
    }
}
