//! Hawser Transport
//!
//! The trait seam between Hawser and the SSH cryptographic library. Hawser
//! never implements the SSH wire protocol itself: a `ServerTransport` turns
//! an accepted TCP stream into an authenticated connection plus its streams
//! of channel-open requests and global requests, and the framework routes
//! from there.
//!
//! The `mock` module provides scripted in-memory implementations of every
//! trait, used by the framework's own tests and available to embedders for
//! theirs.

pub mod config;
pub mod error;
pub mod mock;
pub mod traits;

pub use config::{
    AuthLogCallback, HandshakeConfig, PasswordCallback, PublicKeyCallback, Signer,
};
pub use error::{Result, TransportError};
pub use traits::{
    discard_requests, Channel, Connection, NewChannel, Request, ServerConnection,
    ServerTransport,
};
