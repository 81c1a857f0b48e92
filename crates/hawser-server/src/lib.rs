//! Hawser Server
//!
//! The embeddable SSH server: a deadline-bounded acceptor, one supervisor
//! per connection, and a dispatcher that routes each opened channel to an
//! application handler by its URI-shaped type name. The SSH transport and
//! handshake are delegated to a [`ServerTransport`] implementation; Hawser
//! owns everything above it.
//!
//! Shutdown is hierarchical and deterministic: cancelling the configured
//! scope stops the acceptor, which joins its supervisors, which join their
//! channel tasks. [`Server::stop`] returns only when everything is done.
//!
//! [`ServerTransport`]: hawser_transport::ServerTransport

pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod server;
mod supervisor;
pub mod task;

pub use config::Config;
pub use consumer::RequestConsumer;
pub use dispatcher::{Dispatcher, SimpleDispatcher, UrlDispatcher};
pub use error::ServerError;
pub use server::Server;
pub use task::TaskGroup;
