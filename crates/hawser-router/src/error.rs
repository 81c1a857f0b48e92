//! Router error types

use thiserror::Error;

/// Route registration failures. The route table is built once at
/// configuration time, so these are programmer errors surfaced early.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InsertError {
    #[error("a handler is already registered for route {0}")]
    DuplicateRoute(String),

    #[error("wildcard {segment} in route {route} conflicts with existing prefix {existing}")]
    ConflictingWildcard {
        segment: String,
        existing: String,
        route: String,
    },

    #[error("invalid route pattern {route}: {reason}")]
    InvalidPattern { route: String, reason: String },
}

/// Routing failures surfaced by `Router::handle`.
#[derive(Error, Debug)]
pub enum RouterError {
    /// No route matched and no not-found handler is configured.
    #[error("unknown channel type")]
    UnknownChannel,

    /// The matched handler returned an error.
    #[error("{0}")]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}
