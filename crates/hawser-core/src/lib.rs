//! Hawser Core
//!
//! Shared vocabulary for the Hawser SSH channel routing framework:
//! - Channel URI parsing (`ChannelUri`)
//! - Query string values (`QueryValues`)
//! - Channel rejection reasons (`RejectionReason`)
//! - Cooperative shutdown primitives (`ShutdownController`, `ShutdownToken`)
//!
//! Clients open SSH channels whose type name is a URI-shaped identifier
//! (`/echo`, `/repos/owner/repo?depth=1`). This crate owns the parsing and
//! the framework-level rejection codes; routing and dispatch live in the
//! `hawser-router` and `hawser-server` crates.

pub mod error;
pub mod query;
pub mod reject;
pub mod shutdown;
pub mod uri;

pub use error::{Error, Result};
pub use query::QueryValues;
pub use reject::RejectionReason;
pub use shutdown::{ShutdownController, ShutdownToken};
pub use uri::ChannelUri;
