//! Hawser Router
//!
//! Resolves channel-URI paths to handlers. The heart is a compressed radix
//! trie supporting static segments, named parameters (`:name`), and
//! trailing catch-alls (`*name`), with priority-ordered children,
//! trailing-slash detection, and a case-insensitive fallback. The `Router`
//! wraps it with lookup policy: path cleaning, a single case-corrected
//! retry, an optional not-found handler, and an optional panic boundary.
//!
//! # Example
//!
//! ```
//! use futures::future::BoxFuture;
//! use hawser_router::{Context, HandlerError, Router};
//!
//! fn show_owner(ctx: &mut Context) -> BoxFuture<'_, Result<(), HandlerError>> {
//!     Box::pin(async move {
//!         let owner = ctx.params.by_name("owner").unwrap_or("").to_string();
//!         ctx.channel.write(owner.as_bytes()).await?;
//!         Ok(())
//!     })
//! }
//!
//! let mut router = Router::new();
//! router.register_fn("/repos/:owner/:repo", show_owner).unwrap();
//! assert!(router.has_route("/repos/eliquious/hawser"));
//! ```

pub mod error;
pub mod handler;
pub mod path;
pub mod router;
mod tree;

pub use error::{InsertError, RouterError};
pub use handler::{Context, Handler, HandlerError, Param, Params, PanicHandler};
pub use path::clean_path;
pub use router::Router;
