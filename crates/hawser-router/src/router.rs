//! Router policy layer
//!
//! Wraps the trie with the lookup policy the dispatcher relies on: a hit
//! populates the context's params and runs the handler; a miss gets one
//! retry against the cleaned, case-corrected path; after that an optional
//! not-found handler runs, or the lookup fails. An optional panic handler
//! turns handler panics into a callback instead of a dying task.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::debug;

use crate::error::{InsertError, RouterError};
use crate::handler::{Context, FnHandler, Handler, HandlerError, PanicHandler, Params};
use crate::path::clean_path;
use crate::tree::Node;

/// Resolves channel paths to handlers. Routes are registered during server
/// construction; afterwards the router is a read-only shared structure.
#[derive(Default)]
pub struct Router {
    root: Node<Arc<dyn Handler>>,
    panic_handler: Option<Arc<dyn PanicHandler>>,
    not_found: Option<Arc<dyn Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a panic boundary; see [`PanicHandler`].
    pub fn with_panic_handler(mut self, handler: Arc<dyn PanicHandler>) -> Self {
        self.panic_handler = Some(handler);
        self
    }

    /// Install a handler that runs when no route matches.
    pub fn with_not_found(mut self, handler: Arc<dyn Handler>) -> Self {
        self.not_found = Some(handler);
        self
    }

    /// Bind a pattern to a handler. Patterns use `/static` segments,
    /// `:name` parameters, and a trailing `*name` catch-all.
    pub fn register(&mut self, path: &str, handler: Arc<dyn Handler>) -> Result<(), InsertError> {
        self.root.add_route(path, handler)
    }

    /// Bind a pattern to a function returning a boxed future.
    ///
    /// ```
    /// use futures::future::BoxFuture;
    /// use hawser_router::{Context, HandlerError, Router};
    ///
    /// fn echo(ctx: &mut Context) -> BoxFuture<'_, Result<(), HandlerError>> {
    ///     Box::pin(async move {
    ///         let mut buf = [0u8; 4096];
    ///         loop {
    ///             let n = ctx.channel.read(&mut buf).await?;
    ///             if n == 0 {
    ///                 return Ok(());
    ///             }
    ///             ctx.channel.write(&buf[..n]).await?;
    ///         }
    ///     })
    /// }
    ///
    /// let mut router = Router::new();
    /// router.register_fn("/echo", echo).unwrap();
    /// assert!(router.has_route("/echo"));
    /// ```
    pub fn register_fn<F>(&mut self, path: &str, f: F) -> Result<(), InsertError>
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<(), HandlerError>>
            + Send
            + Sync
            + 'static,
    {
        self.register(path, Arc::new(FnHandler { f: Box::new(f) }))
    }

    /// Whether a concrete path resolves to a handler.
    pub fn has_route(&self, path: &str) -> bool {
        self.root.get_value(path).value.is_some()
    }

    /// Resolve a concrete path to its handler and captured parameters.
    pub fn route(&self, path: &str) -> Option<(Arc<dyn Handler>, Params)> {
        let found = self.root.get_value(path);
        found.value.map(|handler| (handler.clone(), found.params))
    }

    /// Route the context's path and run the bound handler.
    ///
    /// On a miss for any path but `/`, the path is cleaned and retried once
    /// with its case-corrected spelling (also fixing a stray or missing
    /// trailing slash); `ctx.path` is updated to the corrected form.
    pub async fn handle(&self, ctx: &mut Context) -> Result<(), RouterError> {
        if let Some(result) = self.call_route(ctx).await {
            return result.map_err(RouterError::Handler);
        }

        if ctx.path != "/" {
            let fixed = self
                .root
                .find_case_insensitive_path(&clean_path(&ctx.path), true);
            if let Some(fixed) = fixed {
                debug!(from = %ctx.path, to = %fixed, "corrected channel path");
                ctx.path = fixed;
                if let Some(result) = self.call_route(ctx).await {
                    return result.map_err(RouterError::Handler);
                }
            }
        }

        match &self.not_found {
            Some(handler) => {
                // the not-found handler owns the outcome; its error is not
                // the caller's problem
                let _ = self.invoke(handler.clone(), ctx).await;
                Ok(())
            }
            None => Err(RouterError::UnknownChannel),
        }
    }

    async fn call_route(&self, ctx: &mut Context) -> Option<Result<(), HandlerError>> {
        let (handler, params) = self.route(&ctx.path)?;
        ctx.params = params;
        Some(self.invoke(handler, ctx).await)
    }

    async fn invoke(
        &self,
        handler: Arc<dyn Handler>,
        ctx: &mut Context,
    ) -> Result<(), HandlerError> {
        match &self.panic_handler {
            Some(panic_handler) => {
                let outcome = std::panic::AssertUnwindSafe(handler.handle(ctx))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(result) => result,
                    Err(panic) => {
                        panic_handler.handle(ctx, panic);
                        Ok(())
                    }
                }
            }
            None => handler.handle(ctx).await,
        }
    }
}
