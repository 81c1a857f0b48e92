//! Handler traits and the per-channel context

use std::any::Any;

use async_trait::async_trait;
use tokio::sync::mpsc;

use hawser_core::{QueryValues, ShutdownToken};
use hawser_transport::{Channel, Request};

/// Errors produced by application handlers. Handlers are arbitrary
/// embedder code, so the error type is open.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One captured route parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub key: String,
    pub value: String,
}

/// Route parameters in capture order. Lookup is linear; parameter counts
/// are small.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<Param>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, key: String, value: String) {
        self.0.push(Param { key, value });
    }

    /// Value of the first parameter with the given name.
    pub fn by_name(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Everything a handler gets for one accepted channel.
pub struct Context {
    /// The resolved route path.
    pub path: String,
    /// Parameters captured by the matched pattern.
    pub params: Params,
    /// Parsed query values from the channel URI.
    pub query: QueryValues,
    /// Cancellation token inherited from the connection scope. Long-running
    /// handlers should observe it.
    pub shutdown: ShutdownToken,
    /// The accepted channel stream, owned for the duration of `handle`.
    pub channel: Box<dyn Channel>,
    /// In-band channel requests (`pty-req`, `env`, ...).
    pub requests: mpsc::Receiver<Request>,
}

/// Application code bound to a route.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut Context) -> Result<(), HandlerError>;
}

/// Receives panics caught at the router boundary.
pub trait PanicHandler: Send + Sync {
    fn handle(&self, ctx: &mut Context, panic: Box<dyn Any + Send>);
}

/// Adapter turning a closure into a [`Handler`]; see
/// [`Router::register_fn`](crate::Router::register_fn).
pub(crate) struct FnHandler {
    pub(crate) f: Box<
        dyn for<'a> Fn(
                &'a mut Context,
            )
                -> futures::future::BoxFuture<'a, Result<(), HandlerError>>
            + Send
            + Sync,
    >,
}

#[async_trait]
impl Handler for FnHandler {
    async fn handle(&self, ctx: &mut Context) -> Result<(), HandlerError> {
        (self.f)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_by_name() {
        let mut params = Params::new();
        params.push("owner".to_string(), "eliquious".to_string());
        params.push("repo".to_string(), "hawser".to_string());

        assert_eq!(params.by_name("owner"), Some("eliquious"));
        assert_eq!(params.by_name("repo"), Some("hawser"));
        assert_eq!(params.by_name("missing"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_params_first_match_wins() {
        let mut params = Params::new();
        params.push("id".to_string(), "1".to_string());
        params.push("id".to_string(), "2".to_string());
        assert_eq!(params.by_name("id"), Some("1"));
    }
}
