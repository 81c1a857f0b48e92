//! Channel dispatch
//!
//! A [`Dispatcher`] decides what happens to each channel a client opens.
//! Two implementations are provided behind the same capability:
//!
//! - [`SimpleDispatcher`] matches the raw channel-type string against a
//!   flat table, no URI interpretation.
//! - [`UrlDispatcher`] parses the channel type as a request URI, enforces
//!   the URI restrictions, and routes the path through a [`Router`].
//!
//! Either way, a channel's lifecycle ends its connection: every dispatch
//! exit path, panics included, closes the owning SSH connection. One
//! channel per connection is the framework's contract.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{error, info, warn};

use hawser_core::{ChannelUri, QueryValues, RejectionReason, ShutdownToken};
use hawser_router::{Context, Handler, Params, Router};
use hawser_transport::{Connection, NewChannel};

/// Selects and runs a handler for a newly opened channel.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Handle one channel-open request. Infallible from the supervisor's
    /// point of view: all failures are communicated to the peer as channel
    /// rejections.
    async fn dispatch(
        &self,
        shutdown: ShutdownToken,
        conn: Arc<dyn Connection>,
        channel: Box<dyn NewChannel>,
    );
}

async fn reject(channel: &mut dyn NewChannel, reason: RejectionReason, message: &str) {
    if let Err(e) = channel.reject(reason, message).await {
        warn!(code = reason.code(), error = %e, "channel reject failed");
    }
}

// ============================================================================
// UrlDispatcher
// ============================================================================

/// Routes channels by interpreting their type name as a request URI.
pub struct UrlDispatcher {
    router: Arc<Router>,
}

impl UrlDispatcher {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    async fn run(&self, shutdown: ShutdownToken, channel: &mut dyn NewChannel) {
        let channel_type = channel.channel_type().to_string();

        let uri = match ChannelUri::parse(&channel_type) {
            Ok(uri) => uri,
            Err(e) => {
                warn!(%channel_type, error = %e, "error parsing channel type");
                reject(channel, RejectionReason::InvalidChannelType, "invalid channel URI")
                    .await;
                return;
            }
        };

        if reject_restricted(&channel_type, &uri, channel).await {
            return;
        }

        let query = match QueryValues::parse(&uri.query) {
            Ok(values) => values,
            Err(e) => {
                warn!(%channel_type, error = %e, "error parsing query params");
                reject(
                    channel,
                    RejectionReason::InvalidQueryParams,
                    "invalid query params in channel type",
                )
                .await;
                return;
            }
        };

        let path = uri.path;
        if !self.router.has_route(&path) {
            info!(channel_type = %path, "unknown channel type");
            reject(channel, RejectionReason::UnknownChannelType, &path).await;
            return;
        }

        let (stream, requests) = match channel.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(channel_type = %path, error = %e, "error accepting channel");
                reject(channel, RejectionReason::ChannelAcceptError, &path).await;
                return;
            }
        };

        let mut ctx = Context {
            path,
            params: Params::new(),
            query,
            shutdown,
            channel: stream,
            requests,
        };

        if let Err(e) = self.router.handle(&mut ctx).await {
            warn!(channel_type = %ctx.path, error = %e, "error handling channel");
            // advisory: the channel was already accepted
            reject(
                channel,
                RejectionReason::ChannelHandleError,
                &format!("error handling channel: {e}"),
            )
            .await;
        }

        let _ = ctx.channel.close().await;
    }
}

#[async_trait]
impl Dispatcher for UrlDispatcher {
    async fn dispatch(
        &self,
        shutdown: ShutdownToken,
        conn: Arc<dyn Connection>,
        mut channel: Box<dyn NewChannel>,
    ) {
        let outcome = AssertUnwindSafe(self.run(shutdown, channel.as_mut()))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            error!(
                channel_type = %channel.channel_type(),
                "panic while dispatching channel"
            );
        }
        if let Err(e) = conn.close().await {
            warn!(error = %e, "error closing connection");
        }
    }
}

/// Enforce the URI restrictions, most specific first: scheme, then
/// user-info, then host. Returns whether the channel was rejected.
async fn reject_restricted(
    channel_type: &str,
    uri: &ChannelUri,
    channel: &mut dyn NewChannel,
) -> bool {
    if uri.scheme.is_some() {
        warn!(%channel_type, "URI schemes not supported");
        reject(
            channel,
            RejectionReason::SchemeNotSupported,
            "schemes are not supported in the channel URI",
        )
        .await;
        true
    } else if uri.user_info.is_some() {
        warn!(%channel_type, "URI users not supported");
        reject(
            channel,
            RejectionReason::UserNotSupported,
            "users are not supported in the channel URI",
        )
        .await;
        true
    } else if uri.host.is_some() {
        warn!(%channel_type, "URI hosts not supported");
        reject(
            channel,
            RejectionReason::HostNotSupported,
            "hosts are not supported in the channel URI",
        )
        .await;
        true
    } else {
        false
    }
}

// ============================================================================
// SimpleDispatcher
// ============================================================================

/// Matches the raw channel-type string exactly against a handler table.
#[derive(Default)]
pub struct SimpleDispatcher {
    handlers: HashMap<String, Arc<dyn Handler>>,
    not_found: Option<Arc<dyn Handler>>,
}

impl SimpleDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a channel type to a handler. Later registrations replace
    /// earlier ones.
    pub fn register(&mut self, channel_type: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.insert(channel_type.into(), handler);
    }

    /// Install a handler that runs for unmatched channel types instead of
    /// rejecting them.
    pub fn with_not_found(mut self, handler: Arc<dyn Handler>) -> Self {
        self.not_found = Some(handler);
        self
    }

    async fn run(&self, shutdown: ShutdownToken, channel: &mut dyn NewChannel) {
        let channel_type = channel.channel_type().to_string();

        let handler = self
            .handlers
            .get(&channel_type)
            .or(self.not_found.as_ref())
            .cloned();
        let Some(handler) = handler else {
            info!(%channel_type, "unknown channel type");
            reject(channel, RejectionReason::UnknownChannelType, &channel_type).await;
            return;
        };

        let (stream, requests) = match channel.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(%channel_type, error = %e, "error accepting channel");
                reject(channel, RejectionReason::ChannelAcceptError, &channel_type).await;
                return;
            }
        };

        let mut ctx = Context {
            path: channel_type.clone(),
            params: Params::new(),
            query: QueryValues::default(),
            shutdown,
            channel: stream,
            requests,
        };

        if let Err(e) = handler.handle(&mut ctx).await {
            warn!(%channel_type, error = %e, "error handling channel");
            reject(
                channel,
                RejectionReason::ChannelHandleError,
                &format!("error handling channel: {e}"),
            )
            .await;
        }

        let _ = ctx.channel.close().await;
    }
}

#[async_trait]
impl Dispatcher for SimpleDispatcher {
    async fn dispatch(
        &self,
        shutdown: ShutdownToken,
        conn: Arc<dyn Connection>,
        mut channel: Box<dyn NewChannel>,
    ) {
        let outcome = AssertUnwindSafe(self.run(shutdown, channel.as_mut()))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            error!(
                channel_type = %channel.channel_type(),
                "panic while dispatching channel"
            );
        }
        if let Err(e) = conn.close().await {
            warn!(error = %e, "error closing connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hawser_transport::mock::MockNewChannel;

    // user-info and host can only surface alongside a scheme through
    // `ChannelUri::parse`, so the restriction checks are driven directly

    #[tokio::test]
    async fn test_user_restriction() {
        let uri = ChannelUri {
            user_info: Some("user".to_string()),
            ..ChannelUri::default()
        };
        let mock = MockNewChannel::new("user@example.com/echo");
        let mut channel = mock.clone();

        let rejected = reject_restricted("user@example.com/echo", &uri, &mut channel).await;
        assert!(rejected, "channel should have been rejected");
        assert_eq!(
            mock.rejections(),
            vec![(
                RejectionReason::UserNotSupported,
                "users are not supported in the channel URI".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_host_restriction() {
        let uri = ChannelUri {
            host: Some("example.com".to_string()),
            ..ChannelUri::default()
        };
        let mock = MockNewChannel::new("user@example.com/echo");
        let mut channel = mock.clone();

        let rejected = reject_restricted("user@example.com/echo", &uri, &mut channel).await;
        assert!(rejected, "channel should have been rejected");
        assert_eq!(
            mock.rejections(),
            vec![(
                RejectionReason::HostNotSupported,
                "hosts are not supported in the channel URI".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_scheme_restriction_wins_over_user_and_host() {
        let uri = ChannelUri {
            scheme: Some("https".to_string()),
            user_info: Some("user".to_string()),
            host: Some("example.com".to_string()),
            path: "/api/route".to_string(),
            ..ChannelUri::default()
        };
        let mock = MockNewChannel::new("https://user@example.com/api/route");
        let mut channel = mock.clone();

        assert!(reject_restricted("https://user@example.com/api/route", &uri, &mut channel).await);
        assert_eq!(
            mock.rejections(),
            vec![(
                RejectionReason::SchemeNotSupported,
                "schemes are not supported in the channel URI".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_plain_path_passes_restrictions() {
        let uri = ChannelUri::parse("/echo").unwrap();
        let mock = MockNewChannel::new("/echo");
        let mut channel = mock.clone();

        assert!(!reject_restricted("/echo", &uri, &mut channel).await);
        assert!(mock.rejections().is_empty());
    }
}
