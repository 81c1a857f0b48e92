//! Dispatcher behavior against scripted channels
//!
//! Covers the full reject matrix of the URL dispatcher — parse failures,
//! URI restrictions, route misses, accept failures, handler errors — plus
//! the close invariant: every dispatch exit path closes the owning
//! connection exactly once.

use std::sync::Arc;

use async_trait::async_trait;

use hawser_core::{RejectionReason, ShutdownController};
use hawser_router::{Context, Handler, HandlerError, Router};
use hawser_server::{Dispatcher, SimpleDispatcher, UrlDispatcher};
use hawser_transport::mock::{MockConnection, MockNewChannel};
use hawser_transport::{Connection, NewChannel};

struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn handle(&self, ctx: &mut Context) -> Result<(), HandlerError> {
        let mut buf = [0u8; 4096];
        loop {
            let n = ctx.channel.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            ctx.channel.write(&buf[..n]).await?;
        }
    }
}

struct BadHandler;

#[async_trait]
impl Handler for BadHandler {
    async fn handle(&self, _ctx: &mut Context) -> Result<(), HandlerError> {
        Err("an error occurred".into())
    }
}

struct ExplodingHandler;

#[async_trait]
impl Handler for ExplodingHandler {
    async fn handle(&self, _ctx: &mut Context) -> Result<(), HandlerError> {
        panic!("handler blew up")
    }
}

/// Writes the captured params and query in a fixed format.
struct InspectHandler;

#[async_trait]
impl Handler for InspectHandler {
    async fn handle(&self, ctx: &mut Context) -> Result<(), HandlerError> {
        let mut report = String::new();
        for param in &ctx.params {
            report.push_str(&format!("{}={};", param.key, param.value));
        }
        if let Some(verbose) = ctx.query.get("verbose") {
            report.push_str(&format!("verbose={verbose}"));
        }
        ctx.channel.write(report.as_bytes()).await?;
        Ok(())
    }
}

fn url_dispatcher() -> UrlDispatcher {
    let mut router = Router::new();
    router.register("/echo", Arc::new(EchoHandler)).unwrap();
    router.register("/bad", Arc::new(BadHandler)).unwrap();
    router.register("/boom", Arc::new(ExplodingHandler)).unwrap();
    router
        .register(
            "/repos/:owner/:repo/issues/:number/comments",
            Arc::new(InspectHandler),
        )
        .unwrap();
    UrlDispatcher::new(router)
}

/// Run one dispatch to completion and hand back the connection for
/// close-count assertions.
async fn dispatch(dispatcher: &dyn Dispatcher, channel: &MockNewChannel) -> MockConnection {
    let scope = ShutdownController::new();
    let conn = MockConnection::new("admin");
    let boxed: Box<dyn NewChannel> = Box::new(channel.clone());
    dispatcher
        .dispatch(scope.token(), Arc::new(conn.clone()) as Arc<dyn Connection>, boxed)
        .await;
    conn
}

// ============================================================================
// UrlDispatcher
// ============================================================================

#[tokio::test]
async fn test_registered_channel_is_accepted_and_handled() {
    let dispatcher = url_dispatcher();
    let channel = MockNewChannel::new("/echo");
    channel.channel().push_read("ping");

    let conn = dispatch(&dispatcher, &channel).await;

    assert!(channel.was_accepted());
    assert!(channel.rejections().is_empty(), "no reject expected");
    assert_eq!(channel.channel().written(), b"ping");
    assert!(channel.channel().is_closed());
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_unknown_channel_type_is_rejected() {
    let dispatcher = url_dispatcher();
    let channel = MockNewChannel::new("shell");

    let conn = dispatch(&dispatcher, &channel).await;

    assert!(!channel.was_accepted());
    assert_eq!(
        channel.rejections(),
        vec![(RejectionReason::UnknownChannelType, "shell".to_string())]
    );
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_wildcard_channel_type_is_rejected() {
    let dispatcher = url_dispatcher();
    let channel = MockNewChannel::new("*");

    let conn = dispatch(&dispatcher, &channel).await;

    assert_eq!(
        channel.rejections(),
        vec![(RejectionReason::UnknownChannelType, "*".to_string())]
    );
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_invalid_channel_uri_is_rejected() {
    let dispatcher = url_dispatcher();
    let channel = MockNewChannel::new(":/route");

    let conn = dispatch(&dispatcher, &channel).await;

    assert!(!channel.was_accepted());
    assert_eq!(
        channel.rejections(),
        vec![(
            RejectionReason::InvalidChannelType,
            "invalid channel URI".to_string()
        )]
    );
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_scheme_is_rejected_before_user_and_host() {
    let dispatcher = url_dispatcher();
    let channel = MockNewChannel::new("https://user@example.com/api/route");

    let conn = dispatch(&dispatcher, &channel).await;

    assert_eq!(
        channel.rejections(),
        vec![(
            RejectionReason::SchemeNotSupported,
            "schemes are not supported in the channel URI".to_string()
        )]
    );
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_invalid_query_params_are_rejected() {
    let dispatcher = url_dispatcher();
    let channel = MockNewChannel::new("/echo?%");

    let conn = dispatch(&dispatcher, &channel).await;

    assert!(!channel.was_accepted());
    assert_eq!(
        channel.rejections(),
        vec![(
            RejectionReason::InvalidQueryParams,
            "invalid query params in channel type".to_string()
        )]
    );
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_unacceptable_channel_is_rejected() {
    let dispatcher = url_dispatcher();
    let channel = MockNewChannel::new("/echo").fail_accept("accept error");

    let conn = dispatch(&dispatcher, &channel).await;

    assert!(!channel.was_accepted());
    assert_eq!(
        channel.rejections(),
        vec![(RejectionReason::ChannelAcceptError, "/echo".to_string())]
    );
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_handler_error_rejects_after_accept() {
    let dispatcher = url_dispatcher();
    let channel = MockNewChannel::new("/bad");

    let conn = dispatch(&dispatcher, &channel).await;

    assert!(channel.was_accepted());
    assert_eq!(
        channel.rejections(),
        vec![(
            RejectionReason::ChannelHandleError,
            "error handling channel: an error occurred".to_string()
        )]
    );
    assert!(channel.channel().is_closed());
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_handler_panic_still_closes_connection() {
    let dispatcher = url_dispatcher();
    let channel = MockNewChannel::new("/boom");

    let conn = dispatch(&dispatcher, &channel).await;

    assert!(channel.was_accepted());
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_params_and_query_reach_the_handler() {
    let dispatcher = url_dispatcher();
    let channel =
        MockNewChannel::new("/repos/eliquious/32/issues/1/comments?verbose=true");

    let conn = dispatch(&dispatcher, &channel).await;

    assert!(channel.was_accepted());
    assert!(channel.rejections().is_empty());
    assert_eq!(
        channel.channel().written(),
        b"owner=eliquious;repo=32;number=1;verbose=true"
    );
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_case_corrected_path_still_routes() {
    let mut router = Router::new();
    router.register("/Echo", Arc::new(EchoHandler)).unwrap();
    let dispatcher = UrlDispatcher::new(router);

    let channel = MockNewChannel::new("/Echo");
    channel.channel().push_read("hi");
    let conn = dispatch(&dispatcher, &channel).await;

    assert!(channel.was_accepted());
    assert_eq!(channel.channel().written(), b"hi");
    assert_eq!(conn.close_count(), 1);
}

// ============================================================================
// SimpleDispatcher
// ============================================================================

#[tokio::test]
async fn test_simple_dispatcher_exact_match() {
    let mut dispatcher = SimpleDispatcher::new();
    dispatcher.register("session", Arc::new(EchoHandler));

    let channel = MockNewChannel::new("session");
    channel.channel().push_read("data");
    let conn = dispatch(&dispatcher, &channel).await;

    assert!(channel.was_accepted());
    assert_eq!(channel.channel().written(), b"data");
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_simple_dispatcher_does_not_interpret_uris() {
    let mut dispatcher = SimpleDispatcher::new();
    dispatcher.register("session", Arc::new(EchoHandler));

    // a URL dispatcher would route this; the simple one matches literally
    let channel = MockNewChannel::new("session?x=1");
    let conn = dispatch(&dispatcher, &channel).await;

    assert!(!channel.was_accepted());
    assert_eq!(
        channel.rejections(),
        vec![(RejectionReason::UnknownChannelType, "session?x=1".to_string())]
    );
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_simple_dispatcher_not_found_handler() {
    let dispatcher = SimpleDispatcher::new().with_not_found(Arc::new(EchoHandler));

    let channel = MockNewChannel::new("anything");
    channel.channel().push_read("still served");
    let conn = dispatch(&dispatcher, &channel).await;

    assert!(channel.was_accepted());
    assert_eq!(channel.channel().written(), b"still served");
    assert_eq!(conn.close_count(), 1);
}

#[tokio::test]
async fn test_simple_dispatcher_handler_error() {
    let mut dispatcher = SimpleDispatcher::new();
    dispatcher.register("bad", Arc::new(BadHandler));

    let channel = MockNewChannel::new("bad");
    let conn = dispatch(&dispatcher, &channel).await;

    assert_eq!(
        channel.rejections(),
        vec![(
            RejectionReason::ChannelHandleError,
            "error handling channel: an error occurred".to_string()
        )]
    );
    assert_eq!(conn.close_count(), 1);
}
