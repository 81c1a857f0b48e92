//! Routing tests over a realistic route table
//!
//! Exercises the router through its public surface with a GitHub-flavored
//! pattern set: static/param/catch-all precedence, parameter capture,
//! case-insensitive correction, and path cleaning.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use hawser_core::{QueryValues, ShutdownController};
use hawser_router::{Context, Handler, HandlerError, Params, Router, RouterError};
use hawser_transport::mock::MockChannel;
use tokio::sync::mpsc;

/// Tags the channel with its route so tests can see which handler ran.
struct TagHandler(&'static str);

#[async_trait]
impl Handler for TagHandler {
    async fn handle(&self, ctx: &mut Context) -> Result<(), HandlerError> {
        ctx.channel.write(self.0.as_bytes()).await?;
        for param in &ctx.params {
            ctx.channel
                .write(format!(" {}={}", param.key, param.value).as_bytes())
                .await?;
        }
        Ok(())
    }
}

fn github_router() -> Router {
    let mut router = Router::new();
    let patterns = [
        "/",
        "/user",
        "/user/repos",
        "/users/:user",
        "/users/:user/received_events",
        "/repos/:owner/:repo",
        "/repos/:owner/:repo/issues",
        "/repos/:owner/:repo/issues/:number",
        "/repos/:owner/:repo/issues/:number/comments",
        "/gists/:id/star",
        "/raw/*blob",
    ];
    for pattern in patterns {
        router
            .register(pattern, Arc::new(TagHandler(pattern)))
            .unwrap_or_else(|e| panic!("register {pattern}: {e}"));
    }
    router
}

fn context(path: &str) -> (Context, MockChannel, ShutdownController) {
    let scope = ShutdownController::new();
    let channel = MockChannel::new();
    let (_tx, requests) = mpsc::channel(1);
    let ctx = Context {
        path: path.to_string(),
        params: Params::new(),
        query: QueryValues::default(),
        shutdown: scope.token(),
        channel: Box::new(channel.clone()),
        requests,
    };
    (ctx, channel, scope)
}

async fn served(router: &Router, path: &str) -> String {
    let (mut ctx, channel, _scope) = context(path);
    router.handle(&mut ctx).await.expect(path);
    String::from_utf8(channel.written()).unwrap()
}

#[tokio::test]
async fn test_static_and_param_resolution() {
    let router = github_router();

    assert_eq!(served(&router, "/").await, "/");
    assert_eq!(served(&router, "/user").await, "/user");
    assert_eq!(served(&router, "/user/repos").await, "/user/repos");
    assert_eq!(
        served(&router, "/users/gopher").await,
        "/users/:user user=gopher"
    );
    assert_eq!(
        served(&router, "/repos/eliquious/hawser/issues/12").await,
        "/repos/:owner/:repo/issues/:number owner=eliquious repo=hawser number=12"
    );
}

#[tokio::test]
async fn test_static_wins_over_param_prefix() {
    let router = github_router();

    // "/user" is static; "/users/:user" starts one byte later
    assert_eq!(served(&router, "/user").await, "/user");
    assert_eq!(
        served(&router, "/users/octocat").await,
        "/users/:user user=octocat"
    );
}

#[tokio::test]
async fn test_catch_all_spans_segments() {
    let router = github_router();

    assert_eq!(
        served(&router, "/raw/main/src/lib.rs").await,
        "/raw/*blob blob=main/src/lib.rs"
    );
}

#[tokio::test]
async fn test_unroutable_paths_fail() {
    let router = github_router();

    for path in ["/nope", "/users", "/repos/owner-only", "/gists/42/fork"] {
        let (mut ctx, _, _scope) = context(path);
        assert!(
            matches!(
                router.handle(&mut ctx).await,
                Err(RouterError::UnknownChannel)
            ),
            "{path} should not route"
        );
    }
}

#[tokio::test]
async fn test_case_and_slash_correction() {
    let router = github_router();

    // wrong case
    assert_eq!(served(&router, "/USER/repos").await, "/user/repos");
    // surplus trailing slash
    assert_eq!(served(&router, "/user/").await, "/user");
    // doubled separator cleaned before the retry
    assert_eq!(served(&router, "/user//repos").await, "/user/repos");
}

#[tokio::test]
async fn test_duplicate_and_conflicting_registration() {
    let mut router = github_router();

    assert!(router
        .register("/user/repos", Arc::new(TagHandler("dup")))
        .is_err());
    assert!(router
        .register("/repos/:owner/:name", Arc::new(TagHandler("conflict")))
        .is_err());
}

#[tokio::test]
async fn test_router_is_shareable_across_tasks() {
    let counter = Arc::new(AtomicUsize::new(0));

    struct CountHandler(Arc<AtomicUsize>);

    #[async_trait]
    impl Handler for CountHandler {
        async fn handle(&self, _ctx: &mut Context) -> Result<(), HandlerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let mut router = Router::new();
    router
        .register("/hit/:n", Arc::new(CountHandler(counter.clone())))
        .unwrap();
    let router = Arc::new(router);

    let mut tasks = Vec::new();
    for i in 0..16 {
        let router = router.clone();
        tasks.push(tokio::spawn(async move {
            let (mut ctx, _, _scope) = {
                let scope = ShutdownController::new();
                let channel = MockChannel::new();
                let (_tx, requests) = mpsc::channel(1);
                (
                    Context {
                        path: format!("/hit/{i}"),
                        params: Params::new(),
                        query: QueryValues::default(),
                        shutdown: scope.token(),
                        channel: Box::new(channel.clone()),
                        requests,
                    },
                    channel,
                    scope,
                )
            };
            router.handle(&mut ctx).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), 16);
}
