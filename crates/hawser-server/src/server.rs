//! Server lifecycle and the acceptor loop

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use hawser_core::ShutdownToken;

use crate::config::Config;
use crate::error::ServerError;
use crate::supervisor::{self, Shared};
use crate::task::TaskGroup;

/// The embeddable SSH server.
///
/// `new` validates the configuration and binds the listener; `start` is
/// non-blocking and spawns the accept loop; `stop` cancels the scope and
/// joins the acceptor, every connection supervisor, and every in-flight
/// channel handler before returning.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use hawser_core::ShutdownController;
/// use hawser_router::Router;
/// use hawser_server::{Config, Server, UrlDispatcher};
/// use hawser_transport::mock::{MockServerTransport, MockSigner};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let shutdown = ShutdownController::new();
/// let router = Router::new();
///
/// let config = Config {
///     bind: "127.0.0.1:2022".to_string(),
///     deadline: Duration::from_secs(1),
///     transport: Arc::new(MockServerTransport::new()),
///     host_key: Arc::new(MockSigner::new()),
///     password_callback: None,
///     public_key_callback: None,
///     auth_log_callback: None,
///     dispatcher: Arc::new(UrlDispatcher::new(router)),
///     consumer: None,
///     shutdown: shutdown.token(),
/// };
///
/// let mut server = Server::new(config).await?;
/// server.start();
/// // ... serve ...
/// server.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    addr: SocketAddr,
    deadline: Duration,
    listener: Option<TcpListener>,
    shared: Arc<Shared>,
    group: TaskGroup,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("addr", &self.addr)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Validate the configuration and bind the listener. All failures are
    /// fatal and returned to the caller.
    pub async fn new(config: Config) -> Result<Self, ServerError> {
        if config.bind.is_empty() {
            return Err(ServerError::Config("empty bind address".to_string()));
        }

        let listener = TcpListener::bind(&config.bind)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind.clone(),
                source,
            })?;
        let addr = listener.local_addr()?;

        let shared = Arc::new(Shared {
            transport: config.transport.clone(),
            handshake: config.handshake_config(),
            dispatcher: config.dispatcher.clone(),
            consumer: config.consumer.clone(),
        });

        Ok(Self {
            addr,
            deadline: config.deadline,
            listener: Some(listener),
            shared,
            group: TaskGroup::with_parent(&config.shutdown),
        })
    }

    /// The address the listener is bound to. Useful with a `:0` bind.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start accepting connections. Non-blocking; a second call is a
    /// no-op.
    pub fn start(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        info!(addr = %self.addr, "starting ssh server");

        let shared = self.shared.clone();
        let deadline = self.deadline;
        let token = self.group.token();
        self.group
            .spawn(accept_loop(listener, deadline, shared, token));
    }

    /// Stop the server and wait for every task it owns. Blocking and
    /// idempotent.
    pub async fn stop(&mut self) {
        info!(addr = %self.addr, "shutting down ssh server");
        self.group.cancel();
        self.group.wait().await;
    }
}

/// Accept connections until the scope is cancelled, spawning a supervisor
/// per connection. Accept calls are bounded by the configured deadline so
/// shutdown is observed promptly; a lapsed deadline is routine.
async fn accept_loop(
    listener: TcpListener,
    deadline: Duration,
    shared: Arc<Shared>,
    token: ShutdownToken,
) {
    let mut conns = TaskGroup::with_parent(&token);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("accept loop cancelled");
                break;
            }
            accepted = timeout(deadline, listener.accept()) => match accepted {
                Err(_) => {
                    debug!("accept deadline lapsed");
                }
                Ok(Ok((stream, peer))) => {
                    info!(%peer, "accepted tcp connection");
                    let shared = shared.clone();
                    let child = conns.token();
                    conns.spawn(supervisor::supervise(stream, peer, shared, child));
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "accept failed");
                }
            }
        }
    }

    conns.cancel();
    conns.wait().await;
    // dropping the listener closes it
}
