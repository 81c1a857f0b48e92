//! Global request consumption

use async_trait::async_trait;
use tokio::sync::mpsc;

use hawser_transport::Request;

/// Sink for connection-level (global) SSH requests.
///
/// When a connection's supervisor starts, the request stream is handed to
/// the configured consumer; without one, requests are drained and answered
/// with failure so the peer never hangs on a reply.
#[async_trait]
pub trait RequestConsumer: Send + Sync {
    async fn consume(&self, requests: mpsc::Receiver<Request>);
}
