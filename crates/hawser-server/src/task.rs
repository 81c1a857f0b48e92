//! Task supervision
//!
//! A `TaskGroup` is a structured-concurrency scope: it spawns tasks, lets
//! the owner (or an ancestor scope) cancel them, and joins every child
//! before `wait` returns. Supervisors use one per connection; the server
//! uses one for the acceptor and one for the set of live connections.

use std::future::Future;
use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tracing::error;

use hawser_core::{ShutdownController, ShutdownToken};

/// A cancellable scope owning a set of tasks.
pub struct TaskGroup {
    controller: Arc<ShutdownController>,
    tasks: JoinSet<()>,
    relay: Option<JoinHandle<()>>,
}

impl TaskGroup {
    /// A root scope with no parent.
    pub fn new() -> Self {
        Self {
            controller: Arc::new(ShutdownController::new()),
            tasks: JoinSet::new(),
            relay: None,
        }
    }

    /// A scope that is additionally cancelled whenever `parent` is.
    pub fn with_parent(parent: &ShutdownToken) -> Self {
        let mut group = Self::new();
        let parent = parent.clone();
        let controller = group.controller.clone();
        let own = controller.token();
        group.relay = Some(tokio::spawn(async move {
            tokio::select! {
                _ = parent.cancelled() => controller.cancel(),
                _ = own.cancelled() => {}
            }
        }));
        group
    }

    /// Token observing this scope.
    pub fn token(&self) -> ShutdownToken {
        self.controller.token()
    }

    /// Spawn a task into the scope.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(future);
    }

    /// Cancel the scope. Running tasks observe it through their token;
    /// none are forcibly aborted.
    pub fn cancel(&self) {
        self.controller.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.controller.is_cancelled()
    }

    /// Join every task in the scope. A panicked task is logged and does
    /// not take its siblings down.
    pub async fn wait(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    error!("task panicked: {}", e);
                }
            }
        }
        if let Some(relay) = self.relay.take() {
            relay.abort();
        }
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_wait_joins_all_tasks() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut group = TaskGroup::new();
        for _ in 0..4 {
            let done = done.clone();
            group.spawn(async move {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        group.wait().await;
        assert_eq!(done.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_cancel_unblocks_tasks() {
        let mut group = TaskGroup::new();
        let token = group.token();
        group.spawn(async move { token.cancelled().await });

        group.cancel();
        timeout(Duration::from_secs(1), group.wait())
            .await
            .expect("wait timed out");
    }

    #[tokio::test]
    async fn test_parent_cancellation_propagates() {
        let mut parent = TaskGroup::new();
        let mut child = TaskGroup::with_parent(&parent.token());
        let token = child.token();
        child.spawn(async move { token.cancelled().await });

        parent.cancel();
        timeout(Duration::from_secs(1), child.wait())
            .await
            .expect("child wait timed out");
        parent.wait().await;
    }

    #[tokio::test]
    async fn test_panicked_task_does_not_poison_the_group() {
        let survived = Arc::new(AtomicUsize::new(0));
        let mut group = TaskGroup::new();
        group.spawn(async { panic!("child task panic") });
        let counter = survived.clone();
        group.spawn(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        group.wait().await;
        assert_eq!(survived.load(Ordering::SeqCst), 1);
    }
}
