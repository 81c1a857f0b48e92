//! Cooperative shutdown primitives
//!
//! Every blocking point in the framework observes a `ShutdownToken`. The
//! controller side lives with whoever owns the scope (the embedding
//! application for the server, a supervisor for its connection). Dropping
//! a controller cancels its tokens, so an abandoned scope can never wedge
//! its children.

use tokio::sync::watch;

/// Owning side of a shutdown scope.
#[derive(Debug)]
pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// A token observing this controller.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Cancel the scope. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a shutdown scope. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Whether the scope has been cancelled (or its controller dropped).
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves when the scope is cancelled. Safe to call from any number
    /// of tasks concurrently.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // controller dropped; the scope is gone
                return;
            }
        }
    }
}
