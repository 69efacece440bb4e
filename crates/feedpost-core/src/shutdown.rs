//! Shutdown signalling shared by the background loops.
//!
//! The process owns a `watch::Sender<bool>`; every loop, spawned task and
//! in-flight network call holds a [`Shutdown`] cloned from the receiver and
//! races its work against [`Shutdown::triggered`].

use std::future::Future;

use tokio::sync::watch;

use crate::{Error, Result};

/// Create a connected shutdown trigger and listener
pub fn channel() -> (watch::Sender<bool>, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (tx, Shutdown::new(rx))
}

/// Cloneable listener for the process-wide shutdown signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// A listener that never fires, for one-shot commands and tests
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // A closed channel never fires
        drop(tx);
        Self { rx }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been requested.
    ///
    /// If the sender is dropped without ever signalling, this never resolves.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run `fut` unless shutdown fires first, in which case `Error::Cancelled` is returned
    pub async fn run_until<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let mut listener = self.clone();
        if listener.is_triggered() {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            _ = listener.triggered() => Err(Error::Cancelled),
            result = fut => result,
        }
    }
}
