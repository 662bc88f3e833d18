//! Cooperative cancellation for exchanges.

use tokio::sync::watch;

/// Triggers cancellation of every [`Cancellation`] derived from it.
///
/// Dropping the handle without calling [`CancelHandle::cancel`] does not
/// cancel anything.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observes a [`CancelHandle`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

/// Creates a linked handle/context pair.
pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, Cancellation { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn context(&self) -> Cancellation {
        Cancellation {
            rx: self.tx.subscribe(),
        }
    }
}

impl Cancellation {
    /// A context that is never cancelled.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested. Never resolves if the
    /// handle was dropped uncancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            let cancelled = *rx.borrow_and_update();
            if cancelled {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
