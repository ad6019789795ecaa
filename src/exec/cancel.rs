// src/exec/cancel.rs

//! Cancellation token shared between a job's worker and whoever may stop it.
//!
//! Any clone of [`CancelSignal`] can trigger it; the worker waits on a
//! [`CancelListener`]. Triggering is idempotent.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn listener(&self) -> CancelListener {
        CancelListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CancelListener {
    rx: watch::Receiver<bool>,
}

impl CancelListener {
    /// Resolves once the signal has been triggered.
    ///
    /// Cancel safe. Never resolves if every `CancelSignal` was dropped
    /// without triggering.
    pub async fn cancelled(&mut self) {
        let fired = self.rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
        if fired.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn listener_wakes_on_trigger() {
        let signal = CancelSignal::new();
        let mut listener = signal.listener();
        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.trigger();
        });
        tokio::time::timeout(Duration::from_secs(1), listener.cancelled())
            .await
            .expect("listener should fire");
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn listener_created_after_trigger_fires_immediately() {
        let signal = CancelSignal::new();
        signal.trigger();
        signal.trigger();
        let mut listener = signal.listener();
        tokio::time::timeout(Duration::from_millis(100), listener.cancelled())
            .await
            .expect("already cancelled");
    }

    #[tokio::test]
    async fn dropped_signal_never_fires() {
        let signal = CancelSignal::new();
        let mut listener = signal.listener();
        drop(signal);
        let res = tokio::time::timeout(Duration::from_millis(50), listener.cancelled()).await;
        assert!(res.is_err());
    }
}
