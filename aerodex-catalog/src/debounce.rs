//! Debounce gate for fetch triggers
//!
//! Each `trigger()` restarts a single timer. Only the timer started by the
//! most recent trigger can fire; earlier ones are aborted. There is no
//! zero-delay path: a lone trigger still waits the full delay.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Coalesces bursts of fetch intents into one fire
pub struct DebounceGate {
    delay: Duration,
    /// Generation of the most recent trigger; a fire only counts if it matches
    generation: u64,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<u64>,
    rx: mpsc::UnboundedReceiver<u64>,
}

impl DebounceGate {
    pub fn new(delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            delay,
            generation: 0,
            pending: None,
            tx,
            rx,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record an intent to fetch, superseding any pending timer
    ///
    /// Must be called within a tokio runtime.
    pub fn trigger(&mut self) {
        self.abort_pending();
        self.generation += 1;

        let generation = self.generation;
        let delay = self.delay;
        let tx = self.tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(generation);
        }));
        trace!(generation, delay_ms = delay.as_millis() as u64, "Debounce timer armed");
    }

    /// Drop the pending timer so it never fires
    pub fn cancel(&mut self) {
        if self.pending.is_some() {
            trace!(generation = self.generation, "Debounce timer cancelled");
        }
        self.abort_pending();
        // invalidates a fire that was already queued before the abort
        self.generation += 1;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait until the current timer fires
    ///
    /// Never resolves while nothing is pending. Cancel-safe, so it can sit in
    /// a `tokio::select!` next to other wake sources.
    pub async fn fired(&mut self) {
        loop {
            if self.pending.is_none() {
                std::future::pending::<()>().await;
            }
            match self.rx.recv().await {
                Some(generation) if generation == self.generation => {
                    self.pending = None;
                    return;
                }
                // superseded timer that sent before being aborted
                Some(_) => continue,
                None => std::future::pending::<()>().await,
            }
        }
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for DebounceGate {
    fn drop(&mut self) {
        self.abort_pending();
    }
}
