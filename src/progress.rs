//! Progress delivery and cooperative cancellation for bulk runs.
//!
//! Progress goes to an explicit sink passed into the orchestrator, so a test
//! or CLI can observe a run without any ambient event bus. Each event
//! carries its own unit identity plus the orchestrator-owned counter, so a
//! listener can render `current/total` under any delivery interleaving.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receiver for progress events.
pub trait ProgressSink<E>: Send + Sync {
    fn report(&self, event: E);
}

/// Any `Fn(E)` closure is a sink.
impl<E, F> ProgressSink<E> for F
where
    F: Fn(E) + Send + Sync,
{
    fn report(&self, event: E) {
        self(event)
    }
}

/// Discards all events.
pub struct NullSink;

impl<E> ProgressSink<E> for NullSink {
    fn report(&self, _event: E) {}
}

/// Channel-backed sink; send failures are ignored, a dropped receiver must
/// not stop a run.
pub struct ChannelSink<E>(pub tokio::sync::mpsc::UnboundedSender<E>);

impl<E: Send + Sync> ProgressSink<E> for ChannelSink<E> {
    fn report(&self, event: E) {
        let _ = self.0.send(event);
    }
}

/// Caller-initiated, best-effort abort. Once cancelled the orchestrator
/// stops issuing new units; in-flight units complete.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
