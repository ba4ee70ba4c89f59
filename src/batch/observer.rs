//! Observability sinks for batch execution.
//!
//! The dispatcher never logs batch progress directly; it reports
//! [`BatchEvent`]s to an injected [`BatchObserver`]. Observers are called
//! from worker tasks and must not block.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::aggregator::BatchReport;
use super::task::{RetrievalResult, WorkerId};

/// Something that happened during a batch.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    /// Workers are about to start.
    BatchStarted { total: usize, workers: usize },
    /// A worker claimed a task.
    TaskStarted {
        worker: WorkerId,
        index: usize,
        url: &'a str,
    },
    /// A task produced its result. `completed` counts results recorded so far.
    TaskFinished {
        result: &'a RetrievalResult,
        completed: usize,
        total: usize,
    },
    /// The report has been finalised.
    BatchFinished { report: &'a BatchReport },
}

/// Receives batch events as they happen, in completion order.
pub trait BatchObserver: Send + Sync {
    fn on_event(&self, event: &BatchEvent<'_>);
}

/// Emits every event as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl BatchObserver for TracingObserver {
    fn on_event(&self, event: &BatchEvent<'_>) {
        match event {
            BatchEvent::BatchStarted { total, workers } => {
                info!(total, workers, "starting batch");
            }
            BatchEvent::TaskStarted { worker, index, url } => {
                debug!(%worker, index, %url, "task started");
            }
            BatchEvent::TaskFinished {
                result,
                completed,
                total,
            } => match result.error() {
                None => info!(
                    worker = %result.worker(),
                    url = %result.url(),
                    elapsed_ms = result.duration().as_millis(),
                    completed,
                    total,
                    "retrieval succeeded"
                ),
                Some(error) => warn!(
                    worker = %result.worker(),
                    url = %result.url(),
                    kind = %error.kind(),
                    error = %error.message(),
                    completed,
                    total,
                    "retrieval failed"
                ),
            },
            BatchEvent::BatchFinished { report } => {
                info!(
                    successful = report.successful(),
                    failed = report.failed(),
                    elapsed_ms = report.total_elapsed().as_millis(),
                    "batch finished"
                );
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {
    fn on_event(&self, _event: &BatchEvent<'_>) {}
}

/// Forwards each finished result into an unbounded channel.
///
/// Sending never blocks; if the receiver was dropped, results are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<RetrievalResult>,
}

impl ChannelObserver {
    /// Creates the observer and the receiving half of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RetrievalResult>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl BatchObserver for ChannelObserver {
    fn on_event(&self, event: &BatchEvent<'_>) {
        if let BatchEvent::TaskFinished { result, .. } = event {
            // Receiver gone means nobody is listening any more.
            let _ = self.sender.send((*result).clone());
        }
    }
}

/// Delivers every event to several observers, in order.
#[derive(Default, Clone)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn BatchObserver>>,
}

impl FanoutObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl std::fmt::Debug for FanoutObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl BatchObserver for FanoutObserver {
    fn on_event(&self, event: &BatchEvent<'_>) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
