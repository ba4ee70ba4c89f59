//! Concurrent batch execution.
//!
//! # Architecture
//!
//! - [`RetrievalTask`] / [`RetrievalResult`] - one URL in, one outcome out
//! - [`BatchDispatcher`] - bounded worker pool pulling from a shared queue
//! - [`ResultAggregator`] - thread-safe collection into a [`BatchReport`]
//! - [`BatchObserver`] - injected sink for progress events

mod aggregator;
mod dispatcher;
mod observer;
mod task;

pub use aggregator::{BatchReport, ResultAggregator};
pub use dispatcher::{
    BatchDispatcher, DEFAULT_TASK_TIMEOUT, DEFAULT_WORKERS, DispatcherOptions, MAX_WORKERS,
    MIN_WORKERS, clamp_workers,
};
pub use observer::{
    BatchEvent, BatchObserver, ChannelObserver, FanoutObserver, NoopObserver, TracingObserver,
};
pub use task::{RetrievalResult, RetrievalTask, WorkerId};
