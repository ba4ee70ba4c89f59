//! Batch dispatcher: runs retrieval tasks across a bounded worker pool.
//!
//! A fixed number of tokio worker tasks share one FIFO queue. Each worker
//! claims the next task, resolves its configuration, calls the backend under
//! the per-task timeout and records the outcome. Backend errors, timeouts and
//! panics all become failed [`RetrievalResult`]s, so one bad URL never stops
//! the batch.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mediafetch_core::backend::YtDlpBackend;
//! use mediafetch_core::batch::{BatchDispatcher, RetrievalTask};
//! use mediafetch_core::policy::PolicyResolver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(YtDlpBackend::from_path("downloads")?);
//! let dispatcher = BatchDispatcher::new(backend, Arc::new(PolicyResolver::default()));
//! let tasks = RetrievalTask::from_urls(["https://videa.hu/videok/1", "https://vimeo.com/2"]);
//! let report = dispatcher.run_batch(tasks, 3).await;
//! println!("{} succeeded, {} failed", report.successful(), report.failed());
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tracing::{debug, instrument, warn};

use super::aggregator::{BatchReport, ResultAggregator};
use super::observer::{BatchEvent, BatchObserver, TracingObserver};
use super::task::{RetrievalResult, RetrievalTask, WorkerId};
use crate::backend::{MediaInfo, RetrievalBackend, RetrievalError};
use crate::policy::PolicyResolver;

/// Minimum number of workers.
pub const MIN_WORKERS: usize = 1;

/// Maximum number of workers.
pub const MAX_WORKERS: usize = 5;

/// Worker count used when none is configured.
pub const DEFAULT_WORKERS: usize = 3;

/// Per-task timeout used when none is configured.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Clamps a requested worker count into `MIN_WORKERS..=MAX_WORKERS`.
#[must_use]
pub fn clamp_workers(requested: usize) -> usize {
    requested.clamp(MIN_WORKERS, MAX_WORKERS)
}

/// Tunables for [`BatchDispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherOptions {
    /// Upper bound on one backend call. `None` disables the limit.
    pub task_timeout: Option<Duration>,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            task_timeout: Some(DEFAULT_TASK_TIMEOUT),
        }
    }
}

impl DispatcherOptions {
    /// Builds options from a timeout in seconds, where 0 disables it.
    #[must_use]
    pub fn from_timeout_secs(secs: u64) -> Self {
        Self {
            task_timeout: (secs > 0).then(|| Duration::from_secs(secs)),
        }
    }
}

type PendingQueue = Mutex<VecDeque<(usize, RetrievalTask)>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs batches of retrieval tasks against a backend.
///
/// The dispatcher is reusable: every `run_batch` call builds its own queue
/// and aggregator.
pub struct BatchDispatcher {
    backend: Arc<dyn RetrievalBackend>,
    resolver: Arc<PolicyResolver>,
    observer: Arc<dyn BatchObserver>,
    options: DispatcherOptions,
}

impl fmt::Debug for BatchDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchDispatcher")
            .field("backend", &self.backend.name())
            .field("resolver", &self.resolver)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BatchDispatcher {
    /// Creates a dispatcher reporting to a [`TracingObserver`].
    #[must_use]
    pub fn new(backend: Arc<dyn RetrievalBackend>, resolver: Arc<PolicyResolver>) -> Self {
        Self {
            backend,
            resolver,
            observer: Arc::new(TracingObserver),
            options: DispatcherOptions::default(),
        }
    }

    /// Replaces the observer that receives batch events.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: DispatcherOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn options(&self) -> DispatcherOptions {
        self.options
    }

    #[must_use]
    pub fn resolver(&self) -> &PolicyResolver {
        &self.resolver
    }

    /// Runs every task and returns the finalised report.
    ///
    /// `concurrency` is clamped to `MIN_WORKERS..=MAX_WORKERS` and further
    /// capped at the number of tasks. The report holds exactly one result
    /// per task, in completion order.
    #[instrument(skip(self, tasks), fields(tasks = tasks.len(), backend = self.backend.name()))]
    pub async fn run_batch(&self, tasks: Vec<RetrievalTask>, concurrency: usize) -> BatchReport {
        let total = tasks.len();
        if total == 0 {
            debug!("empty batch; no workers spawned");
            let report = ResultAggregator::new(0).finalize();
            self.notify(&BatchEvent::BatchStarted {
                total: 0,
                workers: 0,
            });
            self.notify(&BatchEvent::BatchFinished { report: &report });
            return report;
        }

        let clamped = clamp_workers(concurrency);
        if clamped != concurrency {
            warn!(
                requested = concurrency,
                clamped, "worker count out of range; clamped"
            );
        }
        let workers = clamped.min(total);

        let urls: Vec<String> = tasks.iter().map(|task| task.url().to_string()).collect();
        let queue: Arc<PendingQueue> =
            Arc::new(Mutex::new(tasks.into_iter().enumerate().collect()));
        let aggregator = Arc::new(ResultAggregator::new(total).with_workers(workers));

        self.notify(&BatchEvent::BatchStarted { total, workers });

        let mut handles = Vec::with_capacity(workers);
        for number in 1..=workers {
            let worker = self.worker(WorkerId::new(number), &queue, &aggregator);
            handles.push(tokio::spawn(worker.run()));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker terminated abnormally");
            }
        }

        if !aggregator.is_complete() {
            self.recover(&queue, &aggregator, &urls).await;
        }

        let report = aggregator.finalize();
        self.notify(&BatchEvent::BatchFinished { report: &report });
        report
    }

    fn worker(
        &self,
        id: WorkerId,
        queue: &Arc<PendingQueue>,
        aggregator: &Arc<ResultAggregator>,
    ) -> Worker {
        Worker {
            id,
            queue: Arc::clone(queue),
            aggregator: Arc::clone(aggregator),
            backend: Arc::clone(&self.backend),
            resolver: Arc::clone(&self.resolver),
            observer: Arc::clone(&self.observer),
            timeout: self.options.task_timeout,
        }
    }

    /// Completes a batch whose workers died before finishing.
    ///
    /// Tasks still queued run on the dispatcher, so they get the same attempt
    /// they would have had with a healthy pool. Only tasks a dead worker had
    /// already claimed are recorded as failed without a retry.
    async fn recover(
        &self,
        queue: &Arc<PendingQueue>,
        aggregator: &Arc<ResultAggregator>,
        urls: &[String],
    ) {
        let leftover = lock(queue).len();
        if leftover > 0 {
            warn!(leftover, "workers exited with tasks queued; draining on the dispatcher");
            let fallback = self.worker(WorkerId::DISPATCHER, queue, aggregator);
            if let Err(payload) = AssertUnwindSafe(fallback.run()).catch_unwind().await {
                warn!(
                    panic = panic_message(payload.as_ref()),
                    "dispatcher drain panicked"
                );
            }
        }

        for index in aggregator.missing_indices() {
            let url = urls.get(index).cloned().unwrap_or_default();
            warn!(index, %url, "task never completed; recording as failed");
            let result = RetrievalResult::failed(
                url,
                index,
                Duration::ZERO,
                WorkerId::DISPATCHER,
                RetrievalError::other("worker terminated before the task completed"),
            );
            record_and_notify(aggregator, self.observer.as_ref(), result);
        }
    }

    fn notify(&self, event: &BatchEvent<'_>) {
        notify(self.observer.as_ref(), event);
    }

    /// Fetches metadata for each URL in order, without writing artifacts.
    ///
    /// Lookups run one at a time under the same timeout and panic isolation
    /// as [`run_batch`](Self::run_batch).
    #[instrument(skip(self, urls), fields(urls = urls.len()))]
    pub async fn inspect_all(
        &self,
        urls: &[String],
    ) -> Vec<(String, Result<MediaInfo, RetrievalError>)> {
        let mut outcomes = Vec::with_capacity(urls.len());

        for url in urls {
            let task = RetrievalTask::new(url.as_str());
            let outcome = match task.validate() {
                Ok(()) => {
                    guarded(self.backend.inspect(url), self.options.task_timeout).await
                }
                Err(error) => Err(error),
            };
            if let Err(error) = &outcome {
                warn!(
                    %url,
                    kind = %error.kind(),
                    error = %error.message(),
                    "metadata lookup failed"
                );
            }
            outcomes.push((url.clone(), outcome));
        }

        outcomes
    }
}

/// One worker's share of a batch.
struct Worker {
    id: WorkerId,
    queue: Arc<PendingQueue>,
    aggregator: Arc<ResultAggregator>,
    backend: Arc<dyn RetrievalBackend>,
    resolver: Arc<PolicyResolver>,
    observer: Arc<dyn BatchObserver>,
    timeout: Option<Duration>,
}

impl Worker {
    async fn run(self) {
        loop {
            let next = lock(&self.queue).pop_front();
            let Some((index, task)) = next else {
                break;
            };

            notify(
                self.observer.as_ref(),
                &BatchEvent::TaskStarted {
                    worker: self.id,
                    index,
                    url: task.url(),
                },
            );
            let result = self.execute(index, &task).await;
            record_and_notify(&self.aggregator, self.observer.as_ref(), result);
        }
        debug!(worker = %self.id, "queue drained; worker exiting");
    }

    async fn execute(&self, index: usize, task: &RetrievalTask) -> RetrievalResult {
        let started = Instant::now();

        let outcome = match task.validate() {
            Ok(()) => {
                let config = self.resolver.resolve_with(task.url(), task.options());
                debug!(
                    worker = %self.id,
                    url = %task.url(),
                    policy = config.policy().unwrap_or("baseline"),
                    format = config.format(),
                    "resolved retrieval config"
                );
                guarded(self.backend.retrieve(task.url(), &config), self.timeout).await
            }
            Err(error) => Err(error),
        };

        let duration = started.elapsed();
        match outcome {
            Ok(info) => RetrievalResult::succeeded(task.url(), index, duration, self.id, info),
            Err(error) => RetrievalResult::failed(task.url(), index, duration, self.id, error),
        }
    }
}

/// Records a result and announces it under the aggregator lock, so
/// `TaskFinished` events arrive in report order with increasing counts.
fn record_and_notify(
    aggregator: &ResultAggregator,
    observer: &dyn BatchObserver,
    result: RetrievalResult,
) {
    let (_, total) = aggregator.progress();
    aggregator.record_with(result, |recorded, completed| {
        notify(
            observer,
            &BatchEvent::TaskFinished {
                result: recorded,
                completed,
                total,
            },
        );
    });
}

/// Delivers an event to the observer. A panicking observer loses the event
/// but never takes the calling worker down.
fn notify(observer: &dyn BatchObserver, event: &BatchEvent<'_>) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(event))) {
        warn!(
            panic = panic_message(payload.as_ref()),
            "batch observer panicked; event dropped"
        );
    }
}

/// Awaits a backend call, turning a timeout or panic into a [`RetrievalError`].
async fn guarded<F>(call: F, timeout: Option<Duration>) -> Result<MediaInfo, RetrievalError>
where
    F: Future<Output = Result<MediaInfo, RetrievalError>>,
{
    let call = AssertUnwindSafe(call).catch_unwind();
    let caught = match timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(caught) => caught,
            Err(_) => return Err(RetrievalError::timeout(limit)),
        },
        None => call.await,
    };

    caught.unwrap_or_else(|payload| {
        Err(RetrievalError::other(format!(
            "backend panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
