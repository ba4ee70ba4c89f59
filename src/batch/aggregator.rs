//! Thread-safe collection of task results into a [`BatchReport`].

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

use super::task::RetrievalResult;

/// Final outcome of a batch, results in completion order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    results: Vec<RetrievalResult>,
    successful: usize,
    failed: usize,
    total_elapsed: Duration,
    workers: usize,
}

impl BatchReport {
    /// Results in the order they completed, not submission order.
    #[must_use]
    pub fn results(&self) -> &[RetrievalResult] {
        &self.results
    }

    #[must_use]
    pub fn successful(&self) -> usize {
        self.successful
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Returns successful + failed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.successful + self.failed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Wall time from batch start to finalisation.
    #[must_use]
    pub fn total_elapsed(&self) -> Duration {
        self.total_elapsed
    }

    /// Number of workers the dispatcher spawned.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn successes(&self) -> impl Iterator<Item = &RetrievalResult> {
        self.results.iter().filter(|result| result.success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &RetrievalResult> {
        self.results.iter().filter(|result| !result.success())
    }

    /// Duration of the slowest task, if any ran.
    #[must_use]
    pub fn longest_task(&self) -> Option<Duration> {
        self.results.iter().map(RetrievalResult::duration).max()
    }

    /// Sum of all task durations (exceeds `total_elapsed` when tasks overlap).
    #[must_use]
    pub fn cumulative_task_time(&self) -> Duration {
        self.results.iter().map(RetrievalResult::duration).sum()
    }
}

#[derive(Debug, Default)]
struct AggregatorState {
    results: Vec<RetrievalResult>,
    seen: HashSet<usize>,
    successful: usize,
    failed: usize,
}

/// Collects results from concurrent workers.
///
/// Each [`record`](Self::record) call is atomic with respect to the others:
/// the result vector and both counters change under one lock. A result for
/// a task index that was already recorded is rejected, so nothing is counted
/// twice.
#[derive(Debug)]
pub struct ResultAggregator {
    expected: usize,
    workers: usize,
    started: Instant,
    state: Mutex<AggregatorState>,
    report: OnceLock<BatchReport>,
}

impl ResultAggregator {
    /// Starts the batch clock for `expected` tasks.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            workers: 0,
            started: Instant::now(),
            state: Mutex::new(AggregatorState::default()),
            report: OnceLock::new(),
        }
    }

    /// Records the number of workers serving this batch in the report.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    fn lock_state(&self) -> MutexGuard<'_, AggregatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a result and updates the counts.
    ///
    /// Returns false (and records nothing) if the task index was already
    /// recorded or the report has been finalised.
    pub fn record(&self, result: RetrievalResult) -> bool {
        self.record_with(result, |_, _| {})
    }

    /// Like [`record`](Self::record), then calls `on_recorded` with the stored
    /// result and the new recorded count before the lock is released.
    ///
    /// Callbacks therefore run in report order and see strictly increasing
    /// counts. `on_recorded` must not call back into this aggregator.
    pub fn record_with<F>(&self, result: RetrievalResult, on_recorded: F) -> bool
    where
        F: FnOnce(&RetrievalResult, usize),
    {
        let mut state = self.lock_state();

        if self.report.get().is_some() {
            warn!(
                url = %result.url(),
                index = result.index(),
                "result arrived after finalisation; ignored"
            );
            return false;
        }
        if !state.seen.insert(result.index()) {
            warn!(
                url = %result.url(),
                index = result.index(),
                "duplicate result ignored"
            );
            return false;
        }

        if result.success() {
            state.successful += 1;
        } else {
            state.failed += 1;
        }
        state.results.push(result);
        let recorded = state.results.len();
        if let Some(stored) = state.results.last() {
            on_recorded(stored, recorded);
        }
        true
    }

    /// Returns (recorded, expected).
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        (self.lock_state().results.len(), self.expected)
    }

    /// Returns true once every expected task has a result.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        let (recorded, expected) = self.progress();
        recorded >= expected
    }

    /// Task indices below `expected` that have no result yet.
    #[must_use]
    pub fn missing_indices(&self) -> Vec<usize> {
        let state = self.lock_state();
        (0..self.expected)
            .filter(|index| !state.seen.contains(index))
            .collect()
    }

    /// Builds the report. Later calls return the same report.
    #[must_use]
    pub fn finalize(&self) -> BatchReport {
        let state = self.lock_state();
        self.report
            .get_or_init(|| BatchReport {
                results: state.results.clone(),
                successful: state.successful,
                failed: state.failed,
                total_elapsed: self.started.elapsed(),
                workers: self.workers,
            })
            .clone()
    }
}
