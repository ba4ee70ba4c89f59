//! Progress bar fed by batch events.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use mediafetch_core::batch::{BatchEvent, BatchObserver};

/// Drives an `indicatif` bar from dispatcher events.
#[derive(Debug)]
pub(crate) struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    /// Creates a visible bar, or a hidden one when `enabled` is false.
    pub(crate) fn new(enabled: bool, total: usize) -> Self {
        let bar = if enabled {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl BatchObserver for ProgressObserver {
    fn on_event(&self, event: &BatchEvent<'_>) {
        match event {
            BatchEvent::BatchStarted { total, .. } => {
                self.bar.set_length(*total as u64);
            }
            BatchEvent::TaskStarted { url, .. } => {
                self.bar.set_message(format!("Retrieving {url}"));
            }
            BatchEvent::TaskFinished { result, .. } => {
                self.bar.inc(1);
                let mark = if result.success() { "ok" } else { "failed" };
                self.bar.set_message(format!("{mark}: {}", result.url()));
            }
            BatchEvent::BatchFinished { .. } => {
                self.bar.finish_and_clear();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use mediafetch_core::backend::MediaInfo;
    use mediafetch_core::batch::{RetrievalResult, WorkerId};

    use super::*;

    #[test]
    fn test_hidden_bar_still_counts_finished_tasks() {
        let observer = ProgressObserver::new(false, 2);
        let result = RetrievalResult::succeeded(
            "https://a.test",
            0,
            Duration::ZERO,
            WorkerId::new(1),
            MediaInfo::default(),
        );
        observer.on_event(&BatchEvent::TaskFinished {
            result: &result,
            completed: 1,
            total: 2,
        });
        assert_eq!(observer.position(), 1);
    }
}
