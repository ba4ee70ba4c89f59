//! CLI output formatting: batch summary and media metadata.

use std::time::Duration;

use mediafetch_core::backend::{MediaInfo, RetrievalError};
use mediafetch_core::batch::BatchReport;

const RULE_WIDTH: usize = 50;

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

/// Summary lines for a finished batch, failures listed in completion order.
pub(crate) fn summary_lines(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![
        "=".repeat(RULE_WIDTH),
        "Batch summary".to_string(),
        format!("  Total:     {}", report.total()),
        format!("  Succeeded: {}", report.successful()),
        format!("  Failed:    {}", report.failed()),
        format!(
            "  Elapsed:   {} ({} workers)",
            format_elapsed(report.total_elapsed()),
            report.workers()
        ),
        format!(
            "  Task time: {}",
            format_elapsed(report.cumulative_task_time())
        ),
    ];

    if report.failed() > 0 {
        lines.push("Failures:".to_string());
        for failure in report.failures() {
            let reason = failure
                .error()
                .map_or_else(|| "unknown error".to_string(), RetrievalError::to_string);
            lines.push(format!("  - {} ({reason})", failure.url()));
        }
    }
    lines.push("=".repeat(RULE_WIDTH));
    lines
}

pub(crate) fn print_summary(report: &BatchReport) {
    for line in summary_lines(report) {
        println!("{line}");
    }
}

/// Metadata block for one URL.
pub(crate) fn media_info_lines(url: &str, info: &MediaInfo) -> Vec<String> {
    let mut lines = vec![format!("Media info for {url}")];
    lines.extend(
        info.display_fields()
            .into_iter()
            .map(|(label, value)| format!("  {label}: {value}")),
    );
    lines
}

pub(crate) fn print_media_info(url: &str, outcome: &Result<MediaInfo, RetrievalError>) {
    match outcome {
        Ok(info) => {
            for line in media_info_lines(url, info) {
                println!("{line}");
            }
        }
        Err(error) => println!("Could not read media info for {url}: {error}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mediafetch_core::batch::{ResultAggregator, RetrievalResult, WorkerId};

    use super::*;

    #[test]
    fn test_summary_lists_failure_reasons() {
        let aggregator = ResultAggregator::new(2).with_workers(2);
        aggregator.record(RetrievalResult::succeeded(
            "https://a.test/1",
            0,
            Duration::from_millis(30),
            WorkerId::new(1),
            MediaInfo::default(),
        ));
        aggregator.record(RetrievalResult::failed(
            "https://a.test/2",
            1,
            Duration::from_millis(10),
            WorkerId::new(2),
            RetrievalError::network("connection refused"),
        ));
        let lines = summary_lines(&aggregator.finalize());

        assert!(lines.iter().any(|l| l == "  Succeeded: 1"));
        assert!(lines.iter().any(|l| l == "  Failed:    1"));
        assert!(lines.iter().any(|l| l == "  Task time: 0.0s"));
        assert!(
            lines
                .iter()
                .any(|l| l.contains("https://a.test/2") && l.contains("connection refused"))
        );
    }

    #[test]
    fn test_summary_for_empty_report_has_no_failure_section() {
        let lines = summary_lines(&ResultAggregator::new(0).finalize());
        assert!(lines.iter().any(|l| l == "  Total:     0"));
        assert!(!lines.iter().any(|l| l == "Failures:"));
    }

    #[test]
    fn test_media_info_lines() {
        let info = MediaInfo {
            title: Some("Clip".to_string()),
            format_count: 3,
            ..MediaInfo::default()
        };
        let lines = media_info_lines("https://a.test", &info);
        assert_eq!(lines[0], "Media info for https://a.test");
        assert!(lines.contains(&"  Title: Clip".to_string()));
        assert!(lines.contains(&"  Formats: 3".to_string()));
        assert!(lines.contains(&"  Uploader: Unknown".to_string()));
    }
}
