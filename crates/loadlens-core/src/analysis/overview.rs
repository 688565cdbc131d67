use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::{stats, Statistics};
use crate::telemetry::MetricSeries;

/// Success rate (percent) below which a run fails.
pub const FAIL_SUCCESS_RATE: f64 = 90.0;
/// Success rate (percent) below which a run is flagged.
pub const WARN_SUCCESS_RATE: f64 = 95.0;
/// p95 response time (ms) above which a run fails.
pub const FAIL_P95_MS: f64 = 5000.0;
/// p95 response time (ms) above which a run is flagged.
pub const WARN_P95_MS: f64 = 3000.0;

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Verdict for the run as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Passed,
    Warning,
    Failed,
    /// No request was recorded, so there is nothing to judge.
    NoData,
}

impl RunStatus {
    /// Banner text shown at the top of the report.
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Passed => "✅ PASSED",
            RunStatus::Warning => "⚠️ WARNING",
            RunStatus::Failed => "❌ FAILED",
            RunStatus::NoData => "NO DATA",
        }
    }

    /// CSS class used by the report template.
    pub fn css_class(&self) -> &'static str {
        match self {
            RunStatus::Passed => "passed",
            RunStatus::Warning | RunStatus::NoData => "warning",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Passed => "passed",
            RunStatus::Warning => "warning",
            RunStatus::Failed => "failed",
            RunStatus::NoData => "no_data",
        };
        write!(f, "{s}")
    }
}

/// Judge a run from its success rate and response-time statistics.
pub fn overall_status(success_rate: Option<f64>, response: Option<&Statistics>) -> RunStatus {
    let Some(rate) = success_rate else {
        return RunStatus::NoData;
    };
    let p95 = response.map(|s| s.p95);

    if rate < FAIL_SUCCESS_RATE || p95.is_some_and(|p| p > FAIL_P95_MS) {
        RunStatus::Failed
    } else if rate < WARN_SUCCESS_RATE || p95.is_some_and(|p| p > WARN_P95_MS) {
        RunStatus::Warning
    } else {
        RunStatus::Passed
    }
}

// ---------------------------------------------------------------------------
// RunOverview
// ---------------------------------------------------------------------------

/// Whole-run figures derived from a [`MetricSeries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunOverview {
    /// Number of response-duration samples.
    pub total_requests: u64,
    /// Number of failure-indicator samples equal to 1.
    pub failed_requests: u64,
    /// `None` when no request was recorded.
    pub success_rate: Option<f64>,
    pub response: Option<Statistics>,
    pub iterations: u64,
    /// Highest concurrent-user gauge value, if the gauge was recorded.
    pub max_vus: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_secs: f64,
    pub requests_per_second: f64,
    pub status: RunStatus,
}

impl RunOverview {
    pub fn from_series(series: &MetricSeries) -> Self {
        let names = series.names();
        let durations = series.values(&names.duration);
        let total = durations.len() as u64;
        let failed = count_failures(series.values(&names.failed));

        let success_rate = (total > 0)
            .then(|| round_rate(total.saturating_sub(failed) as f64 / total as f64 * 100.0));
        let response = stats(durations);

        let duration_secs = match (series.first_seen(), series.last_seen()) {
            (Some(first), Some(last)) => (last - first).num_milliseconds().max(0) as f64 / 1000.0,
            _ => 0.0,
        };
        let requests_per_second = if duration_secs > 0.0 {
            total as f64 / duration_secs
        } else {
            0.0
        };

        let max_vus = series
            .values(&names.vus)
            .iter()
            .copied()
            .reduce(f64::max);

        Self {
            total_requests: total,
            failed_requests: failed,
            success_rate,
            status: overall_status(success_rate, response.as_ref()),
            response,
            iterations: series.values(&names.iterations).len() as u64,
            max_vus,
            started_at: series.first_seen(),
            finished_at: series.last_seen(),
            duration_secs,
            requests_per_second,
        }
    }

    /// Failed requests as a percentage of all requests.
    pub fn failure_rate(&self) -> Option<f64> {
        (self.total_requests > 0)
            .then(|| self.failed_requests as f64 / self.total_requests as f64 * 100.0)
    }
}

/// Round a percentage to the two decimals it is displayed with, so the
/// status and the narrative judge the same number the reader sees.
pub fn round_rate(pct: f64) -> f64 {
    (pct * 100.0).round() / 100.0
}

/// Failure-indicator samples carry 1 for a failed request and 0 otherwise.
pub(crate) fn count_failures(values: &[f64]) -> u64 {
    values.iter().filter(|&&v| v == 1.0).count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{MetricNames, Observation};
    use chrono::TimeZone;

    fn stats_with_p95(p95: f64) -> Statistics {
        Statistics {
            count: 1,
            min: p95,
            max: p95,
            avg: p95,
            p50: p95,
            p90: p95,
            p95,
            p99: p95,
        }
    }

    fn point(metric: &str, secs: i64, value: f64) -> Observation {
        Observation {
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            metric: metric.to_string(),
            value,
            tags: Default::default(),
        }
    }

    // -----------------------------------------------------------------------
    // overall_status
    // -----------------------------------------------------------------------

    #[test]
    fn status_passed_when_healthy() {
        assert_eq!(overall_status(Some(99.5), Some(&stats_with_p95(800.0))), RunStatus::Passed);
    }

    #[test]
    fn status_warning_on_success_rate_between_cutoffs() {
        assert_eq!(overall_status(Some(92.0), Some(&stats_with_p95(100.0))), RunStatus::Warning);
    }

    #[test]
    fn status_warning_on_p95_above_three_seconds() {
        assert_eq!(overall_status(Some(100.0), Some(&stats_with_p95(3000.1))), RunStatus::Warning);
    }

    #[test]
    fn status_failed_on_low_success_rate() {
        assert_eq!(overall_status(Some(89.99), Some(&stats_with_p95(10.0))), RunStatus::Failed);
    }

    #[test]
    fn status_failed_on_p95_above_five_seconds() {
        assert_eq!(overall_status(Some(100.0), Some(&stats_with_p95(5001.0))), RunStatus::Failed);
    }

    #[test]
    fn status_boundaries_are_inclusive_on_the_good_side() {
        assert_eq!(overall_status(Some(95.0), Some(&stats_with_p95(3000.0))), RunStatus::Passed);
        assert_eq!(overall_status(Some(90.0), Some(&stats_with_p95(5000.0))), RunStatus::Warning);
    }

    #[test]
    fn status_no_data_without_success_rate() {
        assert_eq!(overall_status(None, None), RunStatus::NoData);
    }

    #[test]
    fn status_labels_and_classes() {
        assert_eq!(RunStatus::Passed.label(), "✅ PASSED");
        assert_eq!(RunStatus::Failed.css_class(), "failed");
        assert_eq!(RunStatus::NoData.css_class(), "warning");
        assert_eq!(RunStatus::Warning.to_string(), "warning");
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&RunStatus::NoData).expect("serialize should succeed");
        assert_eq!(json, "\"no_data\"");
    }

    // -----------------------------------------------------------------------
    // RunOverview
    // -----------------------------------------------------------------------

    #[test]
    fn overview_counts_requests_failures_and_throughput() {
        let mut series = MetricSeries::new(MetricNames::http());
        for i in 0..10 {
            series.ingest(point("http_req_duration", i, 100.0));
            series.ingest(point("http_req_failed", i, if i == 0 { 1.0 } else { 0.0 }));
            series.ingest(point("vus", i, i as f64));
        }
        series.ingest(point("iterations", 10, 1.0));

        let overview = RunOverview::from_series(&series);
        assert_eq!(overview.total_requests, 10);
        assert_eq!(overview.failed_requests, 1);
        assert!((overview.success_rate.unwrap() - 90.0).abs() < 1e-9);
        assert!((overview.failure_rate().unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(overview.iterations, 1);
        assert_eq!(overview.max_vus, Some(9.0));
        assert!((overview.duration_secs - 10.0).abs() < 1e-9);
        assert!((overview.requests_per_second - 1.0).abs() < 1e-9);
        assert_eq!(overview.status, RunStatus::Warning);
    }

    #[test]
    fn overview_of_empty_series_has_no_data() {
        let series = MetricSeries::new(MetricNames::http());
        let overview = RunOverview::from_series(&series);
        assert_eq!(overview.total_requests, 0);
        assert!(overview.success_rate.is_none());
        assert!(overview.response.is_none());
        assert!(overview.max_vus.is_none());
        assert_eq!(overview.requests_per_second, 0.0);
        assert_eq!(overview.status, RunStatus::NoData);
    }

    fn run_with_failures(total: i64, failed: i64) -> RunOverview {
        let mut series = MetricSeries::new(MetricNames::http());
        for i in 0..total {
            series.ingest(point("http_req_duration", i, 100.0));
            series.ingest(point("http_req_failed", i, if i < failed { 1.0 } else { 0.0 }));
        }
        RunOverview::from_series(&series)
    }

    #[test]
    fn success_rate_is_judged_at_displayed_precision() {
        let overview = run_with_failures(25_000, 2_501);
        assert_eq!(overview.success_rate, Some(90.0));
        assert_eq!(overview.status, RunStatus::Warning);
    }

    #[test]
    fn success_rate_rounds_up_to_ninety_nine() {
        let overview = run_with_failures(25_000, 251);
        assert_eq!(overview.success_rate, Some(99.0));
        assert_eq!(overview.status, RunStatus::Passed);
    }

    #[test]
    fn round_rate_two_decimals() {
        assert_eq!(round_rate(89.996), 90.0);
        assert_eq!(round_rate(98.996), 99.0);
        assert_eq!(round_rate(95.004), 95.0);
    }

    #[test]
    fn count_failures_only_counts_exact_ones() {
        assert_eq!(count_failures(&[0.0, 1.0, 1.0, 0.5, 2.0]), 2);
    }
}
