use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::overview::count_failures;
use crate::stats::{stats, Statistics};
use crate::telemetry::MetricSeries;

/// Failure rate (percent) above which a stage is an error.
pub const STAGE_ERROR_FAILURE_RATE: f64 = 10.0;
/// Failure rate (percent) from which a stage is a warning.
pub const STAGE_WARN_FAILURE_RATE: f64 = 5.0;
/// Average response time (ms) above which a stage is a warning.
pub const STAGE_WARN_AVG_MS: f64 = 2000.0;
/// p95 response time (ms) above which a stage is a warning.
pub const STAGE_WARN_P95_MS: f64 = 3000.0;
/// Minimum success rate (percent) for the "all clear" note.
pub const STAGE_HEALTHY_SUCCESS_RATE: f64 = 95.0;

// ---------------------------------------------------------------------------
// StageStatus
// ---------------------------------------------------------------------------

/// Health of a single stage, ordered by severity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Success,
    Warning,
    Error,
}

impl StageStatus {
    /// Raise severity to at least `to`. Never lowers it.
    pub fn escalate(&mut self, to: StageStatus) {
        if to > *self {
            *self = to;
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StageStatus::Success => "success",
            StageStatus::Warning => "warning",
            StageStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// StageSummary
// ---------------------------------------------------------------------------

/// Per-stage figures and the classifier's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StageSummary {
    pub stage_id: String,
    /// Rounded mean of the concurrent-user gauge during the stage.
    pub avg_vus: u64,
    pub max_vus: u64,
    pub request_count: u64,
    pub failed_count: u64,
    pub success_rate_pct: f64,
    pub avg_response_ms: f64,
    pub p95_ms: f64,
    /// Seconds between the start of the run and the stage's first sample.
    pub started_after_secs: Option<f64>,
    pub status: StageStatus,
    pub observations: Vec<String>,
}

impl StageSummary {
    pub fn failure_rate_pct(&self) -> f64 {
        if self.request_count == 0 {
            0.0
        } else {
            self.failed_count as f64 / self.request_count as f64 * 100.0
        }
    }
}

/// Derive status and notes for one stage from its counts and statistics.
///
/// Each triggered check appends its own note; the status only moves up the
/// `success -> warning -> error` ladder.
pub fn classify(
    request_count: u64,
    failed_count: u64,
    response: &Statistics,
) -> (StageStatus, Vec<String>) {
    let mut status = StageStatus::Success;
    let mut notes = Vec::new();

    let success_rate = success_rate(request_count, failed_count);

    if failed_count > 0 {
        let fail_rate = failed_count as f64 / request_count.max(1) as f64 * 100.0;
        notes.push(format!("{failed_count} failed requests ({fail_rate:.1}%)"));
        if fail_rate > STAGE_ERROR_FAILURE_RATE {
            status.escalate(StageStatus::Error);
        } else if fail_rate >= STAGE_WARN_FAILURE_RATE {
            status.escalate(StageStatus::Warning);
        }
    }

    if response.avg > STAGE_WARN_AVG_MS {
        notes.push(format!(
            "High average response time: {}ms",
            response.avg.round()
        ));
        status.escalate(StageStatus::Warning);
    }

    if response.p95 > STAGE_WARN_P95_MS {
        notes.push("p95 latency exceeded 3s".to_string());
        status.escalate(StageStatus::Warning);
    }

    if notes.is_empty() && success_rate >= STAGE_HEALTHY_SUCCESS_RATE {
        notes.push("All metrics within acceptable range".to_string());
    }

    (status, notes)
}

fn success_rate(total: u64, failed: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        total.saturating_sub(failed) as f64 / total as f64 * 100.0
    }
}

/// Summarize every stage that recorded at least one response time.
pub fn summarize_stages(series: &MetricSeries) -> Vec<StageSummary> {
    let names = series.names();
    let Some(durations) = series.metric(&names.duration) else {
        return Vec::new();
    };

    let mut stage_ids: Vec<&String> = durations
        .by_stage
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(id, _)| id)
        .collect();
    stage_ids.sort_by(|a, b| compare_stage_ids(a, b));

    stage_ids
        .into_iter()
        .filter_map(|stage_id| {
            let response = stats(durations.stage(stage_id))?;
            let request_count = response.count as u64;
            let failed_count = count_failures(series.stage_values(&names.failed, stage_id));
            let vus = series.stage_values(&names.vus, stage_id);

            let (avg_vus, max_vus) = if vus.is_empty() {
                (0, 0)
            } else {
                let avg = vus.iter().sum::<f64>() / vus.len() as f64;
                let max = vus.iter().copied().fold(f64::MIN, f64::max);
                (avg.round().max(0.0) as u64, max.max(0.0) as u64)
            };

            let started_after_secs = match (series.first_seen(), series.stage_started(stage_id)) {
                (Some(run_start), Some(stage_start)) => {
                    Some((stage_start - run_start).num_milliseconds().max(0) as f64 / 1000.0)
                }
                _ => None,
            };

            let (status, observations) = classify(request_count, failed_count, &response);

            Some(StageSummary {
                stage_id: stage_id.clone(),
                avg_vus,
                max_vus,
                request_count,
                failed_count,
                success_rate_pct: success_rate(request_count, failed_count),
                avg_response_ms: response.avg,
                p95_ms: response.p95,
                started_after_secs,
                status,
                observations,
            })
        })
        .collect()
}

/// Order stage identifiers numerically when both parse as numbers.
///
/// Numeric identifiers sort before non-numeric ones; the rest compare as
/// plain strings.
pub fn compare_stage_ids(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
