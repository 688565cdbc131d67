use serde::{Deserialize, Serialize};

use super::overview::{RunOverview, RunStatus};
use super::stages::StageSummary;
use crate::format::group_thousands;

/// Shown in place of findings when a run recorded no requests.
pub const FINDINGS_UNAVAILABLE: &str =
    "Not available: no request metrics were recorded during this run";
/// Shown in place of recommendations when a run recorded no requests.
pub const RECOMMENDATIONS_UNAVAILABLE: &str =
    "Not available: verify that the load generator wrote request metrics to its JSON output";
/// Conclusion for a run that recorded no requests.
pub const CONCLUSION_UNAVAILABLE: &str =
    "No request data was recorded during this run, so a performance conclusion is not available.";

// ---------------------------------------------------------------------------
// Tier tables
// ---------------------------------------------------------------------------

/// One `(predicate, template)` row of a narrative rule table.
struct Tier<C> {
    when: fn(&C) -> bool,
    say: fn(&C) -> String,
}

impl<C> Tier<C> {
    fn new(when: fn(&C) -> bool, say: fn(&C) -> String) -> Self {
        Self { when, say }
    }
}

/// Render the first row whose predicate holds.
fn first_match<C>(tiers: &[Tier<C>], ctx: &C) -> Option<String> {
    tiers
        .iter()
        .find(|tier| (tier.when)(ctx))
        .map(|tier| (tier.say)(ctx))
}

// ---------------------------------------------------------------------------
// NarrativeInput
// ---------------------------------------------------------------------------

/// Figures the narrative rules read.
///
/// Latencies are rounded to whole milliseconds, matching what the report
/// displays, so the prose never disagrees with the headline numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeInput {
    pub status: RunStatus,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub avg_ms: f64,
    pub p95_ms: f64,
    /// Unrounded p95, used by the recommendation cutoffs.
    pub raw_p95_ms: f64,
    pub requests_per_second: f64,
    pub max_vus: Option<f64>,
    /// Rounded average response time of the first and last stage.
    pub stage_trend: Option<(f64, f64)>,
}

impl NarrativeInput {
    /// `None` when the run recorded no requests.
    pub fn new(overview: &RunOverview, stages: &[StageSummary]) -> Option<Self> {
        let success_rate = overview.success_rate?;
        let response = overview.response.as_ref()?;

        let stage_trend = match (stages.first(), stages.last()) {
            (Some(first), Some(last)) if stages.len() > 1 => Some((
                first.avg_response_ms.round(),
                last.avg_response_ms.round(),
            )),
            _ => None,
        };

        Some(Self {
            status: overview.status,
            total_requests: overview.total_requests,
            failed_requests: overview.failed_requests,
            success_rate,
            failure_rate: overview.failure_rate().unwrap_or(0.0),
            avg_ms: response.avg.round(),
            p95_ms: response.p95.round(),
            raw_p95_ms: response.p95,
            requests_per_second: overview.requests_per_second,
            max_vus: overview.max_vus.map(f64::round),
            stage_trend,
        })
    }

    /// Throughput rounded to one decimal, as displayed.
    fn rps_display(&self) -> f64 {
        (self.requests_per_second * 10.0).round() / 10.0
    }
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// Aspect of the run a finding talks about, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    SuccessRate,
    AverageLatency,
    TailLatency,
    Consistency,
    Throughput,
    Concurrency,
    Errors,
    StabilityTrend,
    Headroom,
    PeakLoad,
}

impl Dimension {
    /// Order in which findings appear in the report.
    pub const ORDER: [Dimension; 10] = [
        Dimension::SuccessRate,
        Dimension::AverageLatency,
        Dimension::TailLatency,
        Dimension::Consistency,
        Dimension::Throughput,
        Dimension::Concurrency,
        Dimension::Errors,
        Dimension::StabilityTrend,
        Dimension::Headroom,
        Dimension::PeakLoad,
    ];

    /// Zero or one finding for this dimension.
    pub fn evaluate(self, input: &NarrativeInput) -> Option<String> {
        match self {
            Dimension::SuccessRate => success_rate_finding(input),
            Dimension::AverageLatency => average_latency_finding(input),
            Dimension::TailLatency => tail_latency_finding(input),
            Dimension::Consistency => consistency_finding(input),
            Dimension::Throughput => throughput_finding(input),
            Dimension::Concurrency => concurrency_finding(input),
            Dimension::Errors => error_finding(input),
            Dimension::StabilityTrend => stability_finding(input),
            Dimension::Headroom => headroom_finding(input),
            Dimension::PeakLoad => peak_load_finding(input),
        }
    }
}

fn success_rate_finding(input: &NarrativeInput) -> Option<String> {
    let tiers = [
        Tier::new(|r: &f64| *r >= 99.0, |r: &f64| format!(
            "Excellent success rate of {r:.2}% - nearly all requests succeeded, demonstrating robust system stability"
        )),
        Tier::new(|r: &f64| *r >= 95.0, |r: &f64| format!(
            "Good success rate of {r:.2}% - system performance is stable with minimal failures"
        )),
        Tier::new(|r: &f64| *r >= 90.0, |r: &f64| format!(
            "Success rate of {r:.2}% is below ideal (95%) - some users experienced failures, investigate error patterns"
        )),
        Tier::new(|_: &f64| true, |r: &f64| format!(
            "Critical: Success rate of {r:.2}% is unacceptable - significant portion of users unable to access the system"
        )),
    ];
    first_match(&tiers, &input.success_rate)
}

fn average_latency_finding(input: &NarrativeInput) -> Option<String> {
    let tiers = [
        Tier::new(|ms: &f64| *ms < 100.0, |ms: &f64| format!(
            "Outstanding average response time of {ms}ms - users experience near-instant page loads"
        )),
        Tier::new(|ms: &f64| *ms < 500.0, |ms: &f64| format!(
            "Excellent average response time of {ms}ms - fast and responsive for typical users"
        )),
        Tier::new(|ms: &f64| *ms < 1000.0, |ms: &f64| format!(
            "Good average response time of {ms}ms - acceptable performance for most users"
        )),
        Tier::new(|ms: &f64| *ms < 2000.0, |ms: &f64| format!(
            "Moderate average response time of {ms}ms - users may notice slight delays"
        )),
        Tier::new(|_: &f64| true, |ms: &f64| format!(
            "Slow average response time of {ms}ms - optimization needed to improve user experience"
        )),
    ];
    first_match(&tiers, &input.avg_ms)
}

fn tail_latency_finding(input: &NarrativeInput) -> Option<String> {
    if input.p95_ms <= 0.0 {
        return None;
    }
    let tiers = [
        Tier::new(|ms: &f64| *ms < 200.0, |ms: &f64| format!(
            "95% of users experienced response times under {ms}ms - consistently fast for almost everyone"
        )),
        Tier::new(|ms: &f64| *ms < 1000.0, |ms: &f64| format!(
            "95% of users experienced response times under {ms}ms - only 1 in 20 users waited longer than this"
        )),
        Tier::new(|ms: &f64| *ms < 2000.0, |ms: &f64| format!(
            "95% of users waited less than {ms}ms for responses - acceptable but room for improvement"
        )),
        Tier::new(|_: &f64| true, |ms: &f64| format!(
            "95% of users waited less than {ms}ms - the slowest 5% experienced significant delays, investigate bottlenecks"
        )),
    ];
    first_match(&tiers, &input.p95_ms)
}

fn consistency_finding(input: &NarrativeInput) -> Option<String> {
    if input.p95_ms <= 0.0 || input.avg_ms <= 0.0 {
        return None;
    }
    let ratio = input.p95_ms / input.avg_ms;
    let tiers = [
        Tier::new(|x: &f64| *x < 2.0, |x: &f64| format!(
            "Highly consistent performance - the slowest 5% of requests were only {x:.1}x slower than average, indicating predictable response times"
        )),
        Tier::new(|x: &f64| *x < 3.0, |x: &f64| format!(
            "Moderate consistency - slowest requests were {x:.1}x slower than average, some variability present"
        )),
        Tier::new(|_: &f64| true, |x: &f64| format!(
            "Inconsistent performance detected - slowest 5% were {x:.1}x slower than average, indicating some requests face significant issues"
        )),
    ];
    first_match(&tiers, &ratio)
}

fn throughput_finding(input: &NarrativeInput) -> Option<String> {
    let rps = input.rps_display();
    let mut text = format!(
        "System processed {} requests during the test at {rps:.1} requests per second",
        group_thousands(input.total_requests)
    );
    if rps > 1.0 {
        let per_hour = (rps * 3600.0).round() as u64;
        text.push_str(&format!(
            " - at this rate the system can handle approximately {} requests per hour under similar load conditions",
            group_thousands(per_hour)
        ));
    }
    Some(text)
}

fn concurrency_finding(input: &NarrativeInput) -> Option<String> {
    input.max_vus.map(|vus| {
        format!("Successfully handled {vus} concurrent users - this represents the tested capacity level")
    })
}

fn error_finding(input: &NarrativeInput) -> Option<String> {
    let tiers = [
        Tier::new(|i: &NarrativeInput| i.failed_requests == 0, |_: &NarrativeInput| {
            "Zero failed requests - perfect reliability throughout the entire test duration".to_string()
        }),
        Tier::new(|i: &NarrativeInput| i.failure_rate < 1.0, |i: &NarrativeInput| format!(
            "Minimal failure rate ({:.1}%) with {} failed requests out of {} - likely transient network issues",
            i.failure_rate, i.failed_requests, group_thousands(i.total_requests)
        )),
        Tier::new(|i: &NarrativeInput| i.failure_rate < 5.0, |i: &NarrativeInput| format!(
            "Low failure rate ({:.1}%) with {} failed requests - monitor these errors to prevent escalation",
            i.failure_rate, i.failed_requests
        )),
        Tier::new(|i: &NarrativeInput| i.failure_rate < 10.0, |i: &NarrativeInput| format!(
            "Moderate failure rate ({:.1}%) with {} failed requests - investigate root cause of these failures",
            i.failure_rate, i.failed_requests
        )),
        Tier::new(|_: &NarrativeInput| true, |i: &NarrativeInput| format!(
            "High failure rate ({:.1}%) with {} failed requests - critical issue requiring immediate attention",
            i.failure_rate, i.failed_requests
        )),
    ];
    first_match(&tiers, input)
}

fn stability_finding(input: &NarrativeInput) -> Option<String> {
    let (first, last) = input.stage_trend?;
    if first <= 0.0 {
        return None;
    }
    // Compared at the one-decimal precision it is displayed with.
    let delta = ((last - first) / first * 1000.0).round() / 10.0;
    let tiers = [
        Tier::new(|d: &f64| *d < 10.0, |d: &f64| format!(
            "Performance remained stable throughout test - response times only varied by {:.1}% from start to finish",
            d.abs()
        )),
        Tier::new(|d: &f64| *d < 30.0, |d: &f64| format!(
            "Moderate performance degradation of {d:.1}% as load increased - system showing signs of stress but remaining functional"
        )),
        Tier::new(|d: &f64| *d > 30.0, |d: &f64| format!(
            "Significant performance degradation of {d:.1}% as load increased - system struggling under peak load"
        )),
    ];
    first_match(&tiers, &delta)
}

fn headroom_finding(input: &NarrativeInput) -> Option<String> {
    input.max_vus?;
    let tiers = [
        Tier::new(
            |i: &NarrativeInput| i.success_rate >= 99.0 && i.avg_ms < 500.0,
            |i: &NarrativeInput| format!(
                "Strong performance indicators suggest system has headroom to handle additional load beyond {} users",
                i.max_vus.unwrap_or_default()
            ),
        ),
        Tier::new(
            |i: &NarrativeInput| i.success_rate >= 95.0 && i.avg_ms < 1000.0,
            |i: &NarrativeInput| format!(
                "System is operating near optimal capacity at {} users - can likely handle moderate increases with monitoring",
                i.max_vus.unwrap_or_default()
            ),
        ),
        Tier::new(
            |i: &NarrativeInput| i.success_rate < 95.0 || i.avg_ms > 2000.0,
            |i: &NarrativeInput| format!(
                "System is at or beyond comfortable capacity at {} users - additional load may cause service degradation",
                i.max_vus.unwrap_or_default()
            ),
        ),
    ];
    first_match(&tiers, input)
}

fn peak_load_finding(input: &NarrativeInput) -> Option<String> {
    let vus = input.max_vus.filter(|v: &f64| *v >= 100.0)?;
    let intensity = first_match(
        &[
            Tier::new(|v: &f64| *v < 50.0, |_: &f64| "light".to_string()),
            Tier::new(|v: &f64| *v < 200.0, |_: &f64| "moderate".to_string()),
            Tier::new(|v: &f64| *v < 1000.0, |_: &f64| "heavy".to_string()),
            Tier::new(|_: &f64| true, |_: &f64| "extreme".to_string()),
        ],
        &vus,
    )?;
    Some(format!(
        "Peak load of {vus} concurrent users represents {intensity} stress testing conditions"
    ))
}

// ---------------------------------------------------------------------------
// Recommendations and conclusion
// ---------------------------------------------------------------------------

const CONTINUE_MONITORING: &str =
    "System is performing well - continue monitoring under production load";

fn recommendations(input: &NarrativeInput) -> Vec<String> {
    let failures = [
        Tier::new(|i: &NarrativeInput| i.failed_requests > 0 && i.failure_rate > 10.0, |_: &NarrativeInput| {
            "High error rate detected - investigate server logs and error responses".to_string()
        }),
        Tier::new(|i: &NarrativeInput| i.failed_requests > 0, |_: &NarrativeInput| {
            "Monitor error patterns and implement retry mechanisms for transient failures".to_string()
        }),
    ];
    let latency = [Tier::new(|i: &NarrativeInput| i.raw_p95_ms > 2000.0, |_: &NarrativeInput| {
        "p95 latency exceeds 2 seconds - optimize slow endpoints and database queries".to_string()
    })];
    let resilience = [Tier::new(|i: &NarrativeInput| i.success_rate < 95.0, |_: &NarrativeInput| {
        "Implement rate limiting and circuit breakers to handle high load gracefully".to_string()
    })];

    let mut recs: Vec<String> = [
        first_match(&failures, input),
        first_match(&latency, input),
        first_match(&resilience, input),
    ]
    .into_iter()
    .flatten()
    .collect();

    if recs.is_empty() {
        recs.push(CONTINUE_MONITORING.to_string());
    }
    recs
}

fn conclusion(input: &NarrativeInput) -> String {
    let rate = input.success_rate;
    match input.status {
        RunStatus::Passed => format!(
            "The system successfully handled the test load with {rate:.2}% success rate and an average response time of {}ms. All performance metrics are within acceptable thresholds. The system is ready for production traffic at this scale.",
            input.avg_ms
        ),
        RunStatus::Warning => format!(
            "The system handled the test with {rate:.2}% success rate but showed signs of stress under peak load. Average response time was {}ms with p95 at {}ms. Performance optimization is recommended before scaling to higher loads.",
            input.avg_ms, input.p95_ms
        ),
        RunStatus::Failed => format!(
            "The system struggled under test load with only {rate:.2}% success rate. Performance degradation was significant with p95 latency at {}ms. Critical issues must be addressed before production deployment.",
            input.p95_ms
        ),
        RunStatus::NoData => CONCLUSION_UNAVAILABLE.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Narrative
// ---------------------------------------------------------------------------

/// A single human-readable statement about the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Finding {
    /// `None` for the "not available" placeholder.
    pub dimension: Option<Dimension>,
    pub text: String,
}

/// Findings, recommendations and conclusion for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Narrative {
    pub findings: Vec<Finding>,
    pub recommendations: Vec<String>,
    pub conclusion: String,
}

impl Narrative {
    /// Narrative for a run without request data.
    pub fn unavailable() -> Self {
        Self {
            findings: vec![Finding {
                dimension: None,
                text: FINDINGS_UNAVAILABLE.to_string(),
            }],
            recommendations: vec![RECOMMENDATIONS_UNAVAILABLE.to_string()],
            conclusion: CONCLUSION_UNAVAILABLE.to_string(),
        }
    }
}

/// Build the narrative for a run.
pub fn synthesize(overview: &RunOverview, stages: &[StageSummary]) -> Narrative {
    let Some(input) = NarrativeInput::new(overview, stages) else {
        return Narrative::unavailable();
    };

    let findings = Dimension::ORDER
        .iter()
        .filter_map(|&dimension| {
            dimension.evaluate(&input).map(|text| Finding {
                dimension: Some(dimension),
                text,
            })
        })
        .collect();

    Narrative {
        findings,
        recommendations: recommendations(&input),
        conclusion: conclusion(&input),
    }
}
