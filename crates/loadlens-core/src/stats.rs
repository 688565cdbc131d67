use serde::{Deserialize, Serialize};

/// Summary statistics over a set of metric values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Statistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Compute [`Statistics`] over `values`.
///
/// Returns `None` for an empty slice. The input order does not matter.
pub fn stats(values: &[f64]) -> Option<Statistics> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let sum: f64 = sorted.iter().sum();

    Some(Statistics {
        count,
        min: sorted[0],
        max: sorted[count - 1],
        avg: sum / count as f64,
        p50: percentile(&sorted, 50),
        p90: percentile(&sorted, 90),
        p95: percentile(&sorted, 95),
        p99: percentile(&sorted, 99),
    })
}

/// Element at index `floor(len * pct / 100)` of an ascending slice, clamped
/// to the last element.
///
/// `sorted` must be non-empty.
fn percentile(sorted: &[f64], pct: usize) -> f64 {
    let idx = sorted.len() * pct / 100;
    sorted[idx.min(sorted.len() - 1)]
}
