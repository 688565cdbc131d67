use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::Observation;

/// Record type tag of a metric sample in k6 JSON output.
const POINT_RECORD: &str = "Point";

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    metric: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawPointData {
    time: DateTime<Utc>,
    value: f64,
    #[serde(default)]
    tags: Option<BTreeMap<String, Value>>,
}

/// Flatten tag values to strings. Scalars keep their JSON text; null and
/// structured values are dropped.
fn flatten_tags(tags: BTreeMap<String, Value>) -> BTreeMap<String, String> {
    tags.into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) => Some((key, s)),
            Value::Number(_) | Value::Bool(_) => Some((key, value.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Line outcomes
// ---------------------------------------------------------------------------

/// Why a line did not yield an [`Observation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Empty or whitespace-only line.
    Blank,
    /// Not JSON, or a point record missing/mistyping a required field.
    Malformed,
    /// Well-formed record of a kind other than a metric point.
    OtherRecord,
}

/// Result of decoding a single telemetry line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Point(Observation),
    Skipped(SkipReason),
}

/// Decode one line of k6 JSON output.
///
/// Never fails: lines that are not metric points are reported as skipped,
/// since the stream interleaves metric declarations with samples.
pub fn parse_line(line: &str) -> LineOutcome {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineOutcome::Skipped(SkipReason::Blank);
    }

    let record: RawRecord = match serde_json::from_str(trimmed) {
        Ok(record) => record,
        Err(_) => return LineOutcome::Skipped(SkipReason::Malformed),
    };

    if record.kind != POINT_RECORD {
        return LineOutcome::Skipped(SkipReason::OtherRecord);
    }

    let (Some(metric), Some(data)) = (record.metric, record.data) else {
        return LineOutcome::Skipped(SkipReason::Malformed);
    };

    match serde_json::from_value::<RawPointData>(data) {
        Ok(point) => LineOutcome::Point(Observation {
            timestamp: point.time,
            metric,
            value: point.value,
            tags: point.tags.map(flatten_tags).unwrap_or_default(),
        }),
        Err(_) => LineOutcome::Skipped(SkipReason::Malformed),
    }
}

/// Decode one raw line. Bytes that are not valid UTF-8 make the line
/// malformed.
pub fn parse_line_bytes(line: &[u8]) -> LineOutcome {
    match std::str::from_utf8(line) {
        Ok(text) => parse_line(text),
        Err(_) => LineOutcome::Skipped(SkipReason::Malformed),
    }
}

// ---------------------------------------------------------------------------
// ParseStats
// ---------------------------------------------------------------------------

/// Running tally of accepted and skipped lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub accepted: u64,
    pub blank: u64,
    pub malformed: u64,
    pub other_records: u64,
}

impl ParseStats {
    pub fn skipped(&self) -> u64 {
        self.blank + self.malformed + self.other_records
    }

    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Blank => self.blank += 1,
            SkipReason::Malformed => self.malformed += 1,
            SkipReason::OtherRecord => self.other_records += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// TelemetryReader
// ---------------------------------------------------------------------------

/// Lazily turns a sequence of lines into observations, counting skips.
pub struct TelemetryReader<I> {
    lines: I,
    line_no: u64,
    stats: ParseStats,
}

impl<I> TelemetryReader<I> {
    pub fn new(lines: I) -> Self {
        Self {
            lines,
            line_no: 0,
            stats: ParseStats::default(),
        }
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }
}

impl<I, S> Iterator for TelemetryReader<I>
where
    I: Iterator<Item = S>,
    S: AsRef<[u8]>,
{
    type Item = Observation;

    fn next(&mut self) -> Option<Observation> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            match parse_line_bytes(line.as_ref()) {
                LineOutcome::Point(obs) => {
                    self.stats.accepted += 1;
                    return Some(obs);
                }
                LineOutcome::Skipped(reason) => {
                    if reason == SkipReason::Malformed {
                        tracing::debug!(line = self.line_no, "skipping malformed telemetry line");
                    }
                    self.stats.record(reason);
                }
            }
        }
    }
}
