use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use url::{ParseError, Url};

use super::{MetricNames, Observation};

// ---------------------------------------------------------------------------
// MetricValues
// ---------------------------------------------------------------------------

/// Raw values recorded for one metric, overall and split by stage.
#[derive(Debug, Clone, Default)]
pub struct MetricValues {
    pub values: Vec<f64>,
    pub by_stage: BTreeMap<String, Vec<f64>>,
}

impl MetricValues {
    pub fn stage(&self, stage: &str) -> &[f64] {
        self.by_stage.get(stage).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// TargetTracker
// ---------------------------------------------------------------------------

/// Remembers which system the run was pointed at, based on request URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetTracker {
    origin: Option<String>,
    relative_path: Option<String>,
}

impl TargetTracker {
    /// Offer a `url` tag value.
    ///
    /// The first absolute URL wins for good. A relative path is only kept as
    /// a display fallback, and only the first one.
    pub fn offer(&mut self, raw: &str) {
        if self.origin.is_some() {
            return;
        }
        match Url::parse(raw) {
            Ok(url) => {
                let origin = url.origin();
                if origin.is_tuple() {
                    self.origin = Some(origin.ascii_serialization());
                }
            }
            Err(ParseError::RelativeUrlWithoutBase) => {
                if self.relative_path.is_none() {
                    self.relative_path = Some(raw.to_string());
                }
            }
            Err(_) => {}
        }
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn relative_path(&self) -> Option<&str> {
        self.relative_path.as_deref()
    }
}

// ---------------------------------------------------------------------------
// MetricSeries
// ---------------------------------------------------------------------------

/// Append-only collection of every value seen in a telemetry stream.
///
/// Timestamps are folded into min/max rather than relying on stream order,
/// so ingesting the same lines in any order yields the same series.
#[derive(Debug, Clone, Default)]
pub struct MetricSeries {
    names: MetricNames,
    metrics: HashMap<String, MetricValues>,
    target: TargetTracker,
    first_seen: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
    stage_started: BTreeMap<String, DateTime<Utc>>,
    observations: u64,
}

impl MetricSeries {
    pub fn new(names: MetricNames) -> Self {
        Self {
            names,
            ..Self::default()
        }
    }

    /// Fold one observation into the series.
    pub fn ingest(&mut self, obs: Observation) {
        self.observations += 1;

        let ts = obs.timestamp;
        self.first_seen = Some(self.first_seen.map_or(ts, |t| t.min(ts)));
        self.last_seen = Some(self.last_seen.map_or(ts, |t| t.max(ts)));

        if obs.metric == self.names.requests {
            if let Some(url) = obs.url() {
                self.target.offer(url);
            }
        }

        let entry = self.metrics.entry(obs.metric).or_default();
        entry.values.push(obs.value);

        if let Some(stage) = obs.tags.get(super::STAGE_TAG) {
            entry
                .by_stage
                .entry(stage.clone())
                .or_default()
                .push(obs.value);
            self.stage_started
                .entry(stage.clone())
                .and_modify(|t| *t = (*t).min(ts))
                .or_insert(ts);
        }
    }

    pub fn names(&self) -> &MetricNames {
        &self.names
    }

    pub fn metric(&self, name: &str) -> Option<&MetricValues> {
        self.metrics.get(name)
    }

    /// All values of `name`, or an empty slice when the metric never appeared.
    pub fn values(&self, name: &str) -> &[f64] {
        self.metrics
            .get(name)
            .map(|m| m.values.as_slice())
            .unwrap_or(&[])
    }

    pub fn stage_values(&self, name: &str, stage: &str) -> &[f64] {
        self.metrics.get(name).map(|m| m.stage(stage)).unwrap_or(&[])
    }

    pub fn target(&self) -> &TargetTracker {
        &self.target
    }

    pub fn first_seen(&self) -> Option<DateTime<Utc>> {
        self.first_seen
    }

    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    /// Earliest timestamp of any observation tagged with `stage`.
    pub fn stage_started(&self, stage: &str) -> Option<DateTime<Utc>> {
        self.stage_started.get(stage).copied()
    }

    pub fn observation_count(&self) -> u64 {
        self.observations
    }

    pub fn is_empty(&self) -> bool {
        self.observations == 0
    }
}

impl Extend<Observation> for MetricSeries {
    fn extend<T: IntoIterator<Item = Observation>>(&mut self, iter: T) {
        for obs in iter {
            self.ingest(obs);
        }
    }
}
