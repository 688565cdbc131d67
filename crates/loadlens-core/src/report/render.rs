use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::html;
use crate::analysis::{Narrative, RunOverview, RunStatus, StageSummary};
use crate::config::RunMetadata;
use crate::error::ReportError;
use crate::format::{format_ms, format_percent, group_thousands};

/// Executive-summary template compiled into the binary.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/executive-summary.html");

/// Shown wherever a figure could not be computed.
pub const NOT_AVAILABLE: &str = "N/A";

const DATE_FORMAT: &str = "%B %-d, %Y, %I:%M %p";
const PLACEHOLDER_PATTERN: &str = r"\{\{([A-Z0-9_]+)\}\}";

// ---------------------------------------------------------------------------
// Placeholder
// ---------------------------------------------------------------------------

/// Tokens recognised in a template, written `{{NAME}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    TestName,
    TestDate,
    TargetUrl,
    Duration,
    StatusClass,
    StatusText,
    TotalRequests,
    SuccessRate,
    AvgResponse,
    P95Response,
    Stages,
    Findings,
    Recommendations,
    Conclusion,
    TechnicalReportPath,
    GeneratedTime,
}

impl Placeholder {
    pub const ALL: [Placeholder; 16] = [
        Placeholder::TestName,
        Placeholder::TestDate,
        Placeholder::TargetUrl,
        Placeholder::Duration,
        Placeholder::StatusClass,
        Placeholder::StatusText,
        Placeholder::TotalRequests,
        Placeholder::SuccessRate,
        Placeholder::AvgResponse,
        Placeholder::P95Response,
        Placeholder::Stages,
        Placeholder::Findings,
        Placeholder::Recommendations,
        Placeholder::Conclusion,
        Placeholder::TechnicalReportPath,
        Placeholder::GeneratedTime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::TestName => "TEST_NAME",
            Placeholder::TestDate => "TEST_DATE",
            Placeholder::TargetUrl => "TARGET_URL",
            Placeholder::Duration => "DURATION",
            Placeholder::StatusClass => "STATUS_CLASS",
            Placeholder::StatusText => "STATUS_TEXT",
            Placeholder::TotalRequests => "TOTAL_REQUESTS",
            Placeholder::SuccessRate => "SUCCESS_RATE",
            Placeholder::AvgResponse => "AVG_RESPONSE",
            Placeholder::P95Response => "P95_RESPONSE",
            Placeholder::Stages => "STAGES",
            Placeholder::Findings => "FINDINGS",
            Placeholder::Recommendations => "RECOMMENDATIONS",
            Placeholder::Conclusion => "CONCLUSION",
            Placeholder::TechnicalReportPath => "TECHNICAL_REPORT_PATH",
            Placeholder::GeneratedTime => "GENERATED_TIME",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// The token as it appears in a template.
    pub fn token(self) -> String {
        format!("{{{{{}}}}}", self.name())
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Everything the executive summary shows, ready to be rendered or exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Report {
    pub test_type: String,
    pub test_name: String,
    pub target: String,
    pub overview: RunOverview,
    pub stages: Vec<StageSummary>,
    /// Profile description; replaces the runtime stage blocks when present.
    pub metadata: Option<RunMetadata>,
    pub narrative: Narrative,
    pub technical_report_path: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn status(&self) -> RunStatus {
        self.overview.status
    }

    /// Start of the run, or the generation time for an empty run.
    pub fn test_date(&self) -> String {
        self.overview
            .started_at
            .unwrap_or(self.generated_at)
            .format(DATE_FORMAT)
            .to_string()
    }

    pub fn duration_text(&self) -> String {
        if self.overview.started_at.is_none() {
            return "Unknown".to_string();
        }
        let minutes = (self.overview.duration_secs / 60.0).round() as u64;
        if minutes == 1 {
            "1 minute".to_string()
        } else {
            format!("{minutes} minutes")
        }
    }

    pub fn success_rate_text(&self) -> String {
        self.overview
            .success_rate
            .map(format_percent)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn avg_response_text(&self) -> String {
        self.overview
            .response
            .map(|s| format_ms(s.avg))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn p95_response_text(&self) -> String {
        self.overview
            .response
            .map(|s| format_ms(s.p95))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn stages_html(&self) -> String {
        match &self.metadata {
            Some(meta) if !meta.timeline.is_empty() => html::timeline_blocks(meta),
            _ => html::stage_blocks(&self.stages),
        }
    }

    /// Value bound to `placeholder`. Plain values are escaped; fragments
    /// escape their own text.
    pub fn value(&self, placeholder: Placeholder) -> String {
        match placeholder {
            Placeholder::TestName => html::html_escape(&self.test_name),
            Placeholder::TestDate => html::html_escape(&self.test_date()),
            Placeholder::TargetUrl => html::html_escape(&self.target),
            Placeholder::Duration => html::html_escape(&self.duration_text()),
            Placeholder::StatusClass => self.status().css_class().to_string(),
            Placeholder::StatusText => html::html_escape(self.status().label()),
            Placeholder::TotalRequests => group_thousands(self.overview.total_requests),
            Placeholder::SuccessRate => html::html_escape(&self.success_rate_text()),
            Placeholder::AvgResponse => html::html_escape(&self.avg_response_text()),
            Placeholder::P95Response => html::html_escape(&self.p95_response_text()),
            Placeholder::Stages => self.stages_html(),
            Placeholder::Findings => html::finding_items(&self.narrative.findings),
            Placeholder::Recommendations => {
                html::recommendation_items(&self.narrative.recommendations)
            }
            Placeholder::Conclusion => html::html_escape(&self.narrative.conclusion),
            Placeholder::TechnicalReportPath => {
                html::html_escape(self.technical_report_path.as_deref().unwrap_or("#"))
            }
            Placeholder::GeneratedTime => {
                html::html_escape(&self.generated_at.format(DATE_FORMAT).to_string())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Replace every `{{NAME}}` token for which `lookup` returns a value.
///
/// The template is scanned once, so text produced by a substitution is never
/// itself searched for tokens. Tokens `lookup` does not know stay as they are.
pub fn fill_placeholders<F>(template: &str, lookup: F) -> Result<String, ReportError>
where
    F: Fn(&str) -> Option<String>,
{
    let re = Regex::new(PLACEHOLDER_PATTERN)
        .map_err(|e| ReportError::Template(format!("invalid placeholder pattern: {e}")))?;
    let filled = re.replace_all(template, |caps: &Captures| {
        lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    Ok(filled.into_owned())
}

/// Bind `report` into `template`.
pub fn render(template: &str, report: &Report) -> Result<String, ReportError> {
    if template.trim().is_empty() {
        return Err(ReportError::Template("template is empty".to_string()));
    }
    if !Placeholder::ALL.iter().any(|p| template.contains(&p.token())) {
        tracing::warn!("template contains no recognised placeholders");
    }
    fill_placeholders(template, |name| {
        Placeholder::from_name(name).map(|p| report.value(p))
    })
}

/// Export a report as pretty-printed JSON.
pub fn export_json(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
