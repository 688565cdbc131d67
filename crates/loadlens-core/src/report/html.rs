//! HTML fragments bound into the `STAGES`, `FINDINGS` and `RECOMMENDATIONS`
//! placeholders. Every piece of text is escaped here, so callers insert the
//! returned fragments verbatim.

use crate::analysis::{Finding, StageSummary};
use crate::config::RunMetadata;
use crate::format::group_thousands;

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Metric colouring
// ---------------------------------------------------------------------------

fn success_class(rate: f64) -> &'static str {
    if rate >= 95.0 {
        "metric-good"
    } else if rate >= 90.0 {
        "metric-warning"
    } else {
        "metric-bad"
    }
}

fn avg_response_class(ms: f64) -> &'static str {
    if ms < 1000.0 {
        "metric-good"
    } else if ms < 2000.0 {
        "metric-warning"
    } else {
        "metric-bad"
    }
}

fn p95_class(ms: f64) -> &'static str {
    if ms < 2000.0 {
        "metric-good"
    } else if ms < 3000.0 {
        "metric-warning"
    } else {
        "metric-bad"
    }
}

// ---------------------------------------------------------------------------
// Stage blocks
// ---------------------------------------------------------------------------

/// Human stage number: numeric ids are zero-based, others are shown as-is.
fn stage_label(stage_id: &str) -> String {
    match stage_id.trim().parse::<u64>() {
        Ok(n) => (n + 1).to_string(),
        Err(_) => stage_id.to_string(),
    }
}

/// One block per runtime stage, used when no profile description exists.
pub fn stage_blocks(stages: &[StageSummary]) -> String {
    stages.iter().map(stage_block).collect::<Vec<_>>().join("\n")
}

fn stage_block(stage: &StageSummary) -> String {
    let minutes = stage
        .started_after_secs
        .map(|s| (s / 60.0).round() as u64)
        .unwrap_or(0);

    let failed_row = if stage.failed_count > 0 {
        format!(
            "\n    <li>Failed Requests: <span class=\"metric-bad\">{}</span></li>",
            group_thousands(stage.failed_count)
        )
    } else {
        String::new()
    };

    let notes = stage
        .observations
        .iter()
        .map(|note| format!("&bull; {}", html_escape(note)))
        .collect::<Vec<_>>()
        .join("<br>");

    format!(
        r#"<div class="stage {status}">
  <div class="stage-header">Stage {label}: {avg_vus} &rarr; {max_vus} Virtual Users</div>
  <div class="stage-time">Time: {minutes}min onwards</div>
  <ul class="stage-metrics">
    <li>Requests: <span class="metric-good">{requests}</span></li>
    <li>Success Rate: <span class="{success_cls}">{success:.2}%</span></li>
    <li>Avg Response Time: <span class="{avg_cls}">{avg}ms</span></li>
    <li>p95 Latency: <span class="{p95_cls}">{p95}ms</span></li>{failed_row}
  </ul>
  <div class="stage-notes">{notes}</div>
</div>"#,
        status = stage.status,
        label = html_escape(&stage_label(&stage.stage_id)),
        avg_vus = stage.avg_vus,
        max_vus = stage.max_vus,
        minutes = minutes,
        requests = group_thousands(stage.request_count),
        success_cls = success_class(stage.success_rate_pct),
        success = stage.success_rate_pct,
        avg_cls = avg_response_class(stage.avg_response_ms),
        avg = stage.avg_response_ms.round(),
        p95_cls = p95_class(stage.p95_ms),
        p95 = stage.p95_ms.round(),
        failed_row = failed_row,
        notes = notes,
    )
}

/// Purpose box followed by one block per described phase.
pub fn timeline_blocks(metadata: &RunMetadata) -> String {
    let mut out = format!(
        r#"<div class="purpose">
  <h3>Test Purpose</h3>
  <p>{}</p>
</div>"#,
        html_escape(&metadata.description)
    );

    for (idx, item) in metadata.timeline.iter().enumerate() {
        out.push_str(&format!(
            r#"
<div class="stage">
  <div class="stage-header">&#128205; Phase {n}: {phase}</div>
  <div class="stage-time">Duration: {duration}</div>
  <ul class="stage-metrics">
    <li><strong>Load Pattern:</strong> {load}</li>
    <li><strong>Objective:</strong> {objective}</li>
  </ul>
</div>"#,
            n = idx + 1,
            phase = html_escape(&item.phase),
            duration = html_escape(&item.duration),
            load = html_escape(&item.load),
            objective = html_escape(&item.objective),
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

pub fn finding_items(findings: &[Finding]) -> String {
    list_items(findings.iter().map(|f| f.text.as_str()))
}

pub fn recommendation_items(recommendations: &[String]) -> String {
    list_items(recommendations.iter().map(String::as_str))
}

fn list_items<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items
        .map(|item| format!("<li>{}</li>", html_escape(item)))
        .collect::<Vec<_>>()
        .join("\n")
}
