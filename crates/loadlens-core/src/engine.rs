use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::analysis::{synthesize, summarize_stages, Narrative, RunOverview, RunStatus, StageSummary};
use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::report::{export_json, render, Report, DEFAULT_TEMPLATE};
use crate::telemetry::{MetricNames, MetricSeries, ParseStats, TelemetryReader};

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Result of reading a telemetry stream and analysing it.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub series: MetricSeries,
    pub parse_stats: ParseStats,
    pub overview: RunOverview,
    pub stages: Vec<StageSummary>,
    pub narrative: Narrative,
}

/// Parse, aggregate and analyse a sequence of JSON lines.
///
/// Lines may be text or raw bytes; lines that are not valid UTF-8 are
/// skipped as malformed.
pub fn analyze<I, S>(lines: I, names: MetricNames) -> Analysis
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut reader = TelemetryReader::new(lines.into_iter());
    let mut series = MetricSeries::new(names);
    series.extend(&mut reader);
    let parse_stats = reader.stats();

    tracing::info!(
        accepted = parse_stats.accepted,
        skipped = parse_stats.skipped(),
        malformed = parse_stats.malformed,
        "telemetry parsed"
    );

    let overview = RunOverview::from_series(&series);
    let stages = summarize_stages(&series);
    let narrative = synthesize(&overview, &stages);

    Analysis {
        series,
        parse_stats,
        overview,
        stages,
        narrative,
    }
}

// ---------------------------------------------------------------------------
// Report assembly
// ---------------------------------------------------------------------------

/// Knobs for a single report generation.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Defaults to the input file name without its extension.
    pub test_type: Option<String>,
    pub technical_report_path: Option<String>,
    /// Custom template; the built-in one is used otherwise.
    pub template_path: Option<PathBuf>,
    /// Also write the report as JSON here.
    pub json_path: Option<PathBuf>,
    pub metrics: MetricNames,
    /// Environment name or base URL used when the stream has no absolute URL.
    pub environment: Option<String>,
}

/// Assemble the report for an analysed run.
pub fn build_report(
    analysis: &Analysis,
    test_type: &str,
    options: &ReportOptions,
    config: &ReportConfig,
    generated_at: DateTime<Utc>,
) -> Report {
    let metadata = config.metadata(test_type).cloned();
    if metadata.is_none() {
        tracing::debug!(test_type, "no profile description for test type");
    }

    Report {
        test_type: test_type.to_string(),
        test_name: config.test_name(test_type),
        target: config.resolve_target(analysis.series.target(), options.environment.as_deref()),
        overview: analysis.overview.clone(),
        stages: analysis.stages.clone(),
        metadata,
        narrative: analysis.narrative.clone(),
        technical_report_path: options.technical_report_path.clone(),
        generated_at,
    }
}

fn default_test_type(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// File pipeline
// ---------------------------------------------------------------------------

/// What a successful generation reports back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    pub status: RunStatus,
    /// Success rate as shown in the report, `N/A` for an empty run.
    pub success_rate: String,
    pub parse_stats: ParseStats,
    pub output_path: PathBuf,
}

/// Read `input`, render the executive summary and write it to `output`.
pub async fn generate_report(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &ReportOptions,
    config: &ReportConfig,
) -> Result<ReportOutcome, ReportError> {
    let input = input.as_ref();
    let output = output.as_ref();

    let content = tokio::fs::read(input).await?;
    let analysis = analyze(content.split(|&b| b == b'\n'), options.metrics.clone());

    let test_type = options
        .test_type
        .clone()
        .unwrap_or_else(|| default_test_type(input));
    let report = build_report(&analysis, &test_type, options, config, Utc::now());

    let template = match &options.template_path {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => DEFAULT_TEMPLATE.to_string(),
    };
    let html = render(&template, &report)?;
    tokio::fs::write(output, html).await?;
    tracing::info!(path = %output.display(), status = %report.status(), "report written");

    if let Some(json_path) = &options.json_path {
        tokio::fs::write(json_path, export_json(&report)?).await?;
        tracing::info!(path = %json_path.display(), "report JSON written");
    }

    Ok(ReportOutcome {
        status: report.status(),
        success_rate: report.success_rate_text(),
        parse_stats: analysis.parse_stats,
        output_path: output.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StageStatus;

    fn point(metric: &str, secs: u32, value: f64, stage: &str, url: Option<&str>) -> String {
        let url_tag = url.map(|u| format!(r#","url":"{u}""#)).unwrap_or_default();
        format!(
            r#"{{"type":"Point","metric":"{metric}","data":{{"time":"2024-05-01T10:{:02}:{:02}.000Z","value":{value},"tags":{{"stage":"{stage}"{url_tag}}}}}}}"#,
            secs / 60,
            secs % 60
        )
    }

    fn sample_run() -> Vec<String> {
        let mut lines = vec![
            r#"{"type":"Metric","metric":"http_req_duration","data":{"type":"trend"}}"#.to_string(),
        ];
        for i in 0..100u32 {
            let stage = if i < 50 { "0" } else { "1" };
            lines.push(point("http_req_duration", i * 3, 100.0 + i as f64, stage, None));
            lines.push(point("http_req_failed", i * 3, if i % 25 == 0 { 1.0 } else { 0.0 }, stage, None));
            lines.push(point("vus", i * 3, (i / 10 + 1) as f64, stage, None));
        }
        lines.push(point("http_reqs", 1, 1.0, "0", Some("/api/login")));
        lines.push(point("http_reqs", 2, 1.0, "0", Some("https://shop.example.com/cart")));
        lines.push("not json at all".to_string());
        lines.push(String::new());
        lines
    }

    // -----------------------------------------------------------------------
    // analyze
    // -----------------------------------------------------------------------

    #[test]
    fn analyze_counts_lines_and_builds_stages() {
        let analysis = analyze(sample_run(), MetricNames::http());
        assert_eq!(analysis.parse_stats.accepted, 302);
        assert_eq!(analysis.parse_stats.malformed, 1);
        assert_eq!(analysis.parse_stats.blank, 1);
        assert_eq!(analysis.parse_stats.other_records, 1);
        assert_eq!(analysis.overview.total_requests, 100);
        assert_eq!(analysis.overview.failed_requests, 4);
        assert_eq!(analysis.stages.len(), 2);
        assert_eq!(analysis.stages[0].stage_id, "0");
        assert_eq!(analysis.stages[0].status, StageStatus::Success);
    }

    #[test]
    fn analyze_is_independent_of_line_order() {
        let forward = analyze(sample_run(), MetricNames::http());
        let mut reversed_lines = sample_run();
        reversed_lines.reverse();
        let reversed = analyze(reversed_lines, MetricNames::http());

        assert_eq!(forward.overview, reversed.overview);
        assert_eq!(forward.stages, reversed.stages);
        assert_eq!(forward.narrative, reversed.narrative);
    }

    #[test]
    fn analyze_empty_input_has_no_data() {
        let analysis = analyze(Vec::<String>::new(), MetricNames::http());
        assert_eq!(analysis.overview.status, RunStatus::NoData);
        assert!(analysis.stages.is_empty());
        assert_eq!(analysis.narrative, Narrative::unavailable());
    }

    #[test]
    fn analyze_with_browser_metric_names() {
        let lines = vec![
            point("browser_http_req_duration", 0, 250.0, "0", Some("https://app.example.com/home")),
            point("http_req_duration", 1, 9999.0, "0", None),
        ];
        let analysis = analyze(lines, MetricNames::browser());
        assert_eq!(analysis.overview.total_requests, 1);
        assert_eq!(analysis.series.target().origin(), Some("https://app.example.com"));
    }

    // -----------------------------------------------------------------------
    // build_report
    // -----------------------------------------------------------------------

    #[test]
    fn absolute_url_wins_over_relative_path_and_environment() {
        let analysis = analyze(sample_run(), MetricNames::http());
        let options = ReportOptions {
            environment: Some("STAGING".to_string()),
            ..Default::default()
        };
        let report = build_report(&analysis, "demo-load", &options, &ReportConfig::builtin(), Utc::now());
        assert_eq!(report.target, "https://shop.example.com");
        assert_eq!(report.test_name, "Demo Load Test");
        assert!(report.metadata.is_some());
    }

    #[test]
    fn unknown_test_type_uses_runtime_stages() {
        let analysis = analyze(sample_run(), MetricNames::http());
        let report = build_report(
            &analysis,
            "nightly",
            &ReportOptions::default(),
            &ReportConfig::builtin(),
            Utc::now(),
        );
        assert_eq!(report.test_name, "Load Test");
        assert!(report.metadata.is_none());
        assert!(report.stages_html().contains("Stage 2:"));
    }

    #[test]
    fn default_test_type_is_file_stem() {
        assert_eq!(default_test_type(Path::new("results/demo-spike.json")), "demo-spike");
        assert_eq!(default_test_type(Path::new("")), "");
    }

    // -----------------------------------------------------------------------
    // generate_report
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn generate_report_for_empty_input() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let input = dir.path().join("smoke.json");
        let output = dir.path().join("summary.html");
        tokio::fs::write(&input, "").await.expect("write should succeed");

        let outcome = generate_report(&input, &output, &ReportOptions::default(), &ReportConfig::builtin())
            .await
            .expect("empty input should still produce a report");

        assert_eq!(outcome.status, RunStatus::NoData);
        assert_eq!(outcome.success_rate, "N/A");
        let html = tokio::fs::read_to_string(&output).await.expect("output should exist");
        assert!(html.contains("N/A"));
        assert!(html.contains("Smoke Test"));
        assert!(!html.contains("{{"));
    }

    #[tokio::test]
    async fn generate_report_writes_html_and_json() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let input = dir.path().join("run.json");
        let output = dir.path().join("summary.html");
        let json = dir.path().join("summary.json");
        tokio::fs::write(&input, sample_run().join("\n"))
            .await
            .expect("write should succeed");

        let options = ReportOptions {
            test_type: Some("load".to_string()),
            technical_report_path: Some("report.html".to_string()),
            json_path: Some(json.clone()),
            ..Default::default()
        };
        let outcome = generate_report(&input, &output, &options, &ReportConfig::builtin())
            .await
            .expect("generate_report should succeed");

        assert_eq!(outcome.status, RunStatus::Passed);
        assert_eq!(outcome.success_rate, "96.00%");
        assert_eq!(outcome.parse_stats.accepted, 302);

        let html = tokio::fs::read_to_string(&output).await.expect("html should exist");
        assert!(html.contains("href=\"report.html\""));
        assert!(html.contains("https://shop.example.com"));
        assert!(html.contains("Tests system at expected peak production load."));
        assert!(html.contains("Phase 1: Test Execution"));

        let exported = tokio::fs::read_to_string(&json).await.expect("json should exist");
        let value: serde_json::Value = serde_json::from_str(&exported).expect("valid JSON");
        assert_eq!(value["test_type"], "load");
        assert_eq!(value["overview"]["failed_requests"], 4);
    }

    #[tokio::test]
    async fn generate_report_with_custom_template() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let input = dir.path().join("run.json");
        let template = dir.path().join("mini.html");
        let output = dir.path().join("out.txt");
        tokio::fs::write(&input, sample_run().join("\n")).await.expect("write should succeed");
        tokio::fs::write(&template, "{{TOTAL_REQUESTS}} / {{SUCCESS_RATE}} / {{CUSTOM}}")
            .await
            .expect("write should succeed");

        let options = ReportOptions {
            template_path: Some(template),
            ..Default::default()
        };
        generate_report(&input, &output, &options, &ReportConfig::builtin())
            .await
            .expect("generate_report should succeed");

        let out = tokio::fs::read_to_string(&output).await.expect("output should exist");
        assert_eq!(out, "100 / 96.00% / {{CUSTOM}}");
    }

    #[tokio::test]
    async fn generate_report_skips_line_with_invalid_utf8() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let input = dir.path().join("run.json");
        let output = dir.path().join("summary.html");

        let mut body = point("http_req_duration", 0, 120.0, "0", None).into_bytes();
        body.extend_from_slice(b"\n{\"junk\":\"\xff\xfe\"}\n");
        body.extend_from_slice(point("http_req_duration", 5, 140.0, "0", None).as_bytes());
        body.extend_from_slice(b"\r\n");
        tokio::fs::write(&input, body).await.expect("write should succeed");

        let outcome = generate_report(&input, &output, &ReportOptions::default(), &ReportConfig::builtin())
            .await
            .expect("an undecodable line should not fail the run");

        assert_eq!(outcome.parse_stats.accepted, 2);
        assert_eq!(outcome.parse_stats.malformed, 1);
        let html = tokio::fs::read_to_string(&output).await.expect("output should exist");
        assert!(html.contains("130ms"));
    }

    #[tokio::test]
    async fn generate_report_missing_input_fails() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let err = generate_report(
            dir.path().join("absent.json"),
            dir.path().join("out.html"),
            &ReportOptions::default(),
            &ReportConfig::builtin(),
        )
        .await
        .expect_err("missing input should fail");
        assert!(matches!(err, ReportError::Io(_)));
    }
}
