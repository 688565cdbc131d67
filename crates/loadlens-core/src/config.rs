use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::telemetry::TargetTracker;

/// Target label used when nothing better is known.
pub const DEFAULT_TARGET: &str = "Test Target";

/// Display name used for test types missing from the name table.
pub const DEFAULT_TEST_NAME: &str = "Load Test";

// ---------------------------------------------------------------------------
// Run metadata
// ---------------------------------------------------------------------------

/// One phase of a hand-written load profile description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimelinePhase {
    pub phase: String,
    pub duration: String,
    pub load: String,
    pub objective: String,
}

/// Descriptive narrative for a named test type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunMetadata {
    pub purpose: String,
    pub pattern: String,
    pub description: String,
    #[serde(default)]
    pub timeline: Vec<TimelinePhase>,
}

// ---------------------------------------------------------------------------
// ReportConfig
// ---------------------------------------------------------------------------

/// Lookup tables the report generator reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportConfig {
    /// Environment name -> base URL.
    #[serde(default)]
    pub environments: BTreeMap<String, String>,
    /// Test type -> descriptive metadata.
    #[serde(default)]
    pub profiles: BTreeMap<String, RunMetadata>,
    /// Test type -> display name.
    #[serde(default)]
    pub test_names: BTreeMap<String, String>,
}

impl ReportConfig {
    /// The tables shipped with loadlens.
    pub fn builtin() -> Self {
        Self {
            environments: builtin_environments(),
            profiles: builtin_profiles(),
            test_names: builtin_test_names(),
        }
    }

    /// Apply `overlay` on top of `self`. Overlay entries win.
    pub fn merge(mut self, overlay: ReportConfig) -> Self {
        self.environments.extend(overlay.environments);
        self.profiles.extend(overlay.profiles);
        self.test_names.extend(overlay.test_names);
        self
    }

    pub fn metadata(&self, test_type: &str) -> Option<&RunMetadata> {
        self.profiles.get(test_type)
    }

    pub fn test_name(&self, test_type: &str) -> String {
        self.test_names
            .get(test_type)
            .cloned()
            .unwrap_or_else(|| DEFAULT_TEST_NAME.to_string())
    }

    /// Base URL for an `ENV`-style value.
    ///
    /// Values that already look like URLs are used verbatim; unknown names map
    /// to [`DEFAULT_TARGET`].
    pub fn environment_url(&self, env: &str) -> String {
        if env.starts_with("http") {
            return env.to_string();
        }
        self.environments
            .get(env)
            .cloned()
            .unwrap_or_else(|| DEFAULT_TARGET.to_string())
    }

    /// Decide what the report names as the tested target.
    ///
    /// Precedence: absolute URL seen in the stream, then the environment,
    /// then the first relative path seen, then [`DEFAULT_TARGET`].
    pub fn resolve_target(&self, tracker: &TargetTracker, env: Option<&str>) -> String {
        if let Some(origin) = tracker.origin() {
            return origin.to_string();
        }
        if let Some(env) = env.filter(|e| !e.trim().is_empty()) {
            return self.environment_url(env.trim());
        }
        tracker
            .relative_path()
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_TARGET.to_string())
    }
}

/// Read a JSON config overlay and merge it over the built-in tables.
pub async fn load_config(path: impl AsRef<Path>) -> Result<ReportConfig, ReportError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    let overlay: ReportConfig = serde_json::from_str(&content)
        .map_err(|e| ReportError::Config(format!("{}: {e}", path.display())))?;
    tracing::debug!(
        path = %path.display(),
        environments = overlay.environments.len(),
        profiles = overlay.profiles.len(),
        "loaded report config overlay"
    );
    Ok(ReportConfig::builtin().merge(overlay))
}

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

fn builtin_environments() -> BTreeMap<String, String> {
    [
        ("PREPROD", "https://preprod.example.com"),
        ("STAGING", "https://staging.example.com"),
        ("CANARY", "https://canary.example.com"),
        ("RELEASE", "https://release.example.com"),
        ("BETA", "https://beta.example.com"),
        ("PROD", "https://www.example.com"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn builtin_test_names() -> BTreeMap<String, String> {
    [
        ("demo-smoke", "Demo Smoke Test"),
        ("demo-load", "Demo Load Test"),
        ("demo-stress", "Demo Stress Test"),
        ("demo-spike", "Demo Spike Test"),
        ("smoke", "Smoke Test"),
        ("load", "Load Test"),
        ("stress", "Stress Test"),
        ("spike", "Spike Test"),
        ("soak", "Soak Test"),
        ("local", "Local Test"),
        ("api-smoke", "API Smoke Test"),
        ("api-load", "API Load Test"),
        ("api-stress", "API Stress Test"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn phase(phase: &str, duration: &str, load: &str, objective: &str) -> TimelinePhase {
    TimelinePhase {
        phase: phase.to_string(),
        duration: duration.to_string(),
        load: load.to_string(),
        objective: objective.to_string(),
    }
}

fn profile(
    purpose: &str,
    pattern: &str,
    description: &str,
    timeline: Vec<TimelinePhase>,
) -> RunMetadata {
    RunMetadata {
        purpose: purpose.to_string(),
        pattern: pattern.to_string(),
        description: description.to_string(),
        timeline,
    }
}

fn builtin_profiles() -> BTreeMap<String, RunMetadata> {
    let mut profiles = BTreeMap::new();

    profiles.insert(
        "demo-smoke".to_string(),
        profile(
            "Quick validation with constant load",
            "Constant load - 10 concurrent users for 1 minute",
            "Validates basic system health and ensures all critical endpoints respond correctly. This is a sanity check before running more intensive tests.",
            vec![phase(
                "Execution",
                "1 minute",
                "10 users (constant)",
                "Verify system responds correctly under minimal load",
            )],
        ),
    );

    profiles.insert(
        "demo-load".to_string(),
        profile(
            "Normal capacity testing with gradual load increase",
            "Gradual ramp from 0 to 200 users over 5 minutes",
            "Tests system behavior under normal peak load conditions. Gradually increases load to identify capacity limits and monitors performance degradation as load increases.",
            vec![
                phase("Warm-up", "1 minute", "0 → 100 users", "Gradual ramp-up to establish baseline performance"),
                phase("Peak Load", "2 minutes", "100 → 200 users", "Test system at normal peak capacity"),
                phase("Ramp Down (Recovery)", "1 minute", "200 → 100 users", "Monitor how system handles decreasing load"),
                phase("Cool Down", "1 minute", "100 → 0 users", "Graceful shutdown and final cleanup"),
            ],
        ),
    );

    profiles.insert(
        "demo-stress".to_string(),
        profile(
            "Find system breaking point by pushing beyond normal capacity",
            "Progressive ramp from 0 to 200 users (above normal limits)",
            "Stress tests push the system beyond its expected peak load to identify breaking points, bottlenecks, and failure modes. Helps determine maximum capacity before degradation.",
            vec![
                phase("Warm-up", "1 minute", "0 → 100 users", "Establish baseline at normal load"),
                phase("Normal Peak", "2 minutes", "100 → 150 users", "Operate at expected peak capacity"),
                phase("Stress Phase", "2 minutes", "150 → 200 users", "Push system beyond normal limits to find breaking point"),
            ],
        ),
    );

    profiles.insert(
        "demo-spike".to_string(),
        profile(
            "Test system resilience under sudden traffic bursts",
            "Sudden spike from 50 to 200 users in 30 seconds",
            "Spike tests simulate sudden traffic surges like flash sales, viral content, or breaking news. Tests auto-scaling, circuit breakers, and system recovery capabilities.",
            vec![
                phase("Normal Traffic", "1 minute", "0 → 50 users", "Establish baseline under normal conditions"),
                phase("SPIKE!", "30 seconds", "50 → 200 users (4x increase)", "Sudden traffic burst - tests auto-scaling and resilience"),
                phase("Sustained Peak", "2 minutes", "200 users (constant)", "Maintain spike load to test sustained high traffic"),
                phase("Recovery", "30 seconds", "200 → 50 users", "Quick drop to test system recovery"),
                phase("Cool Down", "1 minute", "50 → 0 users", "Return to normal and monitor cleanup"),
            ],
        ),
    );

    profiles.insert(
        "smoke".to_string(),
        profile(
            "Pre-deployment validation",
            "Minimal load test with 5-10 users",
            "Validates critical paths before deployment.",
            vec![phase("Validation", "1-2 minutes", "5-10 users", "Verify critical functionality")],
        ),
    );

    profiles.insert(
        "load".to_string(),
        profile(
            "Peak capacity validation",
            "Gradual ramp to 2400 users over 90 minutes",
            "Tests system at expected peak production load.",
            vec![phase("Test Execution", "90 minutes", "200 → 2400 users", "Validate production capacity")],
        ),
    );

    profiles.insert(
        "stress".to_string(),
        profile(
            "Find breaking point",
            "Progressive load increase beyond capacity",
            "Identifies system limits and failure modes.",
            vec![phase("Stress Testing", "60 minutes", "500 → 3000 users", "Determine maximum capacity")],
        ),
    );

    profiles.insert(
        "spike".to_string(),
        profile(
            "Sudden traffic surge handling",
            "Rapid spike to test auto-scaling",
            "Tests response to unexpected traffic bursts.",
            vec![phase("Spike Test", "15 minutes", "100 → 2000 users", "Test auto-scaling and resilience")],
        ),
    );

    profiles.insert(
        "soak".to_string(),
        profile(
            "Long-term stability and memory leak detection",
            "Sustained load for extended duration",
            "Runs for 4 hours to detect memory leaks and gradual degradation.",
            vec![phase("Soak Test", "4 hours", "500 users (constant)", "Monitor long-term stability")],
        ),
    );

    profiles.insert(
        "local".to_string(),
        profile(
            "Local development and learning",
            "Light load for testing on local machine",
            "Low-intensity test for learning and local development.",
            vec![phase("Local Test", "15 minutes", "2-10 users", "Learn k6 and validate locally")],
        ),
    );

    profiles
}
