use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use loadlens_core::config::{load_config, ReportConfig};
use loadlens_core::engine::{generate_report, ReportOptions};
use loadlens_core::telemetry::MetricNames;
use loadlens_core::ReportError;

#[derive(Parser, Debug)]
#[command(name = "loadlens")]
#[command(about = "Turn k6 JSON output into an executive summary report", long_about = None)]
#[command(version)]
struct Cli {
    /// k6 JSON Lines output (`k6 run --out json=FILE`)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Where to write the executive summary
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Link target for the full technical report
    #[arg(value_name = "TECHNICAL_REPORT")]
    technical_report: Option<String>,

    /// Test type used for naming and the profile description (defaults to the input file name)
    #[arg(long)]
    test_type: Option<String>,

    /// Custom HTML template
    #[arg(long)]
    template: Option<PathBuf>,

    /// JSON file with extra environments, profiles or test names
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also export the report as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Which metric names carry the request data
    #[arg(long, value_enum, default_value = "http")]
    metrics: MetricPreset,

    /// Environment name or base URL shown when the data has no absolute URL
    #[arg(long, env = "ENV")]
    environment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MetricPreset {
    Http,
    Browser,
}

impl MetricPreset {
    fn names(self) -> MetricNames {
        match self {
            MetricPreset::Http => MetricNames::http(),
            MetricPreset::Browser => MetricNames::browser(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ReportError> {
    let config = match &cli.config {
        Some(path) => load_config(path).await?,
        None => ReportConfig::builtin(),
    };

    let options = ReportOptions {
        test_type: cli.test_type,
        technical_report_path: cli.technical_report,
        template_path: cli.template,
        json_path: cli.json,
        metrics: cli.metrics.names(),
        environment: cli.environment,
    };

    let outcome = generate_report(&cli.input, &cli.output, &options, &config).await?;
    tracing::debug!(
        output = %outcome.output_path.display(),
        skipped = outcome.parse_stats.skipped(),
        "executive summary generated"
    );

    println!("Overall Status: {}", outcome.status.label());
    println!("Success Rate: {}", outcome.success_rate);
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
