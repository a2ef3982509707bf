use crate::{
    api::http::HttpVerifyApi,
    clock::SystemClock,
    config::Config,
    dataset,
    metrics::{summarize, RunSummary},
    model::{ExpectedCategory, TestCase},
    pipeline::{Pipeline, RunOutcome},
    report::{self, ErrorLog, JsonReport, TestMetadata},
    runner::JobRunner,
    util::{ensure_dir, now_rfc3339, run_stamp, sha256_hex},
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_CONFIG: &str = "mailcheck-bench.toml";

#[derive(Parser, Debug)]
#[command(name = "mailcheck-bench")]
#[command(about = "Serial latency and correctness harness for a job-based email verification API")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./mailcheck-bench.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override api.base_url, e.g. http://localhost:8080
    #[arg(long)]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Smoke-test the first few addresses, then run the whole dataset.
    Run {
        /// CSV with columns email,expected_result,category.
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Verify a single address and print its record.
    Check {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "valid")]
        expected: String,
        #[arg(long, default_value = "adhoc")]
        label: String,
    },
    /// Recompute the summary of a previous JSON report.
    Summarize {
        #[arg(long)]
        results: PathBuf,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let mut cfg = load_config(args.config.as_deref())?;
    if let Some(url) = &args.base_url {
        cfg.api.base_url = url.clone();
        cfg.validate()?;
    }

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Run { input, out_dir } => run(&cfg, input.as_deref(), out_dir.as_deref()),
        Command::Check {
            email,
            expected,
            label,
        } => check(&cfg, email, expected, label),
        Command::Summarize { results } => summarize_report(&cfg, results),
    }
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    if let Some(p) = user {
        return Config::load(p);
    }
    let default = PathBuf::from(DEFAULT_CONFIG);
    if default.exists() {
        Config::load(&default)
    } else {
        Ok(Config::default())
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.logging.error_log_dir).join("mailcheck-bench.log"))
}

fn run(cfg: &Config, input: Option<&Path>, out_override: Option<&Path>) -> Result<()> {
    let input = input
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.dataset.default_input));
    let cases = dataset::load(cfg, &input)?;
    if cases.is_empty() {
        bail!("dataset has no rows: {}", input.display());
    }

    let out_dir = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.output.out_dir));
    ensure_dir(&out_dir)?;

    let stamp = run_stamp(OffsetDateTime::now_utc());
    let error_log = ErrorLog::new(
        PathBuf::from(&cfg.logging.error_log_dir).join(format!("test-errors-{stamp}.log")),
    );

    let api = HttpVerifyApi::new(cfg)?;
    let clock = SystemClock::new();
    let runner = JobRunner::new(&api, &clock, cfg);
    let pipeline = Pipeline::new(cfg, runner, Some(&error_log));

    info!(
        "testing {} emails from {} against {}",
        cases.len(),
        input.display(),
        api.endpoint()
    );

    match pipeline.run(&cases) {
        RunOutcome::SmokeFailed { results, summary } => {
            let path = out_dir.join(format!("test-summary-{}emails-{stamp}.txt", results.len()));
            report::write_summary(&results, &summary, api.endpoint(), &path)?;
            info!("partial results saved to {}", path.display());
            Err(anyhow!(
                "smoke test completion rate {:.1}% below threshold {:.1}%; check the service before a full run",
                summary.completion_rate,
                cfg.run.smoke_completion_threshold
            ))
        }
        outcome @ RunOutcome::Completed { .. } => {
            write_outputs(cfg, &outcome, api.endpoint(), &out_dir, &stamp)?;
            if error_log.exists() {
                info!("error log: {}", error_log.path().display());
            }
            if cfg.output.print_summary {
                print_final(outcome.summary())?;
            }
            Ok(())
        }
    }
}

fn write_outputs(cfg: &Config, outcome: &RunOutcome, endpoint: &str, out_dir: &Path, stamp: &str) -> Result<()> {
    let results = outcome.results();
    let summary = outcome.summary();

    if cfg.output.write_csv {
        let path = out_dir.join(format!("test-results-{stamp}.csv"));
        report::write_csv(results, &path)?;
        info!("csv output: {}", path.display());
    }

    if cfg.output.write_json {
        let path = out_dir.join(format!("test-results-{stamp}.json"));
        let doc = JsonReport {
            test_metadata: TestMetadata {
                timestamp: now_rfc3339(),
                total_emails: results.len(),
                api_endpoint: endpoint.to_string(),
                config_sha256: sha256_hex(cfg.normalized_for_hash().as_bytes()),
            },
            summary: summary.clone(),
            results: results.to_vec(),
        };
        report::write_json(&doc, &path)?;
        info!("json output: {}", path.display());
    }

    if cfg.output.write_summary {
        let path = out_dir.join(format!("test-summary-{stamp}.txt"));
        report::write_summary(results, summary, endpoint, &path)?;
        info!("summary report: {}", path.display());
    }

    Ok(())
}

fn print_final(summary: &RunSummary) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "total_emails": summary.total_emails,
            "completed": summary.completed,
            "completion_rate": summary.completion_rate,
            "success_rate": summary.success_rate,
            "throughput": summary.throughput,
            "avg_total_ms": summary.timing.total_time.avg,
            "avg_processing_ms": summary.timing.processing_time.avg,
        }))?
    );
    Ok(())
}

fn check(cfg: &Config, email: &str, expected: &str, label: &str) -> Result<()> {
    let expected = ExpectedCategory::parse(expected)
        .ok_or_else(|| anyhow!("unknown expected category: {expected}"))?;
    let api = HttpVerifyApi::new(cfg)?;
    let clock = SystemClock::new();
    let runner = JobRunner::new(&api, &clock, cfg);
    let result = runner.run(&TestCase::new(email, expected, label));
    println!("{}", serde_json::to_string_pretty(&report::JobRecord::from(&result))?);
    Ok(())
}

fn summarize_report(cfg: &Config, path: &Path) -> Result<()> {
    let doc = report::read_json(path)?;
    let summary = summarize(&doc.results, &cfg.run.percentiles);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
