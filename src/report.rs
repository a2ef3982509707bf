use crate::{
    metrics::RunSummary,
    model::JobResult,
    util::{now_rfc3339, rfc3339, round2},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Flat per-job row for tabular export.
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub email: String,
    pub category: String,
    pub expected_result: String,
    pub actual_status: Option<String>,
    pub smtp_code: Option<i64>,
    pub bounce_reason: Option<String>,
    pub match_expected: Option<bool>,
    pub api_request_time: Option<f64>,
    pub queue_time: Option<f64>,
    pub processing_time: Option<f64>,
    pub total_time: Option<f64>,
    pub poll_count: u32,
    pub poll_interval_avg: Option<f64>,
    pub timestamp_submitted: Option<String>,
    pub timestamp_completed: Option<String>,
    pub job_id: Option<String>,
    pub error: Option<String>,
    pub timeout: bool,
}

impl From<&JobResult> for JobRecord {
    fn from(r: &JobResult) -> Self {
        Self {
            email: r.email.clone(),
            category: r.dataset_label.clone(),
            expected_result: r.expected.to_string(),
            actual_status: r.observed_status.as_ref().map(|s| s.to_string()),
            smtp_code: r.smtp_code,
            bounce_reason: r.bounce_reason.clone(),
            match_expected: r.matches_expected,
            api_request_time: r.submission_latency_ms.map(round2),
            queue_time: r.queue_latency_ms.map(round2),
            processing_time: r.processing_latency_ms.map(round2),
            total_time: r.total_latency_ms.map(round2),
            poll_count: r.poll_count,
            poll_interval_avg: r.mean_poll_interval_ms().map(round2),
            timestamp_submitted: r.submitted_at.map(rfc3339),
            timestamp_completed: r.completed_at.map(rfc3339),
            job_id: r.job_id.clone(),
            error: r.error.clone(),
            timeout: r.timed_out,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestMetadata {
    pub timestamp: String,
    pub total_emails: usize,
    pub api_endpoint: String,
    pub config_sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub test_metadata: TestMetadata,
    pub summary: RunSummary,
    pub results: Vec<JobResult>,
}

pub fn write_csv(results: &[JobResult], path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("create csv: {}", path.display()))?;
    for r in results {
        w.serialize(JobRecord::from(r))?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_json(report: &JsonReport, path: &Path) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("write json: {}", path.display()))
}

pub fn read_json(path: &Path) -> Result<JsonReport> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading report: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing report: {}", path.display()))
}

pub fn write_summary(results: &[JobResult], summary: &RunSummary, endpoint: &str, path: &Path) -> Result<()> {
    std::fs::write(path, render_summary(results, summary, endpoint))
        .with_context(|| format!("write summary: {}", path.display()))
}

pub fn render_summary(results: &[JobResult], s: &RunSummary, endpoint: &str) -> String {
    let rule = "-".repeat(80);
    let banner = "=".repeat(80);
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{banner}\nEMAIL VALIDATION PERFORMANCE TEST REPORT\n{banner}\n");
    let _ = writeln!(out, "Test Date: {}", now_rfc3339());
    let _ = writeln!(out, "API Endpoint: {endpoint}\n");

    let _ = writeln!(out, "OVERALL STATISTICS\n{rule}");
    let _ = writeln!(out, "Total Emails Tested: {}", s.total_emails);
    let _ = writeln!(out, "Completed: {} ({:.1}%)", s.completed, s.completion_rate);
    let _ = writeln!(out, "Errors: {}", s.errors);
    let _ = writeln!(out, "Timeouts: {}", s.timeouts);
    let _ = writeln!(out, "Success Rate (Matches Expected): {:.1}%", s.success_rate);
    let _ = writeln!(out, "Throughput: {:.2} emails/second\n", s.throughput);

    let _ = writeln!(out, "TIMING STATISTICS\n{rule}");
    for (title, stats) in [
        ("Total Time (ms)", &s.timing.total_time),
        ("API Request Time (ms)", &s.timing.api_time),
        ("Processing Time (ms)", &s.timing.processing_time),
    ] {
        let _ = writeln!(out, "{title}:");
        let _ = writeln!(out, "  Min: {:.2}", stats.min);
        let _ = writeln!(out, "  Max: {:.2}", stats.max);
        let _ = writeln!(out, "  Avg: {:.2}", stats.avg);
        for (p, v) in &stats.percentiles {
            let _ = writeln!(out, "  P{p}: {v:.2}");
        }
        out.push('\n');
    }

    let _ = writeln!(out, "STATUS BREAKDOWN\n{rule}");
    for (status, count) in &s.status_breakdown {
        let _ = writeln!(out, "  {status}: {count}");
    }
    out.push('\n');

    let _ = writeln!(out, "CATEGORY BREAKDOWN\n{rule}");
    for (label, c) in &s.category_breakdown {
        let _ = writeln!(out, "  {label}:");
        let _ = writeln!(
            out,
            "    Total: {}, Completed: {}, Matched: {} ({:.1}%), Errors: {}",
            c.total,
            c.completed,
            c.matched,
            c.match_rate(),
            c.errors
        );
    }
    out.push('\n');

    let _ = writeln!(out, "ERRORS\n{rule}");
    let mut any = false;
    for r in results {
        if let Some(err) = &r.error {
            any = true;
            let _ = writeln!(out, "  {}: {}", r.email, err);
        }
    }
    if !any {
        let _ = writeln!(out, "  No errors");
    }
    out
}

/// Append-only side channel of per-job failures, one line per errored job.
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn record(&self, result: &JobResult) -> Result<()> {
        let Some(err) = &result.error else {
            return Ok(());
        };
        if let Some(parent) = self.path.parent() {
            crate::util::ensure_dir(parent)?;
        }
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open error log: {}", self.path.display()))?;
        writeln!(f, "{} - {}: {}", now_rfc3339(), result.email, err)?;
        Ok(())
    }
}
