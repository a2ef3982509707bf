use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedCategory {
    Valid,
    Invalid,
    Disposable,
}

impl ExpectedCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "valid" => Some(Self::Valid),
            "invalid" => Some(Self::Invalid),
            "disposable" => Some(Self::Disposable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Disposable => "disposable",
        }
    }
}

impl fmt::Display for ExpectedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status as reported by the verification service.
///
/// Unrecognised strings are kept verbatim in `Other` so they are still
/// recorded and counted, but never satisfy an expectation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending,
    Valid,
    Invalid,
    CatchAll,
    Unknown,
    Greylisted,
    Other(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PENDING" => Self::Pending,
            "VALID" => Self::Valid,
            "INVALID" => Self::Invalid,
            "CATCH_ALL" => Self::CatchAll,
            "UNKNOWN" => Self::Unknown,
            "GREYLISTED" => Self::Greylisted,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::CatchAll => "CATCH_ALL",
            Self::Unknown => "UNKNOWN",
            Self::Greylisted => "GREYLISTED",
            Self::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One input row: an address and what the service is expected to say about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub email: String,
    pub expected: ExpectedCategory,
    pub dataset_label: String,
}

impl TestCase {
    pub fn new(email: impl Into<String>, expected: ExpectedCategory, label: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            expected,
            dataset_label: label.into(),
        }
    }
}

/// Which of the mutually exclusive failure paths ended a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Submission,
    Poll,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub email: String,
    pub expected: ExpectedCategory,
    pub dataset_label: String,

    #[serde(with = "time::serde::rfc3339::option", default)]
    pub submitted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub completed_at: Option<OffsetDateTime>,
    pub submission_latency_ms: Option<f64>,
    pub queue_latency_ms: Option<f64>,
    /// Residual estimate; may be negative for very fast jobs and is kept as-is.
    pub processing_latency_ms: Option<f64>,
    pub total_latency_ms: Option<f64>,

    pub poll_count: u32,
    pub poll_intervals_ms: Vec<f64>,

    pub job_id: Option<String>,
    pub observed_status: Option<JobStatus>,
    pub smtp_code: Option<i64>,
    pub bounce_reason: Option<String>,
    pub matches_expected: Option<bool>,

    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    pub timed_out: bool,
}

impl JobResult {
    pub fn new(case: &TestCase) -> Self {
        Self {
            email: case.email.clone(),
            expected: case.expected,
            dataset_label: case.dataset_label.clone(),
            submitted_at: None,
            completed_at: None,
            submission_latency_ms: None,
            queue_latency_ms: None,
            processing_latency_ms: None,
            total_latency_ms: None,
            poll_count: 0,
            poll_intervals_ms: Vec::new(),
            job_id: None,
            observed_status: None,
            smtp_code: None,
            bounce_reason: None,
            matches_expected: None,
            error: None,
            failure: None,
            timed_out: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.observed_status.is_some()
    }

    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>) {
        self.failure = Some(kind);
        self.timed_out = kind == FailureKind::Timeout;
        self.error = Some(message.into());
    }

    pub fn mean_poll_interval_ms(&self) -> Option<f64> {
        if self.poll_intervals_ms.is_empty() {
            return None;
        }
        Some(self.poll_intervals_ms.iter().sum::<f64>() / self.poll_intervals_ms.len() as f64)
    }
}
