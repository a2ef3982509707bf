use crate::model::JobStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[serde(default)]
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    #[serde(default)]
    pub email_checks: Vec<EmailCheck>,
}

impl JobView {
    /// Jobs carry exactly one address, so only the first check matters.
    pub fn first_check(&self) -> Option<&EmailCheck> {
        self.email_checks.first()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailCheck {
    #[serde(default)]
    pub email: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub smtp_code: Option<i64>,
    #[serde(default)]
    pub bounce_reason: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unexpected status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("{0}")]
    Other(String),
}
