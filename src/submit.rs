use crate::{
    api::{ApiError, VerifyApi},
    clock::Clock,
};
use tracing::{debug, warn};

/// Outcome of one submission attempt. Exactly one of `job_id` and `error` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub job_id: Option<String>,
    pub error: Option<String>,
    pub latency_ms: f64,
}

/// Submit a single address. Failures are returned as data, never raised.
pub fn submit(api: &dyn VerifyApi, clock: &dyn Clock, email: &str) -> Submission {
    let started = clock.now();
    let res = api.submit(email);
    let latency_ms = (clock.now() - started).as_secs_f64() * 1000.0;

    match res {
        Ok(job_id) => {
            debug!("submitted {} job_id={} in {:.2}ms", email, job_id, latency_ms);
            Submission {
                job_id: Some(job_id),
                error: None,
                latency_ms,
            }
        }
        Err(err) => {
            let msg = submission_error_message(&err);
            warn!("submission failed for {}: {}", email, msg);
            Submission {
                job_id: None,
                error: Some(msg),
                latency_ms,
            }
        }
    }
}

pub fn submission_error_message(err: &ApiError) -> String {
    match err {
        ApiError::Status { code, body } => format!("API returned {code}: {body}"),
        ApiError::Timeout => "API request timeout".to_string(),
        ApiError::Connect(_) => "Connection error - is the API running?".to_string(),
        ApiError::Decode(detail) | ApiError::Other(detail) => {
            format!("Unexpected error: {detail}")
        }
    }
}
