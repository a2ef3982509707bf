pub mod http;
pub mod types;

pub use types::{ApiError, EmailCheck, JobView, SubmitResponse};

/// The two endpoints of the verification service.
pub trait VerifyApi {
    /// Submit a single-email batch; returns the job id on `201 Created`.
    fn submit(&self, email: &str) -> Result<String, ApiError>;
    /// Fetch the current state of a job; succeeds only on `200 OK`.
    fn job_status(&self, job_id: &str) -> Result<JobView, ApiError>;
}
