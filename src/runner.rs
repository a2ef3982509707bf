use crate::{
    api::VerifyApi,
    classify,
    clock::Clock,
    config::Config,
    latency,
    model::{FailureKind, JobResult, TestCase},
    poll::{PollEngine, PollState},
    submit::submit,
};
use tracing::info;

/// Runs one test case end to end: submit, poll, decompose latency, classify.
pub struct JobRunner<'a> {
    api: &'a dyn VerifyApi,
    clock: &'a dyn Clock,
    cfg: &'a Config,
}

impl<'a> JobRunner<'a> {
    pub fn new(api: &'a dyn VerifyApi, clock: &'a dyn Clock, cfg: &'a Config) -> Self {
        Self { api, clock, cfg }
    }

    /// Always returns a complete record; failures are captured on it.
    pub fn run(&self, case: &TestCase) -> JobResult {
        let mut result = JobResult::new(case);
        result.submitted_at = Some(self.clock.wall(self.clock.now()));

        let sub = submit(self.api, self.clock, &case.email);
        result.submission_latency_ms = Some(sub.latency_ms);

        let job_id = match (sub.job_id, sub.error) {
            (Some(id), None) => id,
            (_, err) => {
                result.fail(
                    FailureKind::Submission,
                    err.unwrap_or_else(|| "submission returned no job id".to_string()),
                );
                return result;
            }
        };
        result.job_id = Some(job_id.clone());

        let engine = PollEngine::new(self.api, self.clock, &self.cfg.polling);
        let state = engine.run(&job_id, &mut result);

        if state == PollState::Completed {
            latency::apply(&mut result);
            classify::apply(&mut result);
            info!(
                "{} -> {} (expected {}, match={}) total={:.2}ms polls={}",
                result.email,
                result.observed_status.as_ref().map(|s| s.as_str()).unwrap_or("-"),
                result.expected,
                result.matches_expected.unwrap_or(false),
                result.total_latency_ms.unwrap_or(0.0),
                result.poll_count
            );
        }

        result
    }
}
