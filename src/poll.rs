use crate::{
    api::{ApiError, VerifyApi},
    clock::Clock,
    config::Polling,
    model::{FailureKind, JobResult},
};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    AwaitingFirstPoll,
    Polling,
    Completed,
    TimedOut,
    PollError,
}

/// Adaptive wait between polls: constant until the job has been in flight past
/// the threshold, then multiplied by `factor` each cycle up to `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    current_ms: f64,
    factor: f64,
    max_ms: f64,
    threshold: Duration,
}

impl Backoff {
    pub fn from_config(cfg: &Polling) -> Self {
        Self {
            current_ms: cfg.initial_interval_ms as f64,
            factor: cfg.backoff_factor,
            max_ms: cfg.max_interval_ms as f64,
            threshold: Duration::from_millis(cfg.backoff_after_ms),
        }
    }

    /// Interval for the cycle starting at `elapsed` into polling.
    pub fn next(&mut self, elapsed: Duration) -> Duration {
        if elapsed > self.threshold {
            self.current_ms = (self.current_ms * self.factor).min(self.max_ms);
        }
        Duration::from_secs_f64(self.current_ms / 1000.0)
    }

    pub fn current(&self) -> Duration {
        Duration::from_secs_f64(self.current_ms / 1000.0)
    }
}

pub struct PollEngine<'a> {
    api: &'a dyn VerifyApi,
    clock: &'a dyn Clock,
    cfg: &'a Polling,
}

impl<'a> PollEngine<'a> {
    pub fn new(api: &'a dyn VerifyApi, clock: &'a dyn Clock, cfg: &'a Polling) -> Self {
        Self { api, clock, cfg }
    }

    /// Poll `job_id` until it resolves, the transport fails, or the deadline passes.
    ///
    /// Only `result`'s polling trace and outcome fields are written. The returned
    /// state is always `Completed`, `TimedOut` or `PollError`.
    pub fn run(&self, job_id: &str, result: &mut JobResult) -> PollState {
        let t0 = self.clock.now();
        let max_wait = self.cfg.max_wait();
        let mut backoff = Backoff::from_config(self.cfg);
        let mut state = PollState::AwaitingFirstPoll;
        let mut last_success: Option<Duration> = None;

        loop {
            let elapsed = self.clock.now() - t0;
            if elapsed > max_wait {
                let msg = format!("Timeout after {}s", max_wait.as_secs_f64());
                warn!("job {} for {}: {}", job_id, result.email, msg);
                result.fail(FailureKind::Timeout, msg);
                return PollState::TimedOut;
            }

            let interval = backoff.next(elapsed);
            if state == PollState::Polling {
                self.clock.sleep(interval);
            }

            let view = match self.api.job_status(job_id) {
                Ok(v) => v,
                Err(err) => {
                    let msg = poll_error_message(&err);
                    warn!("job {} for {}: {} ({})", job_id, result.email, msg, err);
                    result.fail(FailureKind::Poll, msg);
                    return PollState::PollError;
                }
            };

            let now = self.clock.now();
            result.poll_count += 1;
            if let Some(prev) = last_success {
                result
                    .poll_intervals_ms
                    .push((now - prev).as_secs_f64() * 1000.0);
            }
            last_success = Some(now);
            state = PollState::Polling;

            let Some(check) = view.first_check() else {
                debug!("job {} poll #{}: no checks yet", job_id, result.poll_count);
                continue;
            };

            if !check.status.is_terminal() {
                debug!(
                    "job {} poll #{}: pending, next interval {:?}",
                    job_id,
                    result.poll_count,
                    backoff.current()
                );
                continue;
            }

            debug!(
                "job {} poll #{}: terminal status {}",
                job_id, result.poll_count, check.status
            );
            result.observed_status = Some(check.status.clone());
            result.smtp_code = check.smtp_code;
            result.bounce_reason = check.bounce_reason.clone();
            result.completed_at = Some(self.clock.wall(self.clock.now()));
            return PollState::Completed;
        }
    }
}

pub fn poll_error_message(err: &ApiError) -> String {
    match err {
        ApiError::Status { code, .. } => format!("Job status API returned {code}"),
        ApiError::Timeout => "Polling timeout".to_string(),
        ApiError::Connect(_) => "Connection error during polling".to_string(),
        ApiError::Decode(detail) | ApiError::Other(detail) => format!("Polling error: {detail}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(d: Duration) -> f64 {
        d.as_secs_f64() * 1000.0
    }

    #[test]
    fn interval_is_flat_before_threshold() {
        let mut b = Backoff::from_config(&Polling::default());
        for s in 0..=5 {
            assert!((ms(b.next(Duration::from_secs(s))) - 500.0).abs() < 1e-3);
        }
    }

    #[test]
    fn interval_grows_then_clamps_after_threshold() {
        let mut b = Backoff::from_config(&Polling::default());
        let after = Duration::from_millis(5_001);
        let expected = [600.0, 720.0, 864.0, 1036.8, 1244.16, 1492.992, 1791.5904, 2000.0, 2000.0];
        let mut prev = 0.0;
        for want in expected {
            let got = ms(b.next(after));
            assert!((got - want).abs() < 1e-3, "got {got}, want {want}");
            assert!(got >= prev);
            assert!(got <= 2000.0 + 1e-3);
            prev = got;
        }
    }

    #[test]
    fn poll_error_messages() {
        assert_eq!(
            poll_error_message(&ApiError::Status { code: 404, body: "nope".into() }),
            "Job status API returned 404"
        );
        assert_eq!(poll_error_message(&ApiError::Timeout), "Polling timeout");
        assert_eq!(
            poll_error_message(&ApiError::Connect("refused".into())),
            "Connection error during polling"
        );
    }
}
