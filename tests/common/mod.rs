#![allow(dead_code)]

use mailcheck_bench::{
    api::{ApiError, EmailCheck, JobView, VerifyApi},
    clock::ManualClock,
    model::JobStatus,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Script {
    RejectSubmit(u16),
    SubmitTimeout,
    Resolve { pending_polls: u32, status: JobStatus },
    NeverResolves,
    FailPollAfter { ok_polls: u32, code: u16 },
}

/// In-process stand-in for the verification service. Every request charges
/// its cost against the shared virtual clock.
pub struct ScriptedApi {
    pub clock: ManualClock,
    pub submit_cost: Duration,
    pub poll_cost: Duration,
    scripts: HashMap<String, Script>,
    polls: RefCell<HashMap<String, u32>>,
}

impl ScriptedApi {
    pub fn new(clock: &ManualClock) -> Self {
        Self {
            clock: clock.clone(),
            submit_cost: Duration::from_millis(50),
            poll_cost: Duration::ZERO,
            scripts: HashMap::new(),
            polls: RefCell::new(HashMap::new()),
        }
    }

    pub fn script(mut self, email: &str, script: Script) -> Self {
        self.scripts.insert(email.to_string(), script);
        self
    }

    pub fn polls_for(&self, email: &str) -> u32 {
        self.polls.borrow().get(&job_id(email)).copied().unwrap_or(0)
    }
}

fn job_id(email: &str) -> String {
    format!("job-{email}")
}

impl VerifyApi for ScriptedApi {
    fn submit(&self, email: &str) -> Result<String, ApiError> {
        self.clock.advance(self.submit_cost);
        match self.scripts.get(email) {
            Some(Script::RejectSubmit(code)) => Err(ApiError::Status {
                code: *code,
                body: "rejected".into(),
            }),
            Some(Script::SubmitTimeout) => Err(ApiError::Timeout),
            Some(_) => Ok(job_id(email)),
            None => Err(ApiError::Connect("no route".into())),
        }
    }

    fn job_status(&self, id: &str) -> Result<JobView, ApiError> {
        self.clock.advance(self.poll_cost);
        let email = id.trim_start_matches("job-");
        let seen = {
            let mut polls = self.polls.borrow_mut();
            let n = polls.entry(id.to_string()).or_insert(0);
            *n += 1;
            *n
        };
        let status = match self.scripts.get(email) {
            Some(Script::Resolve { pending_polls, status }) => {
                if seen > *pending_polls {
                    status.clone()
                } else {
                    JobStatus::Pending
                }
            }
            Some(Script::FailPollAfter { ok_polls, code }) => {
                if seen > *ok_polls {
                    return Err(ApiError::Status {
                        code: *code,
                        body: String::new(),
                    });
                }
                JobStatus::Pending
            }
            _ => JobStatus::Pending,
        };
        Ok(JobView {
            email_checks: vec![EmailCheck {
                email: Some(email.to_string()),
                smtp_code: match status {
                    JobStatus::Invalid => Some(550),
                    JobStatus::Pending => None,
                    _ => Some(250),
                },
                bounce_reason: None,
                status,
            }],
        })
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-3
}
