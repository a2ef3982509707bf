use crate::{
    config::Config,
    metrics::{summarize, RunSummary},
    model::{JobResult, TestCase},
    report::ErrorLog,
    runner::JobRunner,
};
use tracing::{info, warn};

pub enum RunOutcome {
    /// The smoke-test phase fell below the completion threshold; only its
    /// results exist.
    SmokeFailed {
        results: Vec<JobResult>,
        summary: RunSummary,
    },
    Completed {
        results: Vec<JobResult>,
        summary: RunSummary,
    },
}

impl RunOutcome {
    pub fn results(&self) -> &[JobResult] {
        match self {
            Self::SmokeFailed { results, .. } | Self::Completed { results, .. } => results,
        }
    }

    pub fn summary(&self) -> &RunSummary {
        match self {
            Self::SmokeFailed { summary, .. } | Self::Completed { summary, .. } => summary,
        }
    }
}

/// Two-phase driver: a small smoke test gates the full run.
pub struct Pipeline<'a> {
    cfg: &'a Config,
    runner: JobRunner<'a>,
    error_log: Option<&'a ErrorLog>,
}

impl<'a> Pipeline<'a> {
    pub fn new(cfg: &'a Config, runner: JobRunner<'a>, error_log: Option<&'a ErrorLog>) -> Self {
        Self {
            cfg,
            runner,
            error_log,
        }
    }

    pub fn run(&self, cases: &[TestCase]) -> RunOutcome {
        let total = cases.len();
        let split = self.cfg.run.smoke_test_size.min(total);
        let (smoke, rest) = cases.split_at(split);

        info!("phase 1: testing {} emails first", smoke.len());
        let mut results = Vec::with_capacity(total);
        self.run_phase(smoke, 0, total, &mut results);

        let smoke_summary = summarize(&results, &self.cfg.run.percentiles);
        info!(
            "phase 1: completed {}/{} ({:.1}%) errors={} timeouts={}",
            smoke_summary.completed,
            smoke_summary.total_emails,
            smoke_summary.completion_rate,
            smoke_summary.errors,
            smoke_summary.timeouts
        );

        let threshold = self.cfg.run.smoke_completion_threshold;
        if smoke_summary.completion_rate < threshold {
            warn!(
                "phase 1 failed: completion rate {:.1}% below threshold {:.1}%",
                smoke_summary.completion_rate, threshold
            );
            return RunOutcome::SmokeFailed {
                results,
                summary: smoke_summary,
            };
        }

        info!("phase 2: testing remaining {} of {} emails", rest.len(), total);
        self.run_phase(rest, split, total, &mut results);

        let summary = summarize(&results, &self.cfg.run.percentiles);
        RunOutcome::Completed { results, summary }
    }

    fn run_phase(&self, cases: &[TestCase], offset: usize, total: usize, out: &mut Vec<JobResult>) {
        for (i, case) in cases.iter().enumerate() {
            info!("[{}/{}] Testing: {}", offset + i + 1, total, case.email);
            let result = self.runner.run(case);
            if let Some(log) = self.error_log {
                if let Err(err) = log.record(&result) {
                    warn!("could not append to error log {}: {:#}", log.path().display(), err);
                }
            }
            out.push(result);
        }
    }
}
