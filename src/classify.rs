use crate::model::{ExpectedCategory, JobResult, JobStatus};

const ACCEPT_VALID: &[JobStatus] = &[JobStatus::Valid, JobStatus::CatchAll];
const ACCEPT_INVALID: &[JobStatus] = &[JobStatus::Invalid];
// Disposable domains behave unpredictably; any decisive answer counts.
const ACCEPT_DISPOSABLE: &[JobStatus] = &[JobStatus::Valid, JobStatus::CatchAll, JobStatus::Invalid];

/// Statuses that confirm each expectation.
pub fn acceptable_statuses(expected: ExpectedCategory) -> &'static [JobStatus] {
    match expected {
        ExpectedCategory::Valid => ACCEPT_VALID,
        ExpectedCategory::Invalid => ACCEPT_INVALID,
        ExpectedCategory::Disposable => ACCEPT_DISPOSABLE,
    }
}

pub fn classify(expected: ExpectedCategory, observed: &JobStatus) -> bool {
    match observed {
        JobStatus::Unknown => false,
        JobStatus::Greylisted => expected == ExpectedCategory::Valid,
        other => acceptable_statuses(expected).contains(other),
    }
}

/// Record the verdict on `result`. Results without an observed status are left
/// unclassified and `None` is returned.
pub fn apply(result: &mut JobResult) -> Option<bool> {
    let verdict = classify(result.expected, result.observed_status.as_ref()?);
    result.matches_expected = Some(verdict);
    Some(verdict)
}
