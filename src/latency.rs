//! Post-hoc latency decomposition over a finished polling trace.
//!
//! Queue time cannot be observed from the client, so it is estimated from the
//! early poll gaps; processing time is whatever remains.

use crate::model::JobResult;

pub const QUEUE_ESTIMATE_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyBreakdown {
    pub total_ms: f64,
    pub queue_ms: Option<f64>,
    pub processing_ms: f64,
}

/// Mean of the first `QUEUE_ESTIMATE_WINDOW` observed gaps, if any were observed.
pub fn estimate_queue_ms(intervals_ms: &[f64]) -> Option<f64> {
    let window = &intervals_ms[..intervals_ms.len().min(QUEUE_ESTIMATE_WINDOW)];
    if window.is_empty() {
        return None;
    }
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

/// Split the end-to-end latency. `processing_ms` is not clamped and can go
/// negative when the queue estimate overshoots a very fast job.
pub fn decompose(total_ms: f64, submission_ms: f64, intervals_ms: &[f64]) -> LatencyBreakdown {
    let queue_ms = estimate_queue_ms(intervals_ms);
    let processing_ms = total_ms - submission_ms - queue_ms.unwrap_or(0.0);
    LatencyBreakdown {
        total_ms,
        queue_ms,
        processing_ms,
    }
}

/// Fill the derived latency fields on a completed result. No-op otherwise.
pub fn apply(result: &mut JobResult) {
    let (Some(submitted), Some(completed)) = (result.submitted_at, result.completed_at) else {
        return;
    };
    let total_ms = (completed - submitted).as_seconds_f64() * 1000.0;
    let submission_ms = result.submission_latency_ms.unwrap_or(0.0);
    let b = decompose(total_ms, submission_ms, &result.poll_intervals_ms);
    result.total_latency_ms = Some(b.total_ms);
    result.queue_latency_ms = b.queue_ms;
    result.processing_latency_ms = Some(b.processing_ms);
}
