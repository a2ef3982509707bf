use crate::model::JobResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_emails: usize,
    pub completed: usize,
    pub errors: usize,
    pub timeouts: usize,
    /// Percentage of completed jobs whose status matched the expectation.
    pub success_rate: f64,
    /// Percentage of all jobs that reached a terminal status.
    pub completion_rate: f64,
    pub timing: Timing,
    pub category_breakdown: BTreeMap<String, CategoryStats>,
    pub status_breakdown: BTreeMap<String, usize>,
    /// Completed jobs per second of summed end-to-end latency.
    pub throughput: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub total_time: LatencyStats,
    pub api_time: LatencyStats,
    pub processing_time: LatencyStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub samples: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub percentiles: BTreeMap<u32, f64>,
}

impl LatencyStats {
    pub fn from_samples(samples: &[f64], percentiles: &[u32]) -> Self {
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let (min, max, avg) = match (sorted.first(), sorted.last()) {
            (Some(&lo), Some(&hi)) => (lo, hi, sorted.iter().sum::<f64>() / sorted.len() as f64),
            _ => (0.0, 0.0, 0.0),
        };
        Self {
            samples: sorted.len(),
            min,
            max,
            avg,
            percentiles: percentiles
                .iter()
                .map(|&p| (p, percentile_sorted(&sorted, p)))
                .collect(),
        }
    }

    pub fn percentile(&self, p: u32) -> f64 {
        self.percentiles.get(&p).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub total: usize,
    pub completed: usize,
    pub matched: usize,
    pub errors: usize,
}

impl CategoryStats {
    pub fn match_rate(&self) -> f64 {
        rate(self.matched, self.completed)
    }
}

/// Rank-based percentile over an ascending sample: element `floor(n * p / 100)`,
/// clamped to the last index. No interpolation. Empty samples yield 0.
pub fn percentile_sorted(sorted: &[f64], p: u32) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (sorted.len() * p as usize / 100).min(sorted.len() - 1);
    sorted[idx]
}

pub fn percentile(values: &[f64], p: u32) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&sorted, p)
}

fn rate(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64 * 100.0
    }
}

/// Aggregate a population of job results. Results without an observed status
/// count toward the totals but not toward latency or match statistics.
pub fn summarize(results: &[JobResult], percentiles: &[u32]) -> RunSummary {
    let mut completed = 0usize;
    let mut matched = 0usize;
    let mut errors = 0usize;
    let mut timeouts = 0usize;
    let mut total_times = Vec::new();
    let mut api_times = Vec::new();
    let mut processing_times = Vec::new();
    let mut categories: BTreeMap<String, CategoryStats> = BTreeMap::new();
    let mut statuses: BTreeMap<String, usize> = BTreeMap::new();

    for r in results {
        let cat = categories.entry(r.dataset_label.clone()).or_default();
        cat.total += 1;

        if r.error.is_some() {
            errors += 1;
            cat.errors += 1;
        }
        if r.timed_out {
            timeouts += 1;
        }
        if let Some(ms) = r.submission_latency_ms.filter(|&v| v > 0.0) {
            api_times.push(ms);
        }

        let Some(status) = &r.observed_status else {
            continue;
        };
        completed += 1;
        cat.completed += 1;
        *statuses.entry(status.to_string()).or_default() += 1;

        if r.matches_expected == Some(true) {
            matched += 1;
            cat.matched += 1;
        }
        if let Some(ms) = r.total_latency_ms.filter(|&v| v > 0.0) {
            total_times.push(ms);
        }
        if let Some(ms) = r.processing_latency_ms.filter(|&v| v > 0.0) {
            processing_times.push(ms);
        }
    }

    let total_secs: f64 = total_times.iter().sum::<f64>() / 1000.0;
    let throughput = if total_secs > 0.0 {
        completed as f64 / total_secs
    } else {
        0.0
    };

    RunSummary {
        total_emails: results.len(),
        completed,
        errors,
        timeouts,
        success_rate: rate(matched, completed),
        completion_rate: rate(completed, results.len()),
        timing: Timing {
            total_time: LatencyStats::from_samples(&total_times, percentiles),
            api_time: LatencyStats::from_samples(&api_times, percentiles),
            processing_time: LatencyStats::from_samples(&processing_times, percentiles),
        },
        category_breakdown: categories,
        status_breakdown: statuses,
        throughput,
    }
}
