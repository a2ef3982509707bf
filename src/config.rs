use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub polling: Polling,
    #[serde(default)]
    pub run: Run,
    #[serde(default)]
    pub dataset: Dataset,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()
            .with_context(|| format!("invalid config: {}", path.display()))?;
        Ok(cfg)
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            bail!("api.base_url must not be empty");
        }
        if self.api.submit_timeout_ms == 0 || self.api.poll_timeout_ms == 0 {
            bail!("api request timeouts must be positive");
        }
        let p = &self.polling;
        if p.initial_interval_ms == 0 || p.max_interval_ms == 0 {
            bail!("polling intervals must be positive");
        }
        if p.initial_interval_ms > p.max_interval_ms {
            bail!(
                "polling.initial_interval_ms ({}) exceeds polling.max_interval_ms ({})",
                p.initial_interval_ms,
                p.max_interval_ms
            );
        }
        if p.backoff_factor.is_nan() || p.backoff_factor < 1.0 {
            bail!("polling.backoff_factor must be >= 1.0, got {}", p.backoff_factor);
        }
        if p.max_wait_ms == 0 {
            bail!("polling.max_wait_ms must be positive");
        }
        if self.run.smoke_test_size == 0 {
            bail!("run.smoke_test_size must be at least 1");
        }
        if !(0.0..=100.0).contains(&self.run.smoke_completion_threshold) {
            bail!(
                "run.smoke_completion_threshold must be within 0..=100, got {}",
                self.run.smoke_completion_threshold
            );
        }
        if self.run.percentiles.iter().any(|&p| p > 100) {
            bail!("run.percentiles entries must be within 0..=100");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Api {
    pub base_url: String,
    pub verify_path: String,
    pub job_path: String,
    pub submit_timeout_ms: u64,
    pub poll_timeout_ms: u64,
}
impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            verify_path: "/api/verify".into(),
            job_path: "/api/job".into(),
            submit_timeout_ms: 10_000,
            poll_timeout_ms: 5_000,
        }
    }
}

impl Api {
    pub fn verify_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.verify_path)
    }

    pub fn job_url(&self, job_id: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url.trim_end_matches('/'),
            self.job_path.trim_end_matches('/'),
            job_id
        )
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Polling {
    pub initial_interval_ms: u64,
    pub backoff_after_ms: u64,
    pub backoff_factor: f64,
    pub max_interval_ms: u64,
    pub max_wait_ms: u64,
}
impl Default for Polling {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            backoff_after_ms: 5_000,
            backoff_factor: 1.2,
            max_interval_ms: 2_000,
            max_wait_ms: 60_000,
        }
    }
}

impl Polling {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Run {
    pub smoke_test_size: usize,
    pub smoke_completion_threshold: f64,
    pub percentiles: Vec<u32>,
}
impl Default for Run {
    fn default() -> Self {
        Self {
            smoke_test_size: 5,
            smoke_completion_threshold: 80.0,
            percentiles: vec![50, 90, 95, 99],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub default_input: String,
    pub warn_on_malformed_email: bool,
}
impl Default for Dataset {
    fn default() -> Self {
        Self {
            default_input: "data/test-emails.csv".into(),
            warn_on_malformed_email: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub out_dir: String,
    pub write_csv: bool,
    pub write_json: bool,
    pub write_summary: bool,
    pub print_summary: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            out_dir: "results".into(),
            write_csv: true,
            write_json: true,
            write_summary: true,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
    pub error_log_dir: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
            error_log_dir: "logs".into(),
        }
    }
}
