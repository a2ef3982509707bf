use super::{types::*, VerifyApi};
use crate::config::Config;
use anyhow::{Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use tracing::debug;

pub struct HttpVerifyApi {
    client: Client,
    verify_url: String,
    cfg: crate::config::Api,
}

impl HttpVerifyApi {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .build()
            .with_context(|| "building HTTP client")?;
        Ok(Self {
            client,
            verify_url: cfg.api.verify_url(),
            cfg: cfg.api.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.verify_url
    }
}

impl VerifyApi for HttpVerifyApi {
    fn submit(&self, email: &str) -> Result<String, ApiError> {
        debug!("POST {} email={}", self.verify_url, email);
        let resp = self
            .client
            .post(&self.verify_url)
            .json(&[email])
            .timeout(self.cfg.submit_timeout())
            .send()
            .map_err(classify_transport)?;

        let resp = expect_status(resp, StatusCode::CREATED)?;
        let body: SubmitResponse = resp.json().map_err(classify_transport)?;
        body.job_id
            .ok_or_else(|| ApiError::Decode("response has no jobId".to_string()))
    }

    fn job_status(&self, job_id: &str) -> Result<JobView, ApiError> {
        let url = self.cfg.job_url(job_id);
        debug!("GET {}", url);
        let resp = self
            .client
            .get(&url)
            .timeout(self.cfg.poll_timeout())
            .send()
            .map_err(classify_transport)?;

        let resp = expect_status(resp, StatusCode::OK)?;
        resp.json::<JobView>().map_err(classify_transport)
    }
}

fn expect_status(resp: Response, want: StatusCode) -> Result<Response, ApiError> {
    if resp.status() == want {
        return Ok(resp);
    }
    let code = resp.status().as_u16();
    let body = resp.text().unwrap_or_default();
    Err(ApiError::Status { code, body })
}

fn classify_transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_connect() {
        ApiError::Connect(err.to_string())
    } else if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Other(err.to_string())
    }
}
