use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::trace::TraceEvent;

// ── Job contracts ──────────────────────────────────────────────────

/// Acknowledgment from a generation backend. The actual asset lands on the
/// scene row out-of-band; this core only records the submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTicket {
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageJob {
    pub scene_id: String,
    pub prompt: String,
    pub product_image_url: String,
    /// Generation model version, `v1` or `v2`.
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoJob {
    pub scene_id: String,
    pub image_url: String,
    pub description: String,
}

/// Seam over the image/video job backends.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn submit_image_job(&self, job: &ImageJob) -> Result<JobTicket>;
    async fn submit_video_job(&self, job: &VideoJob) -> Result<JobTicket>;
}

// ── HTTP client ────────────────────────────────────────────────────

/// Thin client for both placeholder backends. Each submission is one POST
/// returning a provider request id.
pub struct GenerationClient {
    http: reqwest::Client,
    image_job_url: String,
    video_job_url: String,
}

impl GenerationClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            http,
            image_job_url: config.image_job_url.clone(),
            video_job_url: config.video_job_url.clone(),
        })
    }

    async fn submit(&self, url: &str, body: serde_json::Value) -> Result<JobTicket> {
        let start = Instant::now();
        let result = self.http.post(url).json(&body).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = result.map_err(|e| Error::from_reqwest(e, Error::Connection))?;
        let status = resp.status().as_u16();
        tracing::debug!(url, status, duration_ms, "generation job submitted");

        if !resp.status().is_success() {
            let err_text = resp.text().await.unwrap_or_default();
            return Err(Error::Connection(format!(
                "generation backend returned {status}: {err_text}"
            )));
        }

        let ticket: JobTicket = resp.json().await.map_err(|e| {
            Error::Connection(format!("generation backend returned malformed body: {e}"))
        })?;
        Ok(ticket)
    }
}

#[async_trait]
impl GenerationBackend for GenerationClient {
    async fn submit_image_job(&self, job: &ImageJob) -> Result<JobTicket> {
        let ticket = self.submit(&self.image_job_url, json!(job)).await?;
        TraceEvent::GenerationJobSubmitted {
            scene_id: job.scene_id.clone(),
            kind: "image".into(),
            request_id: ticket.request_id.clone(),
        }
        .emit();
        Ok(ticket)
    }

    async fn submit_video_job(&self, job: &VideoJob) -> Result<JobTicket> {
        let ticket = self.submit(&self.video_job_url, json!(job)).await?;
        TraceEvent::GenerationJobSubmitted {
            scene_id: job.scene_id.clone(),
            kind: "video".into(),
            request_id: ticket.request_id.clone(),
        }
        .emit();
        Ok(ticket)
    }
}
