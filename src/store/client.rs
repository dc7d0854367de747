use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::json;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::trace::TraceEvent;

use super::types::*;
use super::ProjectStore;

/// PostgREST-style client for the project store.
///
/// Reads retry on transport failures and 5xx responses with exponential
/// backoff; writes are single-shot because scene inserts are not idempotent
/// and a blind retry would duplicate rows.
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl StoreClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let key = config
            .service_role_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("store service role key is not configured".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "apikey",
            HeaderValue::from_str(key)
                .map_err(|e| Error::Config(format!("invalid store key header: {e}")))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| Error::Config(format!("invalid store key header: {e}")))?,
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }

    fn table_url(&self, table: &str, query: &str) -> String {
        format!("{}/rest/v1/{table}?{query}", self.base_url)
    }

    // ── Internal HTTP helpers with retry + tracing ─────────────────

    /// GET rows from a table, retrying transient failures.
    async fn select<Resp>(&self, table: &str, query: &str) -> Result<Vec<Resp>>
    where
        Resp: serde::de::DeserializeOwned,
    {
        let url = self.table_url(table, query);

        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_secs(2u64.pow(attempt));
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let result = self.http.get(&url).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    TraceEvent::StoreCall {
                        table: table.to_string(),
                        op: "select".into(),
                        status,
                        duration_ms,
                    }
                    .emit();

                    if resp.status().is_success() {
                        let rows: Vec<Resp> = resp.json().await.map_err(|e| {
                            Error::Store(format!("{table} returned malformed rows: {e}"))
                        })?;
                        return Ok(rows);
                    }

                    let err_text = resp.text().await.unwrap_or_default();
                    let err = Error::Store(format!("{table} returned {status}: {err_text}"));

                    // Don't retry client errors (4xx)
                    if (400..500).contains(&status) {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
                Err(e) => {
                    TraceEvent::StoreCall {
                        table: table.to_string(),
                        op: "select".into(),
                        status: 0,
                        duration_ms,
                    }
                    .emit();
                    last_err = Some(Error::from_reqwest(e, Error::Store));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Store("max retries exceeded".into())))
    }

    /// Issue a single-shot write. `prefer` carries PostgREST resolution and
    /// representation directives; the returned body is ignored unless the
    /// caller asks for representation rows.
    async fn write<Resp>(
        &self,
        method: Method,
        table: &str,
        query: &str,
        body: &serde_json::Value,
        prefer: Option<&str>,
    ) -> Result<Vec<Resp>>
    where
        Resp: serde::de::DeserializeOwned,
    {
        let url = self.table_url(table, query);
        let op = method.as_str().to_lowercase();

        let mut req = self.http.request(method, &url).json(body);
        if let Some(prefer) = prefer {
            req = req.header("Prefer", prefer);
        }

        let start = Instant::now();
        let result = req.send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                TraceEvent::StoreCall {
                    table: table.to_string(),
                    op,
                    status: 0,
                    duration_ms,
                }
                .emit();
                return Err(Error::from_reqwest(e, Error::Store));
            }
        };

        let status = resp.status().as_u16();
        TraceEvent::StoreCall {
            table: table.to_string(),
            op,
            status,
            duration_ms,
        }
        .emit();

        if !resp.status().is_success() {
            let err_text = resp.text().await.unwrap_or_default();
            return Err(Error::Store(format!("{table} returned {status}: {err_text}")));
        }

        if prefer.map(|p| p.contains("return=representation")) == Some(true) {
            let rows: Vec<Resp> = resp
                .json()
                .await
                .map_err(|e| Error::Store(format!("{table} returned malformed rows: {e}")))?;
            Ok(rows)
        } else {
            Ok(Vec::new())
        }
    }

    fn now() -> String {
        Utc::now().to_rfc3339()
    }
}

#[async_trait]
impl ProjectStore for StoreClient {
    async fn thread_for_project(&self, project_id: &str) -> Result<Option<String>> {
        let rows: Vec<ThreadIdRow> = self
            .select(
                "chat_sessions",
                &format!("project_id=eq.{project_id}&select=openai_thread_id&limit=1"),
            )
            .await?;
        Ok(rows.into_iter().next().map(|r| r.openai_thread_id))
    }

    async fn save_thread_mapping(&self, project_id: &str, thread_id: &str) -> Result<String> {
        let body = serde_json::to_value([ThreadRow {
            project_id: project_id.to_string(),
            openai_thread_id: thread_id.to_string(),
        }])?;
        let rows: Vec<ThreadIdRow> = self
            .write(
                Method::POST,
                "chat_sessions",
                "on_conflict=project_id&select=openai_thread_id",
                &body,
                Some("resolution=merge-duplicates,return=representation"),
            )
            .await?;
        // The represented row is the race winner; fall back to what we wrote.
        Ok(rows
            .into_iter()
            .next()
            .map(|r| r.openai_thread_id)
            .unwrap_or_else(|| thread_id.to_string()))
    }

    async fn project_details(&self, project_id: &str) -> Result<Option<ProjectDetails>> {
        let rows: Vec<ProjectDetails> = self
            .select(
                "canvas_projects",
                &format!(
                    "id=eq.{project_id}&select=id,title,canvas_scenes(id,title,scene_order)"
                ),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn update_scene_script(&self, scene_id: &str, script: &str) -> Result<()> {
        let body = json!({ "script": script, "updated_at": Self::now() });
        self.write::<serde_json::Value>(
            Method::PATCH,
            "canvas_scenes",
            &format!("id=eq.{scene_id}"),
            &body,
            None,
        )
        .await?;
        Ok(())
    }

    async fn max_scene_order(&self, project_id: &str) -> Result<Option<i64>> {
        let rows: Vec<SceneOrderRow> = self
            .select(
                "canvas_scenes",
                &format!(
                    "project_id=eq.{project_id}&select=scene_order&order=scene_order.desc&limit=1"
                ),
            )
            .await?;
        Ok(rows.into_iter().next().map(|r| r.scene_order))
    }

    async fn insert_scenes(&self, scenes: &[NewScene]) -> Result<Vec<String>> {
        let body = serde_json::to_value(scenes)?;
        let rows: Vec<IdRow> = self
            .write(
                Method::POST,
                "canvas_scenes",
                "select=id",
                &body,
                Some("return=representation"),
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn scene_media(&self, scene_id: &str) -> Result<Option<SceneMedia>> {
        let rows: Vec<SceneMedia> = self
            .select(
                "canvas_scenes",
                &format!(
                    "id=eq.{scene_id}&select=product_image_url,image_url,description&limit=1"
                ),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn update_scene_status(
        &self,
        scene_id: &str,
        status: SceneStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let body = json!({
            "status": status.as_str(),
            "error_message": error_message,
            "updated_at": Self::now(),
        });
        self.write::<serde_json::Value>(
            Method::PATCH,
            "canvas_scenes",
            &format!("id=eq.{scene_id}"),
            &body,
            None,
        )
        .await?;
        Ok(())
    }

    async fn pending_scenes(&self, project_id: &str) -> Result<Vec<PendingScene>> {
        self.select(
            "canvas_scenes",
            &format!(
                "project_id=eq.{project_id}&status=eq.pending_generation\
                 &select=id,scene_order,image_prompt&order=scene_order.asc"
            ),
        )
        .await
    }

    async fn scene_project(&self, scene_id: &str) -> Result<Option<String>> {
        let rows: Vec<SceneProjectRow> = self
            .select(
                "canvas_scenes",
                &format!("id=eq.{scene_id}&select=project_id&limit=1"),
            )
            .await?;
        Ok(rows.into_iter().next().map(|r| r.project_id))
    }

    async fn insert_generation_job(&self, job: &NewGenerationJob) -> Result<()> {
        let body = serde_json::to_value([job])?;
        self.write::<serde_json::Value>(Method::POST, "generation_jobs", "", &body, None)
            .await?;
        Ok(())
    }
}
