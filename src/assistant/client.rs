use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;

use crate::config::AssistantConfig;
use crate::error::{Error, Result};
use crate::trace::TraceEvent;

use super::types::*;
use super::AssistantApi;

/// Typed HTTP client for the hosted assistant API.
///
/// One instance is built at startup and shared across requests. Calls are
/// single-shot: the run poller owns the retry cadence, and the message/run
/// creation endpoints are not idempotent.
pub struct AssistantClient {
    http: reqwest::Client,
    base_url: String,
}

impl AssistantClient {
    pub fn new(config: &AssistantConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("assistant API key is not configured".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v2"));

        let auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| Error::Config(format!("invalid API key header: {e}")))?;
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    // ── Internal HTTP helpers with tracing ─────────────────────────

    async fn post_json<Resp>(&self, path: &str, body: Option<&serde_json::Value>) -> Result<Resp>
    where
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();

        let mut req = self.http.post(&url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let result = req.send().await;
        self.finish(path, start, result).await
    }

    async fn get_json<Resp>(&self, path: &str) -> Result<Resp>
    where
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let start = Instant::now();
        let result = self.http.get(&url).send().await;
        self.finish(path, start, result).await
    }

    async fn finish<Resp>(
        &self,
        path: &str,
        start: Instant,
        result: reqwest::Result<reqwest::Response>,
    ) -> Result<Resp>
    where
        Resp: serde::de::DeserializeOwned,
    {
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                TraceEvent::AssistantCall {
                    endpoint: path.to_string(),
                    status: 0,
                    duration_ms,
                }
                .emit();
                return Err(Error::from_reqwest(e, Error::Assistant));
            }
        };

        let status = resp.status().as_u16();
        TraceEvent::AssistantCall {
            endpoint: path.to_string(),
            status,
            duration_ms,
        }
        .emit();

        if !resp.status().is_success() {
            let err_text = resp.text().await.unwrap_or_default();
            return Err(Error::Assistant(format!(
                "{path} returned {status}: {err_text}"
            )));
        }

        let parsed: Resp = resp
            .json()
            .await
            .map_err(|e| Error::Assistant(format!("{path} returned malformed body: {e}")))?;
        Ok(parsed)
    }
}

#[async_trait]
impl AssistantApi for AssistantClient {
    async fn create_thread(&self) -> Result<String> {
        let thread: Thread = self.post_json("/threads", None).await?;
        Ok(thread.id)
    }

    async fn add_message(&self, thread_id: &str, role: &str, content: &str) -> Result<()> {
        let body = json!({ "role": role, "content": content });
        let _msg: ThreadMessage = self
            .post_json(&format!("/threads/{thread_id}/messages"), Some(&body))
            .await?;
        Ok(())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        tools: &[ToolDefinition],
    ) -> Result<Run> {
        let declared: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| json!({ "type": "function", "function": t }))
            .collect();
        let body = json!({ "assistant_id": assistant_id, "tools": declared });
        self.post_json(&format!("/threads/{thread_id}/runs"), Some(&body))
            .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.get_json(&format!("/threads/{thread_id}/runs/{run_id}"))
            .await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run> {
        let body = json!({ "tool_outputs": outputs });
        self.post_json(
            &format!("/threads/{thread_id}/runs/{run_id}/submit_tool_outputs"),
            Some(&body),
        )
        .await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.post_json(&format!("/threads/{thread_id}/runs/{run_id}/cancel"), None)
            .await
    }

    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>> {
        let list: MessageList = self
            .get_json(&format!(
                "/threads/{thread_id}/messages?order=desc&limit={limit}"
            ))
            .await?;
        Ok(list.data)
    }
}
