use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

// ── Server ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

// ── Assistant API ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Base URL of the hosted assistant API.
    #[serde(default = "default_assistant_base_url")]
    pub base_url: String,

    /// API key. Overridable via OPENAI_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Assistant identifier to run against. Overridable via
    /// OPENAI_ASSISTANT_ID.
    #[serde(default)]
    pub assistant_id: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Wait between run status polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Shorter wait used right after tool outputs were submitted.
    #[serde(default = "default_resubmit_interval_ms")]
    pub resubmit_interval_ms: u64,

    /// Hard cap on how long a single run may stay non-terminal.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

// ── Project store ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the store's REST API. Overridable via SUPABASE_URL.
    #[serde(default = "default_store_base_url")]
    pub base_url: String,

    /// Service-role key. Overridable via SUPABASE_SERVICE_ROLE_KEY.
    #[serde(default)]
    pub service_role_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Max retries for read queries on transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

// ── Generation backends ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Endpoint accepting image generation jobs.
    #[serde(default = "default_image_job_url")]
    pub image_job_url: String,

    /// Endpoint accepting video generation jobs.
    #[serde(default = "default_video_job_url")]
    pub video_job_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// ── Defaults ───────────────────────────────────────────────────────

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_assistant_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_store_base_url() -> String {
    "http://localhost:54321".into()
}
fn default_image_job_url() -> String {
    "http://localhost:7860/generate-image".into()
}
fn default_video_job_url() -> String {
    "http://localhost:7860/generate-video".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_resubmit_interval_ms() -> u64 {
    500
}
fn default_run_timeout_secs() -> u64 {
    300
}

// ── Default impls ──────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            assistant: AssistantConfig::default(),
            store: StoreConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: default_assistant_base_url(),
            api_key: None,
            assistant_id: None,
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            resubmit_interval_ms: default_resubmit_interval_ms(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_base_url(),
            service_role_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            image_job_url: default_image_job_url(),
            video_job_url: default_video_job_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing keys.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from file if it exists, otherwise return defaults. Secrets from
    /// the environment win over the file in either case.
    pub fn load_or_default(path: &str) -> Self {
        let mut config = Self::load(path).unwrap_or_default();
        config.apply_env();
        config
    }

    /// Overlay secret material from environment variables, matching how the
    /// deployment injects credentials.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            self.assistant.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("OPENAI_ASSISTANT_ID") {
            self.assistant.assistant_id = Some(v);
        }
        if let Ok(v) = std::env::var("SUPABASE_URL") {
            self.store.base_url = v;
        }
        if let Ok(v) = std::env::var("SUPABASE_SERVICE_ROLE_KEY") {
            self.store.service_role_key = Some(v);
        }
    }

    /// Resolve the assistant id, rejecting unset or placeholder values.
    pub fn require_assistant_id(&self) -> Result<&str> {
        match self.assistant.assistant_id.as_deref() {
            Some(id) if !id.is_empty() && id != "YOUR_OPENAI_ASSISTANT_ID" => Ok(id),
            _ => Err(Error::Config("assistant id is not configured".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_when_file_missing() {
        let config = Config::load("/nonexistent/config.toml").err();
        assert!(config.is_some());

        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.assistant.poll_interval_ms, 1_000);
        assert_eq!(config.assistant.resubmit_interval_ms, 500);
        assert_eq!(config.assistant.run_timeout_secs, 300);
        assert_eq!(config.store.max_retries, 3);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "[server]\nport = 9000\n\n[assistant]\nassistant_id = \"asst_123\"\n"
        )
        .unwrap();

        let config = Config::load(f.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.assistant.assistant_id.as_deref(), Some("asst_123"));
        assert_eq!(config.assistant.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn assistant_id_placeholder_is_rejected() {
        let mut config = Config::default();
        assert!(config.require_assistant_id().is_err());

        config.assistant.assistant_id = Some("YOUR_OPENAI_ASSISTANT_ID".into());
        assert!(config.require_assistant_id().is_err());

        config.assistant.assistant_id = Some(String::new());
        assert!(config.require_assistant_id().is_err());

        config.assistant.assistant_id = Some("asst_abc".into());
        assert_eq!(config.require_assistant_id().unwrap(), "asst_abc");
    }
}
