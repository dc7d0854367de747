use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use canvas_agent::agent::tools::ToolDispatcher;
use canvas_agent::agent::{AgentService, RunSettings};
use canvas_agent::api;
use canvas_agent::assistant::client::AssistantClient;
use canvas_agent::config::Config;
use canvas_agent::generation::GenerationClient;
use canvas_agent::store::client::StoreClient;
use canvas_agent::store::ProjectStore;
use canvas_agent::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("canvas_agent=info,tower_http=info")),
        )
        .json()
        .init();

    tracing::info!("canvas-agent starting");

    // ── Config ─────────────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".into());

    let config = Config::load_or_default(&config_path);
    tracing::info!(
        assistant_url = %config.assistant.base_url,
        store_url = %config.store.base_url,
        port = config.server.port,
        "configuration loaded"
    );
    if config.require_assistant_id().is_err() {
        tracing::warn!("assistant id is not configured; chat requests will be rejected");
    }

    let config = Arc::new(config);

    // ── External clients ───────────────────────────────────────────
    let assistant = Arc::new(AssistantClient::new(&config.assistant)?);
    let store: Arc<dyn ProjectStore> = Arc::new(StoreClient::new(&config.store)?);
    let generation = Arc::new(GenerationClient::new(&config.generation)?);

    // ── Orchestrator ───────────────────────────────────────────────
    let dispatcher = Arc::new(ToolDispatcher::new(store.clone(), generation));
    let agent = Arc::new(AgentService::new(
        RunSettings::from_config(&config.assistant),
        assistant,
        store.clone(),
        dispatcher,
    ));

    // ── App state ──────────────────────────────────────────────────
    let state = AppState {
        config: config.clone(),
        agent,
        store,
    };

    // ── Router ─────────────────────────────────────────────────────
    let app = api::router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // ── Server ─────────────────────────────────────────────────────
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .expect("invalid server address");

    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
