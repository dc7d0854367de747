pub mod agent;
pub mod api;
pub mod assistant;
pub mod config;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod store;
pub mod trace;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub agent: Arc<agent::AgentService>,
    pub store: Arc<dyn store::ProjectStore>,
}
