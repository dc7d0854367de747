use serde::Serialize;

/// Structured trace events emitted during orchestration and pipeline work.
/// These integrate with the `tracing` crate and are machine-parseable.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    /// Emitted on assistant API calls.
    AssistantCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },

    /// Emitted on store REST calls.
    StoreCall {
        table: String,
        op: String,
        status: u16,
        duration_ms: u64,
    },

    /// Emitted when a project is resolved to a conversation thread.
    ThreadResolved {
        project_id: String,
        thread_id: String,
        created: bool,
    },

    /// Emitted on every run status poll.
    RunPolled { run_id: String, status: String },

    /// Emitted after a tool call was dispatched.
    ToolDispatched {
        tool_call_id: String,
        function: String,
        duration_ms: u64,
        is_error: bool,
    },

    /// Emitted when a generation job was handed to a backend.
    GenerationJobSubmitted {
        scene_id: String,
        kind: String,
        request_id: String,
    },

    /// Emitted per scene as the pipeline finishes with it.
    PipelineSceneDone { scene_id: String, status: String },
}

impl TraceEvent {
    /// Emit this event as a tracing span event.
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "canvas_agent_event");
    }
}
