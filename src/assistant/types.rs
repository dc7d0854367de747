use serde::{Deserialize, Serialize};

// ── Run lifecycle ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Cancelling,
    RequiresAction,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl RunStatus {
    /// Statuses the poll loop keeps waiting on.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            Self::Queued | Self::InProgress | Self::Cancelling | Self::RequiresAction
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Expired
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Cancelling => "cancelling",
            Self::RequiresAction => "requires_action",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<LastError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

// ── Required action / tool calls ───────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredAction {
    pub submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitToolOutputs {
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: ToolFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    /// JSON-encoded argument object, exactly as the remote API sends it.
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

// ── Tool declarations ──────────────────────────────────────────────

/// One callable function as declared to the remote assistant when a run is
/// created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON-schema object describing the arguments.
    pub parameters: serde_json::Value,
}

// ── Threads & messages ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// A message content segment. Only text segments matter to this backend;
/// anything else (images, files) is carried opaquely and skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    #[serde(default)]
    pub data: Vec<ThreadMessage>,
}
