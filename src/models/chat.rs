use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<String>,
    #[serde(default = "default_history_limit")]
    pub history_limit: i64,
    #[serde(default = "default_persist")]
    pub persist: bool,
    #[serde(default)]
    pub reset_conversation: bool,
}

fn default_history_limit() -> i64 {
    10
}

fn default_persist() -> bool {
    true
}

/// One stored turn of a conversation, as fed back to the LLM and to
/// the planning bot workloads
#[derive(Debug, Clone, Serialize)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub conversation_id: String,
    pub used_history: usize,
}
