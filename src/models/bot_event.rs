use chrono::{DateTime, Utc};
use serde::Serialize;

/// Immutable, ordered record of something that happened to a bot
#[derive(Debug, Clone, Serialize)]
pub struct BotEvent {
    pub event_id: String,
    pub bot_id: String,
    pub owner_client_id: String,
    pub event_type: String,
    pub message: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
