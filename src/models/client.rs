use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant of the backend - a device or app holding a bearer token
#[derive(Debug, Clone, Serialize)]
pub struct Client {
    pub client_id: String,
    pub name: Option<String>,
    pub preferences: serde_json::Value,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Creation result. The raw token is returned exactly once and only the
/// SHA-256 hash is kept at rest.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedClient {
    pub client_id: String,
    pub client_token: String,
    pub name: Option<String>,
    pub preferences: serde_json::Value,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to register a new client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientCreateRequest {
    pub name: Option<String>,
}
