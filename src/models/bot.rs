use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a bot. The registry is the only writer except for
/// the runner's late-failure path (crash -> error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotStatus {
    Created,
    Running,
    Paused,
    Stopped,
    Error,
}

impl BotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotStatus::Created => "created",
            BotStatus::Running => "running",
            BotStatus::Paused => "paused",
            BotStatus::Stopped => "stopped",
            BotStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "created" => Some(BotStatus::Created),
            "running" => Some(BotStatus::Running),
            "paused" => Some(BotStatus::Paused),
            "stopped" => Some(BotStatus::Stopped),
            "error" => Some(BotStatus::Error),
            _ => None,
        }
    }

    /// Allowed lifecycle transitions. `stopped` and `error` are not
    /// terminal: a stopped bot can be restarted, a crashed bot retried.
    pub fn can_transition_to(&self, target: BotStatus) -> bool {
        use BotStatus::*;
        matches!(
            (self, target),
            (Created, Running)
                | (Created, Paused)
                | (Created, Stopped)
                | (Running, Paused)
                | (Running, Stopped)
                | (Paused, Running)
                | (Paused, Stopped)
                | (Stopped, Running)
                | (Stopped, Paused)
                | (Error, Stopped)
                | (Error, Running)
        )
    }
}

/// The closed set of bot types the runner knows how to execute.
///
/// Bots are created with a free-form type string (so records survive
/// unknown/future types); resolution to this enum happens once at
/// start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotType {
    Heartbeat,
    CodeReview,
    AutomationExtensions,
    Codey,
}

impl BotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotType::Heartbeat => "heartbeat",
            BotType::CodeReview => "code_review",
            BotType::AutomationExtensions => "automation_extensions",
            BotType::Codey => "codey",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "heartbeat" => Some(BotType::Heartbeat),
            "code_review" => Some(BotType::CodeReview),
            "automation_extensions" => Some(BotType::AutomationExtensions),
            "codey" => Some(BotType::Codey),
            _ => None,
        }
    }
}

/// A supervised unit of recurring or one-shot automated work
#[derive(Debug, Clone, Serialize)]
pub struct Bot {
    pub bot_id: String,
    pub owner_client_id: String,
    pub bot_type: String,
    pub config: serde_json::Value,
    pub status: BotStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a bot
#[derive(Debug, Clone, Deserialize)]
pub struct BotCreateRequest {
    pub bot_type: String,
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
    /// Admin requests must name the owner; client requests own what they create
    pub owner_client_id: Option<String>,
}

fn default_config() -> serde_json::Value {
    serde_json::json!({})
}
