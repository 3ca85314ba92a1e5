//! Error taxonomy for the bot supervision subsystem.
//!
//! Synchronous failures (`NotFound`, `InvalidTransition`, `Conflict`,
//! `Validation`) are returned to the caller of start/stop without touching
//! stored status. Workload failures are asynchronous and surface only as a
//! persisted `error` status plus an `ERROR` event.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

use crate::models::BotStatus;

#[derive(Debug)]
pub enum SupervisorError {
    /// Unknown bot id
    NotFound,
    /// Requested status not reachable from the current status
    InvalidTransition { from: BotStatus, to: BotStatus },
    /// Already running, capacity reached, or unsupported bot type
    Conflict(String),
    /// Malformed per-bot-type config
    Validation(String),
    /// Persistence failure - always propagated, never swallowed
    Database(rusqlite::Error),
}

impl fmt::Display for SupervisorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorError::NotFound => write!(f, "Bot not found"),
            SupervisorError::InvalidTransition { from, to } => write!(
                f,
                "Invalid transition from {} to {}",
                from.as_str(),
                to.as_str()
            ),
            SupervisorError::Conflict(msg) => write!(f, "{}", msg),
            SupervisorError::Validation(msg) => write!(f, "{}", msg),
            SupervisorError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for SupervisorError {}

impl From<rusqlite::Error> for SupervisorError {
    fn from(e: rusqlite::Error) -> Self {
        SupervisorError::Database(e)
    }
}

impl ResponseError for SupervisorError {
    fn status_code(&self) -> StatusCode {
        match self {
            SupervisorError::NotFound => StatusCode::NOT_FOUND,
            SupervisorError::InvalidTransition { .. } => StatusCode::CONFLICT,
            SupervisorError::Conflict(_) => StatusCode::CONFLICT,
            SupervisorError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SupervisorError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SupervisorError::NotFound.status_code(), 404);
        assert_eq!(
            SupervisorError::InvalidTransition {
                from: BotStatus::Running,
                to: BotStatus::Running,
            }
            .status_code(),
            409
        );
        assert_eq!(
            SupervisorError::Conflict("Bot is already running".into()).status_code(),
            409
        );
        assert_eq!(
            SupervisorError::Validation("interval_seconds must be a positive integer".into())
                .status_code(),
            422
        );
    }

    #[test]
    fn test_display_messages() {
        let err = SupervisorError::InvalidTransition {
            from: BotStatus::Created,
            to: BotStatus::Error,
        };
        assert_eq!(err.to_string(), "Invalid transition from created to error");
    }
}
