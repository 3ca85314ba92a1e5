//! Thin façade translating supervisor transitions and workload progress
//! into durable bot event writes.

use std::sync::Arc;

use crate::db::Database;
use crate::models::BotEvent;
use crate::supervisor::error::SupervisorError;

pub struct BotEventWriter {
    db: Arc<Database>,
}

impl BotEventWriter {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append one event to the bot's log. Persistence failures propagate;
    /// an event that cannot be written must not be silently dropped.
    pub fn emit(
        &self,
        bot_id: &str,
        owner_client_id: &str,
        event_type: &str,
        message: Option<&str>,
        payload: Option<&serde_json::Value>,
    ) -> Result<BotEvent, SupervisorError> {
        let event = self
            .db
            .add_bot_event(bot_id, owner_client_id, event_type, message, payload)?;
        log::debug!("[BOT {}] event {}", bot_id, event_type);
        Ok(event)
    }
}
