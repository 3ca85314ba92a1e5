//! Bot lifecycle state machine. The single authority for status mutation.

use std::sync::Arc;

use crate::db::Database;
use crate::models::{Bot, BotStatus};
use crate::supervisor::error::SupervisorError;
use crate::supervisor::events::BotEventWriter;

pub struct BotRegistry {
    db: Arc<Database>,
    event_writer: Arc<BotEventWriter>,
}

impl BotRegistry {
    pub fn new(db: Arc<Database>, event_writer: Arc<BotEventWriter>) -> Self {
        Self { db, event_writer }
    }

    pub fn create_bot(
        &self,
        owner_client_id: &str,
        bot_type: &str,
        config: &serde_json::Value,
    ) -> Result<Bot, SupervisorError> {
        let bot = self.db.create_bot(owner_client_id, bot_type, config)?;
        log::info!(
            "Created bot {} (type {}) for client {}",
            bot.bot_id,
            bot.bot_type,
            owner_client_id
        );
        Ok(bot)
    }

    pub fn get_bot(&self, bot_id: &str) -> Result<Bot, SupervisorError> {
        self.db.get_bot(bot_id)?.ok_or(SupervisorError::NotFound)
    }

    /// Validate and perform a status transition, writing one lifecycle
    /// event tagged `event_type`. Fails without side effects when the
    /// target is not reachable from the current status.
    pub fn transition(
        &self,
        bot_id: &str,
        to_status: BotStatus,
        event_type: &str,
    ) -> Result<Bot, SupervisorError> {
        let bot = self.get_bot(bot_id)?;
        if !bot.status.can_transition_to(to_status) {
            return Err(SupervisorError::InvalidTransition {
                from: bot.status,
                to: to_status,
            });
        }

        let updated = self
            .db
            .update_bot_status(bot_id, to_status)?
            .ok_or(SupervisorError::NotFound)?;
        self.event_writer
            .emit(bot_id, &bot.owner_client_id, event_type, None, None)?;

        log::info!(
            "Bot {} transitioned {} -> {} ({})",
            bot_id,
            bot.status.as_str(),
            to_status.as_str(),
            event_type
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn registry_with_bot(status: BotStatus) -> (Arc<Database>, BotRegistry, String) {
        let db = Arc::new(Database::new_in_memory().unwrap());
        let writer = Arc::new(BotEventWriter::new(db.clone()));
        let registry = BotRegistry::new(db.clone(), writer);

        let owner = db
            .create_client(Some("Owner"), None, false)
            .unwrap()
            .client_id;
        let bot = registry
            .create_bot(&owner, "heartbeat", &serde_json::json!({}))
            .unwrap();
        if status != BotStatus::Created {
            db.update_bot_status(&bot.bot_id, status).unwrap();
        }
        (db, registry, bot.bot_id)
    }

    #[test]
    fn test_get_missing_bot_is_not_found() {
        let (_db, registry, _bot_id) = registry_with_bot(BotStatus::Created);
        assert!(matches!(
            registry.get_bot("missing"),
            Err(SupervisorError::NotFound)
        ));
    }

    #[test]
    fn test_valid_transition_persists_and_emits() {
        let (db, registry, bot_id) = registry_with_bot(BotStatus::Created);

        let bot = registry
            .transition(&bot_id, BotStatus::Running, "STARTED")
            .unwrap();
        assert_eq!(bot.status, BotStatus::Running);

        let events = db.list_bot_events(&bot_id, 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "STARTED");
    }

    #[test]
    fn test_invalid_transition_leaves_status_unchanged() {
        let all = [
            BotStatus::Created,
            BotStatus::Running,
            BotStatus::Paused,
            BotStatus::Stopped,
            BotStatus::Error,
        ];

        for from in all {
            for to in all {
                if from.can_transition_to(to) {
                    continue;
                }
                let (db, registry, bot_id) = registry_with_bot(from);
                let result = registry.transition(&bot_id, to, "EVENT");
                assert!(
                    matches!(result, Err(SupervisorError::InvalidTransition { .. })),
                    "expected {} -> {} to be rejected",
                    from.as_str(),
                    to.as_str()
                );

                let bot = db.get_bot(&bot_id).unwrap().unwrap();
                assert_eq!(bot.status, from, "status must be unchanged after rejection");
                // No lifecycle event for the rejected transition
                assert!(db.list_bot_events(&bot_id, 10).unwrap().is_empty());
            }
        }
    }

    #[test]
    fn test_error_status_recovers() {
        let (_db, registry, bot_id) = registry_with_bot(BotStatus::Error);
        let bot = registry
            .transition(&bot_id, BotStatus::Stopped, "STOPPED")
            .unwrap();
        assert_eq!(bot.status, BotStatus::Stopped);
    }
}
