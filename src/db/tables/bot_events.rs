//! Append-only bot event log operations

use chrono::{DateTime, Utc};
use rusqlite::Result as SqliteResult;
use uuid::Uuid;

use super::super::Database;
use crate::models::BotEvent;

impl Database {
    pub fn add_bot_event(
        &self,
        bot_id: &str,
        owner_client_id: &str,
        event_type: &str,
        message: Option<&str>,
        payload: Option<&serde_json::Value>,
    ) -> SqliteResult<BotEvent> {
        let event_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let payload_value = payload.cloned().unwrap_or_else(|| serde_json::json!({}));
        let payload_json =
            serde_json::to_string(&payload_value).unwrap_or_else(|_| "{}".to_string());

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO bot_events (event_id, bot_id, owner_client_id, event_type, message, payload_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                event_id,
                bot_id,
                owner_client_id,
                event_type,
                message,
                payload_json,
                now.to_rfc3339(),
            ],
        )?;

        Ok(BotEvent {
            event_id,
            bot_id: bot_id.to_string(),
            owner_client_id: owner_client_id.to_string(),
            event_type: event_type.to_string(),
            message: message.map(|s| s.to_string()),
            payload: payload_value,
            created_at: now,
        })
    }

    /// The most recent `limit` events for a bot, returned oldest first.
    /// rowid breaks ties between events written in the same instant, so
    /// re-querying never reorders what a caller has already seen.
    pub fn list_bot_events(&self, bot_id: &str, limit: i64) -> SqliteResult<Vec<BotEvent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT event_id, bot_id, owner_client_id, event_type, message, payload_json, created_at
             FROM bot_events
             WHERE bot_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
        )?;

        let mut events: Vec<BotEvent> = stmt
            .query_map(rusqlite::params![bot_id, limit], Self::row_to_event)?
            .filter_map(|r| r.ok())
            .collect();
        events.reverse();
        Ok(events)
    }

    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<BotEvent> {
        let payload_json: Option<String> = row.get(5)?;
        let created_at_str: String = row.get(6)?;

        Ok(BotEvent {
            event_id: row.get(0)?,
            bot_id: row.get(1)?,
            owner_client_id: row.get(2)?,
            event_type: row.get(3)?,
            message: row.get(4)?,
            payload: payload_json
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_else(|| serde_json::json!({})),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .unwrap()
                .with_timezone(&Utc),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    fn bot(db: &Database) -> (String, String) {
        let owner = db
            .create_client(Some("Owner"), None, false)
            .unwrap()
            .client_id;
        let bot = db
            .create_bot(&owner, "heartbeat", &serde_json::json!({}))
            .unwrap();
        (bot.bot_id, owner)
    }

    #[test]
    fn test_events_ordered_oldest_first() {
        let db = Database::new_in_memory().unwrap();
        let (bot_id, owner_id) = bot(&db);

        for event_type in ["STARTED", "HEARTBEAT", "STOPPED"] {
            db.add_bot_event(&bot_id, &owner_id, event_type, None, None)
                .unwrap();
        }

        let events = db.list_bot_events(&bot_id, 100).unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["STARTED", "HEARTBEAT", "STOPPED"]);

        // Re-querying returns the same order
        let again = db.list_bot_events(&bot_id, 100).unwrap();
        let ids: Vec<&str> = events.iter().map(|e| e.event_id.as_str()).collect();
        let ids_again: Vec<&str> = again.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, ids_again);
    }

    #[test]
    fn test_limit_keeps_most_recent() {
        let db = Database::new_in_memory().unwrap();
        let (bot_id, owner_id) = bot(&db);

        for i in 0..5 {
            db.add_bot_event(&bot_id, &owner_id, &format!("EVENT_{}", i), None, None)
                .unwrap();
        }

        let events = db.list_bot_events(&bot_id, 2).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "EVENT_3");
        assert_eq!(events[1].event_type, "EVENT_4");
    }

    #[test]
    fn test_payload_round_trip() {
        let db = Database::new_in_memory().unwrap();
        let (bot_id, owner_id) = bot(&db);

        db.add_bot_event(
            &bot_id,
            &owner_id,
            "REVIEW_PROPOSAL",
            Some("proposals ready"),
            Some(&serde_json::json!({"human_review_required": true, "count": 3})),
        )
        .unwrap();

        let events = db.list_bot_events(&bot_id, 10).unwrap();
        assert_eq!(events[0].payload["human_review_required"], true);
        assert_eq!(events[0].payload["count"], 3);
        assert_eq!(events[0].message.as_deref(), Some("proposals ready"));
    }
}
