//! Bot record database operations

use chrono::{DateTime, Utc};
use rusqlite::Result as SqliteResult;
use uuid::Uuid;

use super::super::Database;
use crate::models::{Bot, BotStatus};

impl Database {
    /// Insert a bot with status `created`. The type string is stored as
    /// given; resolution against the supported set happens at start time.
    pub fn create_bot(
        &self,
        owner_client_id: &str,
        bot_type: &str,
        config: &serde_json::Value,
    ) -> SqliteResult<Bot> {
        let bot_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let config_json =
            serde_json::to_string(config).unwrap_or_else(|_| "{}".to_string());

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO bots (bot_id, owner_client_id, bot_type, config_json, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                bot_id,
                owner_client_id,
                bot_type,
                config_json,
                BotStatus::Created.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        Ok(Bot {
            bot_id,
            owner_client_id: owner_client_id.to_string(),
            bot_type: bot_type.to_string(),
            config: config.clone(),
            status: BotStatus::Created,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_bot(&self, bot_id: &str) -> SqliteResult<Option<Bot>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT bot_id, owner_client_id, bot_type, config_json, status, created_at, updated_at
             FROM bots WHERE bot_id = ?1",
        )?;
        let mut rows = stmt.query_map([bot_id], Self::row_to_bot)?;
        rows.next().transpose()
    }

    /// Persist a new status. Transition validation lives in the registry;
    /// the runner also calls this directly on the late-failure path.
    pub fn update_bot_status(
        &self,
        bot_id: &str,
        status: BotStatus,
    ) -> SqliteResult<Option<Bot>> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE bots SET status = ?1, updated_at = ?2 WHERE bot_id = ?3",
                rusqlite::params![status.as_str(), Utc::now().to_rfc3339(), bot_id],
            )?;
        }
        self.get_bot(bot_id)
    }

    fn row_to_bot(row: &rusqlite::Row) -> rusqlite::Result<Bot> {
        let config_json: String = row.get(3)?;
        let status_str: String = row.get(4)?;
        let created_at_str: String = row.get(5)?;
        let updated_at_str: String = row.get(6)?;

        Ok(Bot {
            bot_id: row.get(0)?,
            owner_client_id: row.get(1)?,
            bot_type: row.get(2)?,
            config: serde_json::from_str(&config_json)
                .unwrap_or_else(|_| serde_json::json!({})),
            status: BotStatus::from_str(&status_str).unwrap_or(BotStatus::Error),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .unwrap()
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .unwrap()
                .with_timezone(&Utc),
        })
    }
}
