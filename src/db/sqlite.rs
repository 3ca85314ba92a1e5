//! SQLite connection handling and schema bootstrap

use rusqlite::{Connection, Result as SqliteResult};
use std::path::Path;
use std::sync::Mutex;

pub struct Database {
    pub(crate) conn: Mutex<Connection>,
}

impl Database {
    pub fn new(db_path: &str) -> SqliteResult<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    rusqlite::Error::ToSqlConversionFailure(Box::new(e))
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.initialize()?;
        Ok(db)
    }

    /// In-memory database for tests
    #[cfg(test)]
    pub fn new_in_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client_id TEXT,
                conversation_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation_id_id
             ON messages (conversation_id, id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_client_conversation_id_id
             ON messages (client_id, conversation_id, id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS clients (
                client_id TEXT PRIMARY KEY,
                name TEXT,
                token_hash TEXT NOT NULL,
                preferences_json TEXT NOT NULL DEFAULT '{}',
                is_primary INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                last_seen_at TEXT
            )",
            [],
        )?;
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_clients_is_primary
             ON clients (is_primary) WHERE is_primary = 1",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS bots (
                bot_id TEXT PRIMARY KEY,
                owner_client_id TEXT NOT NULL,
                bot_type TEXT NOT NULL,
                config_json TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(owner_client_id) REFERENCES clients(client_id)
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_bots_owner_client_id ON bots (owner_client_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS bot_events (
                event_id TEXT PRIMARY KEY,
                bot_id TEXT NOT NULL,
                owner_client_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                message TEXT,
                payload_json TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY(bot_id) REFERENCES bots(bot_id),
                FOREIGN KEY(owner_client_id) REFERENCES clients(client_id)
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_bot_events_bot_id_created_at
             ON bot_events (bot_id, created_at)",
            [],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_parent_dir_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("orty.db");
        let db_path = db_path.to_str().unwrap();

        let bot_id = {
            let db = Database::new(db_path).unwrap();
            let owner = db
                .create_client(Some("Owner"), None, false)
                .unwrap()
                .client_id;
            db.create_bot(&owner, "heartbeat", &serde_json::json!({}))
                .unwrap()
                .bot_id
        };

        // Reopening the same file sees the bot
        let db = Database::new(db_path).unwrap();
        assert!(db.get_bot(&bot_id).unwrap().is_some());
    }
}
