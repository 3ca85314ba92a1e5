//! Client credential database operations

use chrono::{DateTime, Utc};
use rand::RngCore;
use rusqlite::Result as SqliteResult;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::super::Database;
use crate::models::{Client, CreatedClient};

impl Database {
    /// SHA-256 hex digest of a raw client token
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Create a client and hand back the raw token (stored only as a hash).
    /// Marking a client primary demotes any existing primary first.
    pub fn create_client(
        &self,
        name: Option<&str>,
        preferences: Option<serde_json::Value>,
        is_primary: bool,
    ) -> SqliteResult<CreatedClient> {
        let client_id = Uuid::new_v4().to_string();
        let mut token_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut token_bytes);
        let raw_token = hex::encode(token_bytes);
        let token_hash = Self::hash_token(&raw_token);
        let now = Utc::now();
        let preferences = preferences.unwrap_or_else(|| serde_json::json!({}));
        let preferences_json = serde_json::to_string(&preferences)
            .unwrap_or_else(|_| "{}".to_string());

        let conn = self.conn.lock().unwrap();
        if is_primary {
            conn.execute("UPDATE clients SET is_primary = 0 WHERE is_primary = 1", [])?;
        }
        conn.execute(
            "INSERT INTO clients (client_id, name, token_hash, preferences_json, is_primary, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                client_id,
                name,
                token_hash,
                preferences_json,
                is_primary as i64,
                now.to_rfc3339(),
            ],
        )?;

        Ok(CreatedClient {
            client_id,
            client_token: raw_token,
            name: name.map(|s| s.to_string()),
            preferences,
            is_primary,
            created_at: now,
        })
    }

    pub fn get_client(&self, client_id: &str) -> SqliteResult<Option<Client>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT client_id, name, preferences_json, is_primary, created_at, last_seen_at
             FROM clients WHERE client_id = ?1",
        )?;
        let mut rows = stmt.query_map([client_id], Self::row_to_client)?;
        rows.next().transpose()
    }

    pub fn get_primary_client(&self) -> SqliteResult<Option<Client>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT client_id, name, preferences_json, is_primary, created_at, last_seen_at
             FROM clients WHERE is_primary = 1 LIMIT 1",
        )?;
        let mut rows = stmt.query_map([], Self::row_to_client)?;
        rows.next().transpose()
    }

    pub fn list_clients(&self) -> SqliteResult<Vec<Client>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT client_id, name, preferences_json, is_primary, created_at, last_seen_at
             FROM clients ORDER BY created_at DESC",
        )?;
        let clients = stmt
            .query_map([], Self::row_to_client)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(clients)
    }

    /// Compare the token hash and touch last_seen_at on success
    pub fn verify_client_token(&self, client_id: &str, token: &str) -> SqliteResult<bool> {
        let token_hash = Self::hash_token(token);
        let conn = self.conn.lock().unwrap();

        let stored: Option<String> = conn
            .query_row(
                "SELECT token_hash FROM clients WHERE client_id = ?1",
                [client_id],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        match stored {
            Some(hash) if hash == token_hash => {
                conn.execute(
                    "UPDATE clients SET last_seen_at = ?1 WHERE client_id = ?2",
                    rusqlite::params![Utc::now().to_rfc3339(), client_id],
                )?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn row_to_client(row: &rusqlite::Row) -> rusqlite::Result<Client> {
        let preferences_json: String = row.get(2)?;
        let created_at_str: String = row.get(4)?;
        let last_seen_at_str: Option<String> = row.get(5)?;

        Ok(Client {
            client_id: row.get(0)?,
            name: row.get(1)?,
            preferences: serde_json::from_str(&preferences_json)
                .unwrap_or_else(|_| serde_json::json!({})),
            is_primary: row.get::<_, i64>(3)? != 0,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .unwrap()
                .with_timezone(&Utc),
            last_seen_at: last_seen_at_str.map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .unwrap()
                    .with_timezone(&Utc)
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[test]
    fn test_token_hash_is_deterministic() {
        let a = Database::hash_token("some-token");
        let b = Database::hash_token("some-token");
        assert_eq!(a, b);
        assert_ne!(a, Database::hash_token("other-token"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_create_and_verify_client() {
        let db = Database::new_in_memory().unwrap();
        let created = db
            .create_client(Some("Kitchen Tablet"), None, false)
            .unwrap();

        assert!(db
            .verify_client_token(&created.client_id, &created.client_token)
            .unwrap());
        assert!(!db
            .verify_client_token(&created.client_id, "bad-token")
            .unwrap());
        assert!(!db
            .verify_client_token("missing-client", &created.client_token)
            .unwrap());

        // Successful verification touches last_seen_at
        let client = db.get_client(&created.client_id).unwrap().unwrap();
        assert!(client.last_seen_at.is_some());
    }

    #[test]
    fn test_single_primary_client() {
        let db = Database::new_in_memory().unwrap();
        let first = db.create_client(Some("Root"), None, true).unwrap();
        let second = db.create_client(Some("New Root"), None, true).unwrap();

        let primary = db.get_primary_client().unwrap().unwrap();
        assert_eq!(primary.client_id, second.client_id);

        let demoted = db.get_client(&first.client_id).unwrap().unwrap();
        assert!(!demoted.is_primary);
    }
}
