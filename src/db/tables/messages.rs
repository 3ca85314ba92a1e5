//! Conversation history database operations

use chrono::Utc;
use rusqlite::Result as SqliteResult;
use uuid::Uuid;

use super::super::Database;
use crate::models::ConversationMessage;

impl Database {
    /// Reuse the given conversation id or mint a fresh one
    pub fn ensure_conversation_id(conversation_id: Option<&str>) -> String {
        match conversation_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        }
    }

    pub fn append_message(
        &self,
        client_id: Option<&str>,
        conversation_id: &str,
        role: &str,
        content: &str,
    ) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO messages (client_id, conversation_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                client_id,
                conversation_id,
                role,
                content,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Last `limit` messages of a conversation, oldest first. When a
    /// client id is given, history is scoped to that client's rows.
    pub fn get_recent_messages(
        &self,
        conversation_id: &str,
        limit: i64,
        client_id: Option<&str>,
    ) -> SqliteResult<Vec<ConversationMessage>> {
        let conn = self.conn.lock().unwrap();

        let mut messages: Vec<ConversationMessage> = if let Some(cid) = client_id {
            let mut stmt = conn.prepare(
                "SELECT role, content FROM messages
                 WHERE conversation_id = ?1 AND client_id = ?2
                 ORDER BY id DESC LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![conversation_id, cid, limit], |row| {
                    Ok(ConversationMessage {
                        role: row.get(0)?,
                        content: row.get(1)?,
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();
            rows
        } else {
            let mut stmt = conn.prepare(
                "SELECT role, content FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY id DESC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![conversation_id, limit], |row| {
                    Ok(ConversationMessage {
                        role: row.get(0)?,
                        content: row.get(1)?,
                    })
                })?
                .filter_map(|r| r.ok())
                .collect();
            rows
        };

        messages.reverse();
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;

    #[test]
    fn test_ensure_conversation_id() {
        assert_eq!(Database::ensure_conversation_id(Some("conv-1")), "conv-1");
        let minted = Database::ensure_conversation_id(None);
        assert!(!minted.is_empty());
        let minted_again = Database::ensure_conversation_id(None);
        assert_ne!(minted, minted_again);
    }

    #[test]
    fn test_recent_messages_order_and_limit() {
        let db = Database::new_in_memory().unwrap();
        for i in 0..5 {
            db.append_message(None, "conv-1", "user", &format!("message {}", i))
                .unwrap();
        }

        let messages = db.get_recent_messages("conv-1", 3, None).unwrap();
        assert_eq!(messages.len(), 3);
        // Last three, oldest first
        assert_eq!(messages[0].content, "message 2");
        assert_eq!(messages[2].content, "message 4");
    }

    #[test]
    fn test_recent_messages_client_scoping() {
        let db = Database::new_in_memory().unwrap();
        db.append_message(Some("client-a"), "conv-1", "user", "from a")
            .unwrap();
        db.append_message(Some("client-b"), "conv-1", "user", "from b")
            .unwrap();

        let scoped = db
            .get_recent_messages("conv-1", 10, Some("client-a"))
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].content, "from a");

        let unscoped = db.get_recent_messages("conv-1", 10, None).unwrap();
        assert_eq!(unscoped.len(), 2);
    }
}
