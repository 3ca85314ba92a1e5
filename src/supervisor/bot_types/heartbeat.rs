//! Heartbeat workload: emits a HEARTBEAT event every interval, forever.
//! Runs until cancelled; the sleep is the sole suspension point.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::supervisor::bot_types::WorkloadError;
use crate::supervisor::events::BotEventWriter;

pub async fn run_heartbeat_bot(
    bot_id: &str,
    owner_client_id: &str,
    interval_seconds: u64,
    event_writer: &BotEventWriter,
    cancel: &CancellationToken,
) -> Result<(), WorkloadError> {
    loop {
        if cancel.is_cancelled() {
            return Err(WorkloadError::Cancelled);
        }

        event_writer.emit(
            bot_id,
            owner_client_id,
            "HEARTBEAT",
            Some(&format!("Heartbeat emitted every {}s", interval_seconds)),
            None,
        )?;

        tokio::select! {
            _ = cancel.cancelled() => return Err(WorkloadError::Cancelled),
            _ = tokio::time::sleep(Duration::from_secs(interval_seconds)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use std::sync::Arc;

    fn setup() -> (Arc<Database>, BotEventWriter, String, String) {
        let db = Arc::new(Database::new_in_memory().unwrap());
        let writer = BotEventWriter::new(db.clone());
        let owner = db
            .create_client(Some("Owner"), None, false)
            .unwrap()
            .client_id;
        let bot = db
            .create_bot(&owner, "heartbeat", &serde_json::json!({}))
            .unwrap();
        (db, writer, bot.bot_id, owner)
    }

    #[tokio::test]
    async fn test_emits_heartbeats_until_cancelled() {
        let (db, writer, bot_id, owner_id) = setup();
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2200)).await;
            canceller.cancel();
        });

        let result = run_heartbeat_bot(&bot_id, &owner_id, 1, &writer, &cancel).await;
        assert!(matches!(result, Err(WorkloadError::Cancelled)));

        let events = db.list_bot_events(&bot_id, 100).unwrap();
        // First beat at t=0, then roughly every second until cancellation
        assert!(events.len() >= 2, "expected at least 2 heartbeats, got {}", events.len());
        assert!(events.iter().all(|e| e.event_type == "HEARTBEAT"));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_emits_nothing() {
        let (db, writer, bot_id, owner_id) = setup();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = run_heartbeat_bot(&bot_id, &owner_id, 1, &writer, &cancel).await;
        assert!(matches!(result, Err(WorkloadError::Cancelled)));
        assert!(db.list_bot_events(&bot_id, 100).unwrap().is_empty());
    }
}
