//! Bot runner: maps start/stop/pause intents onto supervised, cancellable
//! tokio tasks while keeping persisted status consistent with what is
//! actually executing.
//!
//! The task-handle map is the only concurrently mutated in-memory state in
//! the supervisor. Duplicate and capacity checks, the status transition,
//! and handle insertion all happen under the map's lock, so two racing
//! start calls for the same bot cannot both pass.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::db::Database;
use crate::models::{Bot, BotStatus, BotType};
use crate::supervisor::bot_types::{
    run_automation_extensions_bot, run_code_review_bot, run_codey_bot, run_heartbeat_bot,
    WorkloadError,
};
use crate::supervisor::error::SupervisorError;
use crate::supervisor::events::BotEventWriter;
use crate::supervisor::registry::BotRegistry;

/// In-memory association between a bot and its live execution.
/// At most one per bot id; never persisted.
struct BotTaskHandle {
    join: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Workload resolved from the bot's type and config, before any status
/// transition. Validation failures here must leave the bot untouched.
enum ResolvedWorkload {
    Heartbeat { interval_seconds: u64 },
    CodeReview { config: serde_json::Value },
    AutomationExtensions { config: serde_json::Value },
    Codey { config: serde_json::Value },
}

pub struct BotRunner {
    registry: Arc<BotRegistry>,
    db: Arc<Database>,
    event_writer: Arc<BotEventWriter>,
    tasks: tokio::sync::Mutex<HashMap<String, BotTaskHandle>>,
    max_concurrent_bots: usize,
    default_heartbeat_seconds: u64,
}

impl BotRunner {
    pub fn new(
        registry: Arc<BotRegistry>,
        db: Arc<Database>,
        event_writer: Arc<BotEventWriter>,
        max_concurrent_bots: usize,
        default_heartbeat_seconds: u64,
    ) -> Self {
        Self {
            registry,
            db,
            event_writer,
            tasks: tokio::sync::Mutex::new(HashMap::new()),
            max_concurrent_bots,
            default_heartbeat_seconds,
        }
    }

    /// Start executing a bot. Workload resolution happens before the
    /// status flips to `running`, so a bad type or config can never leave
    /// the bot stuck in `running` with no actual task behind it.
    pub async fn start_bot(&self, bot_id: &str) -> Result<Bot, SupervisorError> {
        let bot = self.registry.get_bot(bot_id)?;

        let mut tasks = self.tasks.lock().await;

        if let Some(handle) = tasks.get(bot_id) {
            if !handle.join.is_finished() {
                return Err(SupervisorError::Conflict("Bot is already running".to_string()));
            }
        }

        let live = tasks.values().filter(|h| !h.join.is_finished()).count();
        if live >= self.max_concurrent_bots {
            return Err(SupervisorError::Conflict("Bot runner capacity reached".to_string()));
        }

        let workload = self.resolve_workload(&bot)?;

        self.registry
            .transition(bot_id, BotStatus::Running, "STARTED")?;
        let handle = self.spawn_workload(&bot, workload);
        tasks.insert(bot_id.to_string(), handle);
        drop(tasks);

        self.registry.get_bot(bot_id)
    }

    /// Stop (or pause) a bot. When a live task exists, cancellation is
    /// signalled and the call blocks until the task acknowledges by
    /// terminating. Skips the transition when the status already equals
    /// the target, so repeated stops do not duplicate lifecycle events.
    pub async fn stop_bot(&self, bot_id: &str, paused: bool) -> Result<Bot, SupervisorError> {
        self.registry.get_bot(bot_id)?;

        let (target, event) = if paused {
            (BotStatus::Paused, "PAUSED")
        } else {
            (BotStatus::Stopped, "STOPPED")
        };

        let handle = self.tasks.lock().await.remove(bot_id);
        if let Some(handle) = handle {
            handle.cancel.cancel();
            if let Err(e) = handle.join.await {
                log::warn!("Bot task {} join error during stop: {}", bot_id, e);
            }
        }

        // Reload after the task has fully terminated: a one-shot workload
        // may already have written its own terminal status.
        let bot = self.registry.get_bot(bot_id)?;
        if bot.status != target {
            self.registry.transition(bot_id, target, event)?;
        }
        self.registry.get_bot(bot_id)
    }

    /// Number of live tasks right now (for health reporting)
    pub async fn running_count(&self) -> usize {
        let tasks = self.tasks.lock().await;
        tasks.values().filter(|h| !h.join.is_finished()).count()
    }

    /// Cancel every live task and wait (bounded) for each to terminate.
    /// Used on process shutdown only; per-bot stop remains unbounded.
    pub async fn shutdown(&self, timeout: Duration) {
        let handles: Vec<(String, BotTaskHandle)> = {
            let mut tasks = self.tasks.lock().await;
            tasks.drain().collect()
        };
        if handles.is_empty() {
            return;
        }

        log::info!("Shutting down {} running bot task(s)", handles.len());
        for (_, handle) in &handles {
            handle.cancel.cancel();
        }
        for (bot_id, handle) in handles {
            if tokio::time::timeout(timeout, handle.join).await.is_err() {
                log::warn!("Bot task {} ignored cancellation during shutdown", bot_id);
            }
        }
    }

    fn resolve_workload(&self, bot: &Bot) -> Result<ResolvedWorkload, SupervisorError> {
        let bot_type = BotType::from_str(&bot.bot_type).ok_or_else(|| {
            SupervisorError::Conflict(format!("Unsupported bot type '{}'", bot.bot_type))
        })?;
        log::debug!("Resolved {} workload for bot {}", bot_type.as_str(), bot.bot_id);

        match bot_type {
            BotType::Heartbeat => Ok(ResolvedWorkload::Heartbeat {
                interval_seconds: self.parse_heartbeat_interval(bot)?,
            }),
            BotType::CodeReview => Ok(ResolvedWorkload::CodeReview {
                config: bot.config.clone(),
            }),
            BotType::AutomationExtensions => Ok(ResolvedWorkload::AutomationExtensions {
                config: bot.config.clone(),
            }),
            BotType::Codey => Ok(ResolvedWorkload::Codey {
                config: bot.config.clone(),
            }),
        }
    }

    fn parse_heartbeat_interval(&self, bot: &Bot) -> Result<u64, SupervisorError> {
        let raw = match bot.config.get("interval_seconds") {
            Some(value) => value,
            None => return Ok(self.default_heartbeat_seconds),
        };

        let interval = raw
            .as_i64()
            .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))
            .ok_or_else(|| {
                SupervisorError::Validation(
                    "interval_seconds must be a positive integer".to_string(),
                )
            })?;

        if interval <= 0 {
            return Err(SupervisorError::Validation(
                "interval_seconds must be greater than 0".to_string(),
            ));
        }
        Ok(interval as u64)
    }

    /// Launch the resolved workload as an independent cancellable task.
    /// The spawned future owns completion handling: cooperative
    /// cancellation ends quietly, one-shot success self-terminates to
    /// `stopped`, and any failure is persisted as `error` plus an ERROR
    /// event. `error` must be reachable from any status after a crash,
    /// so both terminal writes bypass the transition table.
    fn spawn_workload(&self, bot: &Bot, workload: ResolvedWorkload) -> BotTaskHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let db = self.db.clone();
        let event_writer = self.event_writer.clone();
        let bot_id = bot.bot_id.clone();
        let owner_client_id = bot.owner_client_id.clone();

        let join = tokio::spawn(async move {
            let result = match workload {
                ResolvedWorkload::Heartbeat { interval_seconds } => {
                    run_heartbeat_bot(
                        &bot_id,
                        &owner_client_id,
                        interval_seconds,
                        &event_writer,
                        &token,
                    )
                    .await
                }
                ResolvedWorkload::CodeReview { config } => {
                    run_code_review_bot(
                        &bot_id,
                        &owner_client_id,
                        &config,
                        &db,
                        &event_writer,
                        &token,
                    )
                    .await
                }
                ResolvedWorkload::AutomationExtensions { config } => {
                    run_automation_extensions_bot(
                        &bot_id,
                        &owner_client_id,
                        &config,
                        &db,
                        &event_writer,
                        &token,
                    )
                    .await
                }
                ResolvedWorkload::Codey { config } => {
                    run_codey_bot(&bot_id, &owner_client_id, &config, &event_writer, &token).await
                }
            };

            match result {
                Ok(()) => {
                    // One-shot workload ran to completion on its own
                    if let Err(e) = db.update_bot_status(&bot_id, BotStatus::Stopped) {
                        log::error!("Failed to mark bot {} stopped: {}", bot_id, e);
                    }
                    log::info!("Bot {} completed its workload", bot_id);
                }
                Err(WorkloadError::Cancelled) => {
                    log::info!("Bot {} task cancelled", bot_id);
                }
                Err(WorkloadError::Failed(message)) => {
                    log::error!("Bot {} workload failed: {}", bot_id, message);
                    if let Err(e) = db.update_bot_status(&bot_id, BotStatus::Error) {
                        log::error!("Failed to mark bot {} errored: {}", bot_id, e);
                    }
                    if let Err(e) =
                        event_writer.emit(&bot_id, &owner_client_id, "ERROR", Some(&message), None)
                    {
                        log::error!("Failed to write ERROR event for bot {}: {}", bot_id, e);
                    }
                }
            }
        });

        BotTaskHandle { join, cancel }
    }
}
