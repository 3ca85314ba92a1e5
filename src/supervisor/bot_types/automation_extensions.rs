//! Automation-extensions workload: one-shot planner that normalizes a
//! list of integration targets and emits a prioritized rollout plan.

use tokio_util::sync::CancellationToken;

use crate::db::Database;
use crate::supervisor::bot_types::WorkloadError;
use crate::supervisor::events::BotEventWriter;

const EXTENSION_FALLBACKS: [&str; 3] = ["github", "slack", "notion"];

/// Trim, lowercase, dedupe, cap at 5. Accepts a single string or an
/// array; anything empty falls back to the default target set.
fn normalized_targets(raw_targets: Option<&serde_json::Value>) -> Vec<String> {
    let raw: Vec<String> = match raw_targets {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        _ => Vec::new(),
    };

    let mut normalized: Vec<String> = Vec::new();
    for target in raw {
        let cleaned = target.trim().to_lowercase();
        if cleaned.is_empty() || normalized.contains(&cleaned) {
            continue;
        }
        normalized.push(cleaned);
    }

    normalized.truncate(5);
    if normalized.is_empty() {
        EXTENSION_FALLBACKS.iter().map(|s| s.to_string()).collect()
    } else {
        normalized
    }
}

fn build_extension_steps(target: &str, memory_text: &str) -> Vec<String> {
    let has_signal = memory_text.contains(target);
    vec![
        format!("Define `{}` integration contract and required secrets.", target),
        format!("Create `{}` adapter interface with capability flags.", target),
        if has_signal {
            format!(
                "Add `{}` event flow tests using captured chat-memory scenarios.",
                target
            )
        } else {
            format!("Add `{}` event flow tests with synthetic fixtures.", target)
        },
    ]
}

pub async fn run_automation_extensions_bot(
    bot_id: &str,
    owner_client_id: &str,
    config: &serde_json::Value,
    db: &Database,
    event_writer: &BotEventWriter,
    cancel: &CancellationToken,
) -> Result<(), WorkloadError> {
    let conversation_id = config
        .get("conversation_id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty());
    let history_limit = config
        .get("history_limit")
        .and_then(|v| v.as_i64())
        .filter(|&n| n > 0)
        .unwrap_or(20);

    let extension_targets = normalized_targets(config.get("integration_targets"));
    let memory_messages = match conversation_id {
        Some(conv) => db.get_recent_messages(conv, history_limit, None)?,
        None => Vec::new(),
    };
    let memory_text = memory_messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();

    event_writer.emit(
        bot_id,
        owner_client_id,
        "AUTOMATION_EXTENSIONS_STARTED",
        Some("Automation extensions planning started."),
        Some(&serde_json::json!({"targets": &extension_targets})),
    )?;

    if cancel.is_cancelled() {
        return Err(WorkloadError::Cancelled);
    }

    let plans: Vec<serde_json::Value> = extension_targets
        .iter()
        .map(|target| {
            serde_json::json!({
                "target": target,
                "priority": if memory_text.contains(target.as_str()) { "high" } else { "medium" },
                "steps": build_extension_steps(target, &memory_text),
            })
        })
        .collect();

    event_writer.emit(
        bot_id,
        owner_client_id,
        "AUTOMATION_EXTENSION_PLAN",
        Some("Generated automation extension execution plan."),
        Some(&serde_json::json!({
            "conversation_id": conversation_id,
            "considered_memory_messages": memory_messages.len(),
            "plans": plans,
            "human_review_required": true,
        })),
    )?;

    event_writer.emit(
        bot_id,
        owner_client_id,
        "AUTOMATION_EXTENSIONS_COMPLETED",
        Some("Automation extensions plan completed and ready for implementation."),
        Some(&serde_json::json!({"human_review_required": true})),
    )?;

    Ok(())
}
