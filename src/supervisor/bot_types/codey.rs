//! Codey workload: one-shot planner that validates a requested set of
//! operating modes and emits a static architecture document for a
//! sandboxed multi-model coding agent. Pure planning output; nothing is
//! executed.

use tokio_util::sync::CancellationToken;

use crate::supervisor::bot_types::WorkloadError;
use crate::supervisor::events::BotEventWriter;

const DEFAULT_MODES: [&str; 5] = [
    "conversation",
    "architecture",
    "code_generation",
    "code_review",
    "debugging",
];

fn mode_prompt(mode: &str) -> Option<&'static str> {
    match mode {
        "conversation" => Some(
            "You are in conversation mode. Clarify goals, ask focused follow-ups, \
             and summarize decisions before acting.",
        ),
        "architecture" => Some(
            "You are in architecture mode. Propose modular system designs, \
             explicit interfaces, trade-offs, and rollout steps.",
        ),
        "code_generation" => Some(
            "You are in code generation mode. Produce implementation-ready code, \
             tests, and concise rationale with secure defaults.",
        ),
        "code_review" => Some(
            "You are in code review mode. Audit correctness, security, and maintainability, \
             then provide actionable, prioritized fixes.",
        ),
        "debugging" => Some(
            "You are in debugging mode. Reproduce issues, isolate root cause, and propose \
             minimal-risk patches with validation commands.",
        ),
        _ => None,
    }
}

const BEST_PRACTICES_SYSTEM_PROMPT: &str =
    "You are Codey, a senior software engineering agent. \
     Prioritize safety, reproducibility, and deterministic outputs. \
     Always explain assumptions, propose tests, and avoid hidden side effects. \
     All shell commands must execute inside a dedicated sandboxed Docker workspace. \
     Internet access is restricted to data retrieval and GitHub interactions.";

const INTENT_RESOLVER_SYSTEM_PROMPT: &str =
    "You are Codey's intent resolver. Classify user intent and select exactly one mode from: \
     conversation, architecture, code_generation, code_review, debugging.";

/// Validate the requested mode subset against the closed mode set.
/// Unknown modes are dropped; an empty or all-unknown request falls back
/// to the full default set.
fn normalized_modes(raw_modes: Option<&serde_json::Value>) -> Vec<String> {
    let raw: Vec<String> = match raw_modes {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        _ => Vec::new(),
    };

    let mut normalized: Vec<String> = Vec::new();
    for mode in raw {
        let candidate = mode.trim().to_lowercase().replace(' ', "_");
        if candidate.is_empty()
            || normalized.contains(&candidate)
            || mode_prompt(&candidate).is_none()
        {
            continue;
        }
        normalized.push(candidate);
    }

    if normalized.is_empty() {
        DEFAULT_MODES.iter().map(|s| s.to_string()).collect()
    } else {
        normalized
    }
}

fn codey_spec(config: &serde_json::Value, modes: &[String]) -> serde_json::Value {
    let get_str = |key: &str, default: &str| -> String {
        config
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    let mode_prompts: serde_json::Map<String, serde_json::Value> = modes
        .iter()
        .filter_map(|mode| {
            mode_prompt(mode).map(|prompt| (mode.clone(), serde_json::json!(prompt)))
        })
        .collect();

    serde_json::json!({
        "working_title": get_str("working_title", "Codey"),
        "intent_resolver": {
            "provider": "ollama",
            "model": get_str("intent_model", "gwen3:0.6b"),
            "role": "Intent classification and mode routing",
        },
        "main_llm": {
            "provider": "ollama",
            "model": get_str("main_model", "qwen3-coder:480b"),
            "hosting": "cloud",
        },
        "fallback_llm": {
            "provider": "ollama",
            "model": get_str("fallback_model", "qwen2.5:1.5b"),
            "hosting": "local",
            "trigger": "Primary model unavailable, timeout, or budget guardrail",
        },
        "memory": {
            "engine": "sqlite",
            "strategy": "Store condensed conversation context, tool outputs, and mode decisions",
        },
        "runtime_sandbox": {
            "executor": "docker",
            "policy": "All development tools and shell commands execute inside isolated per-task container",
            "internet_access": {
                "allow_github": true,
                "allow_data_retrieval": true,
                "deny_other_domains_by_default": true,
            },
            "allowed_network": ["github.com", "api.github.com"],
        },
        "tooling": {
            "supports_git": true,
            "supports_terminal": true,
            "supports_tests": true,
            "supports_linters": true,
        },
        "system_prompts": {
            "high_level": BEST_PRACTICES_SYSTEM_PROMPT,
            "intent_resolver": INTENT_RESOLVER_SYSTEM_PROMPT,
            "mode_prompts": mode_prompts,
        },
        "implementation_notes": [
            "Start one sandbox container per task/session and mount only workspace paths.",
            "Run git operations from the sandboxed container workspace.",
            "Persist summaries and tool traces through schema-migrated storage.",
        ],
        "human_review_required": true,
    })
}

pub async fn run_codey_bot(
    bot_id: &str,
    owner_client_id: &str,
    config: &serde_json::Value,
    event_writer: &BotEventWriter,
    cancel: &CancellationToken,
) -> Result<(), WorkloadError> {
    let modes = normalized_modes(config.get("modes"));
    let spec = codey_spec(config, &modes);

    event_writer.emit(
        bot_id,
        owner_client_id,
        "CODEY_PLANNING_STARTED",
        Some("Codey planning started with intent resolver and multi-model routing."),
        Some(&serde_json::json!({
            "working_title": spec["working_title"],
            "modes": modes,
        })),
    )?;

    if cancel.is_cancelled() {
        return Err(WorkloadError::Cancelled);
    }

    event_writer.emit(
        bot_id,
        owner_client_id,
        "CODEY_ARCHITECTURE_DRAFTED",
        Some("Drafted Codey architecture with sandboxed Docker execution and restricted network policy."),
        Some(&spec),
    )?;

    event_writer.emit(
        bot_id,
        owner_client_id,
        "CODEY_COMPLETED",
        Some("Codey plan completed; ready for implementation behind human review."),
        Some(&serde_json::json!({"human_review_required": true})),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use std::sync::Arc;

    #[test]
    fn test_modes_fallback_to_full_default_set() {
        assert_eq!(normalized_modes(None).len(), 5);
        assert_eq!(
            normalized_modes(Some(&serde_json::json!(["made_up", "bogus"]))).len(),
            5
        );
        assert_eq!(normalized_modes(Some(&serde_json::json!([]))).len(), 5);
    }

    #[test]
    fn test_modes_drop_unknown_and_dedupe() {
        let modes = normalized_modes(Some(&serde_json::json!([
            "Debugging",
            "code review",
            "debugging",
            "not_a_mode"
        ])));
        assert_eq!(modes, vec!["debugging", "code_review"]);
    }

    #[test]
    fn test_spec_includes_only_selected_mode_prompts() {
        let modes = vec!["debugging".to_string()];
        let spec = codey_spec(&serde_json::json!({}), &modes);

        let prompts = spec["system_prompts"]["mode_prompts"].as_object().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts.contains_key("debugging"));
        assert_eq!(spec["human_review_required"], true);
        assert_eq!(spec["working_title"], "Codey");
    }

    #[test]
    fn test_spec_honors_config_overrides() {
        let config = serde_json::json!({
            "working_title": "Codey Mark II",
            "main_model": "custom-model",
        });
        let spec = codey_spec(&config, &normalized_modes(None));
        assert_eq!(spec["working_title"], "Codey Mark II");
        assert_eq!(spec["main_llm"]["model"], "custom-model");
        assert_eq!(spec["runtime_sandbox"]["executor"], "docker");
    }

    #[tokio::test]
    async fn test_planning_events_emitted_in_order() {
        let db = Arc::new(Database::new_in_memory().unwrap());
        let writer = BotEventWriter::new(db.clone());
        let owner = db
            .create_client(Some("Owner"), None, false)
            .unwrap()
            .client_id;
        let bot = db
            .create_bot(&owner, "codey", &serde_json::json!({}))
            .unwrap();

        let cancel = CancellationToken::new();
        run_codey_bot(&bot.bot_id, &owner, &serde_json::json!({}), &writer, &cancel)
            .await
            .unwrap();

        let events = db.list_bot_events(&bot.bot_id, 10).unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["CODEY_PLANNING_STARTED", "CODEY_ARCHITECTURE_DRAFTED", "CODEY_COMPLETED"]
        );
    }
}
