//! Code-review workload: clones the target repository into an ephemeral
//! workspace, derives roadmap focus areas, cross-references recent
//! conversation history, and emits ranked change proposals. Nothing is
//! ever auto-applied; every proposal carries `human_review_required`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::Database;
use crate::models::ConversationMessage;
use crate::supervisor::bot_types::WorkloadError;
use crate::supervisor::events::BotEventWriter;

const CLONE_TIMEOUT_SECS: u64 = 30;

const ROADMAP_FALLBACK: [&str; 3] = [
    "Conversation lifecycle controls",
    "Safer, extensible tool contracts",
    "Automation + integration expansion",
];

fn extract_focus_areas(roadmap_text: &str) -> Vec<String> {
    let lines: Vec<String> = roadmap_text
        .lines()
        .map(|line| {
            line.trim_matches(|c: char| c == ' ' || c == '-' || c == '\t')
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return ROADMAP_FALLBACK.iter().map(|s| s.to_string()).collect();
    }

    let focus: Vec<String> = lines.into_iter().filter(|line| line.len() > 8).collect();
    if focus.is_empty() {
        ROADMAP_FALLBACK.iter().map(|s| s.to_string()).collect()
    } else {
        focus.into_iter().take(5).collect()
    }
}

fn build_proposals(
    focus_areas: &[String],
    memory_messages: &[ConversationMessage],
    max_items: usize,
) -> Vec<serde_json::Value> {
    let memory_text = memory_messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();

    focus_areas
        .iter()
        .take(max_items)
        .enumerate()
        .map(|(idx, area)| {
            let mentions = area
                .split_whitespace()
                .map(|token| token.to_lowercase())
                .filter(|token| token.len() > 4)
                .collect::<std::collections::HashSet<_>>()
                .iter()
                .filter(|token| memory_text.contains(token.as_str()))
                .count();

            let relevance = if mentions >= 2 {
                "high"
            } else if mentions == 1 {
                "medium"
            } else {
                "baseline"
            };

            serde_json::json!({
                "proposal_id": format!("proposal-{}", idx + 1),
                "title": format!("Advance roadmap area: {}", area),
                "summary": "Prepare a focused pull request with tests that advances this roadmap objective. \
                            Use chat memory signals to prioritize concrete APIs and guardrails.",
                "memory_relevance": relevance,
                "memory_mentions": mentions,
                "human_review_required": true,
            })
        })
        .collect()
}

/// Shallow-clone the repository into `clone_dir`, bounded by a timeout.
/// The child is killed when the timeout expires or when cancellation is
/// observed while waiting (kill_on_drop covers both).
async fn clone_repo(
    repository_url: &str,
    branch: Option<&str>,
    clone_dir: &Path,
    cancel: &CancellationToken,
) -> Result<(), WorkloadError> {
    let mut cmd = Command::new("git");
    cmd.arg("clone").arg("--depth").arg("1");
    if let Some(branch) = branch {
        cmd.arg("--branch").arg(branch);
    }
    cmd.arg(repository_url).arg(clone_dir);
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| WorkloadError::Failed(format!("Failed to spawn git clone: {}", e)))?;

    let output = tokio::select! {
        _ = cancel.cancelled() => return Err(WorkloadError::Cancelled),
        result = tokio::time::timeout(
            Duration::from_secs(CLONE_TIMEOUT_SECS),
            child.wait_with_output(),
        ) => match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(WorkloadError::Failed(format!("Clone process error: {}", e)))
            }
            Err(_) => return Err(WorkloadError::Failed("Repository clone timed out".to_string())),
        },
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            "Failed to clone repository".to_string()
        } else {
            stderr
        };
        return Err(WorkloadError::Failed(detail));
    }
    Ok(())
}

pub async fn run_code_review_bot(
    bot_id: &str,
    owner_client_id: &str,
    config: &serde_json::Value,
    db: &Database,
    event_writer: &BotEventWriter,
    cancel: &CancellationToken,
) -> Result<(), WorkloadError> {
    let clone_dir = std::env::temp_dir().join(format!("orty-review-{}", Uuid::new_v4()));

    let result = review_cycle(
        bot_id,
        owner_client_id,
        config,
        db,
        event_writer,
        cancel,
        &clone_dir,
    )
    .await;

    // The ephemeral workspace is removed on every exit path: success,
    // failure, and cancellation alike.
    if clone_dir.exists() {
        if let Err(e) = tokio::fs::remove_dir_all(&clone_dir).await {
            log::warn!("Failed to remove review workspace {:?}: {}", clone_dir, e);
        }
    }

    result
}

async fn review_cycle(
    bot_id: &str,
    owner_client_id: &str,
    config: &serde_json::Value,
    db: &Database,
    event_writer: &BotEventWriter,
    cancel: &CancellationToken,
    clone_dir: &PathBuf,
) -> Result<(), WorkloadError> {
    let repository_url = config
        .get("repository_url")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(".");
    let branch = config
        .get("branch")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty());
    let conversation_id = config
        .get("conversation_id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty());
    let history_limit = positive_or(config.get("history_limit"), 20);
    let max_proposals = positive_or(config.get("max_proposals"), 3);
    let roadmap_text = config
        .get("roadmap_text")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    event_writer.emit(
        bot_id,
        owner_client_id,
        "REVIEW_STARTED",
        Some("Code review bot started. Any generated PRs require human review before merge."),
        Some(&serde_json::json!({
            "repository_url": repository_url,
            "branch": branch,
            "human_review_required": true,
        })),
    )?;

    clone_repo(repository_url, branch, clone_dir, cancel).await?;

    event_writer.emit(
        bot_id,
        owner_client_id,
        "REPO_CLONED",
        Some(&format!(
            "Cloned repository into temporary workspace: {}",
            clone_dir.display()
        )),
        Some(&serde_json::json!({
            "branch": branch,
            "human_review_required": true,
        })),
    )?;

    if cancel.is_cancelled() {
        return Err(WorkloadError::Cancelled);
    }

    let memory_messages = match conversation_id {
        Some(conv) => db.get_recent_messages(conv, history_limit, None)?,
        None => Vec::new(),
    };

    let focus_areas = extract_focus_areas(roadmap_text);
    let proposals = build_proposals(&focus_areas, &memory_messages, max_proposals as usize);

    event_writer.emit(
        bot_id,
        owner_client_id,
        "REVIEW_PROPOSAL",
        Some("Generated roadmap-aligned change proposals. Human PR review is mandatory."),
        Some(&serde_json::json!({
            "conversation_id": conversation_id,
            "considered_memory_messages": memory_messages.len(),
            "proposals": proposals,
            "human_review_required": true,
        })),
    )?;

    event_writer.emit(
        bot_id,
        owner_client_id,
        "REVIEW_COMPLETED",
        Some("Code review cycle completed. Awaiting human-reviewed pull requests."),
        Some(&serde_json::json!({"human_review_required": true})),
    )?;

    Ok(())
}

fn positive_or(value: Option<&serde_json::Value>, default: i64) -> i64 {
    value
        .and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        })
        .filter(|&n| n > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> ConversationMessage {
        ConversationMessage {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_focus_areas_fallback_on_empty_roadmap() {
        let areas = extract_focus_areas("");
        assert_eq!(areas.len(), 3);
        assert_eq!(areas[0], "Conversation lifecycle controls");
    }

    #[test]
    fn test_focus_areas_fallback_when_all_lines_short() {
        let areas = extract_focus_areas("- short\n- tiny\n");
        assert_eq!(areas, extract_focus_areas(""));
    }

    #[test]
    fn test_focus_areas_strips_bullets_and_caps_at_five() {
        let roadmap = "- Improve conversation controls\n\
                       - Harden the tool contracts\n\
                       - Expand automation targets\n\
                       - Refactor memory indexing\n\
                       - Polish the mobile client\n\
                       - Overflow area beyond cap\n";
        let areas = extract_focus_areas(roadmap);
        assert_eq!(areas.len(), 5);
        assert_eq!(areas[0], "Improve conversation controls");
        assert!(!areas.contains(&"Overflow area beyond cap".to_string()));
    }

    #[test]
    fn test_proposal_relevance_ranking() {
        let focus = vec!["Conversation lifecycle controls".to_string()];

        // Two distinct keyword hits -> high
        let history = vec![msg("we discussed conversation lifecycle yesterday")];
        let proposals = build_proposals(&focus, &history, 3);
        assert_eq!(proposals[0]["memory_relevance"], "high");
        assert_eq!(proposals[0]["memory_mentions"], 2);

        // One hit -> medium
        let history = vec![msg("the conversation went well")];
        let proposals = build_proposals(&focus, &history, 3);
        assert_eq!(proposals[0]["memory_relevance"], "medium");

        // No hits -> baseline
        let proposals = build_proposals(&focus, &[], 3);
        assert_eq!(proposals[0]["memory_relevance"], "baseline");
        assert_eq!(proposals[0]["human_review_required"], true);
    }

    #[test]
    fn test_proposals_capped_at_max_items() {
        let focus: Vec<String> = (0..5).map(|i| format!("Focus area number {}", i)).collect();
        let proposals = build_proposals(&focus, &[], 2);
        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0]["proposal_id"], "proposal-1");
        assert_eq!(proposals[1]["proposal_id"], "proposal-2");
    }

    #[test]
    fn test_positive_or_rejects_bad_values() {
        assert_eq!(positive_or(Some(&serde_json::json!(7)), 20), 7);
        assert_eq!(positive_or(Some(&serde_json::json!("7")), 20), 7);
        assert_eq!(positive_or(Some(&serde_json::json!(0)), 20), 20);
        assert_eq!(positive_or(Some(&serde_json::json!(-3)), 20), 20);
        assert_eq!(positive_or(Some(&serde_json::json!("junk")), 20), 20);
        assert_eq!(positive_or(None, 20), 20);
    }
}
