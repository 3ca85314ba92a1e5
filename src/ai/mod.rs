//! LLM provider adapters for the chat endpoint.
//!
//! Provider failures are soft: the error text becomes the assistant reply
//! instead of an HTTP error, so a misconfigured key never breaks the
//! conversation flow.

use std::time::Duration;

use crate::config::Config;
use crate::models::ConversationMessage;

pub const SYSTEM_PROMPT: &str = "You are Orty, a concise and intelligent on-device assistant.";

const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct AiService {
    provider: String,
    openai_api_key: Option<String>,
    openai_model: String,
    ollama_base_url: String,
    ollama_model: String,
}

impl AiService {
    pub fn new(config: &Config) -> Self {
        Self {
            provider: config.llm_provider.to_lowercase(),
            openai_api_key: config.openai_api_key.clone(),
            openai_model: config.openai_model.clone(),
            ollama_base_url: config.ollama_base_url.trim_end_matches('/').to_string(),
            ollama_model: config.ollama_model.clone(),
        }
    }

    pub async fn generate(&self, message: &str, history: &[ConversationMessage]) -> String {
        match self.provider.as_str() {
            "openai" => self.generate_openai(message, history).await,
            "ollama" => self.generate_ollama(message, history).await,
            other => format!(
                "Unsupported LLM_PROVIDER '{}'. Available providers: ollama, openai.",
                other
            ),
        }
    }

    async fn generate_openai(&self, message: &str, history: &[ConversationMessage]) -> String {
        let api_key = match &self.openai_api_key {
            Some(key) if !key.is_empty() => key,
            _ => return "OPENAI_API_KEY not configured.".to_string(),
        };

        let payload = serde_json::json!({
            "model": self.openai_model,
            "messages": build_messages(message, history),
        });

        let client = match http_client() {
            Ok(c) => c,
            Err(e) => return format!("OpenAI error: {}", e),
        };

        let response = match client
            .post(OPENAI_CHAT_COMPLETIONS_URL)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return format!("OpenAI error: {}", e),
        };

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return format!("OpenAI error: {}", body);
        }

        match response.json::<serde_json::Value>().await {
            Ok(data) => data["choices"][0]["message"]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            Err(e) => format!("OpenAI error: {}", e),
        }
    }

    async fn generate_ollama(&self, message: &str, history: &[ConversationMessage]) -> String {
        let payload = serde_json::json!({
            "model": self.ollama_model,
            "stream": false,
            "messages": build_messages(message, history),
        });

        let client = match http_client() {
            Ok(c) => c,
            Err(e) => return format!("Ollama error: {}", e),
        };

        let url = format!("{}/api/chat", self.ollama_base_url);
        let response = match client.post(&url).json(&payload).send().await {
            Ok(r) => r,
            Err(e) => return format!("Ollama error: {}", e),
        };

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return format!("Ollama error: {}", body);
        }

        match response.json::<serde_json::Value>().await {
            Ok(data) => data["message"]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            Err(e) => format!("Ollama error: {}", e),
        }
    }
}

fn http_client() -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| format!("HTTP client error: {}", e))
}

/// System prompt first, then prior turns oldest-first, then the new message.
fn build_messages(message: &str, history: &[ConversationMessage]) -> Vec<serde_json::Value> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(serde_json::json!({"role": "system", "content": SYSTEM_PROMPT}));
    for turn in history {
        messages.push(serde_json::json!({"role": &turn.role, "content": &turn.content}));
    }
    messages.push(serde_json::json!({"role": "user", "content": message}));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(provider: &str) -> Config {
        Config {
            shared_secret: "secret".to_string(),
            port: 8088,
            sqlite_path: ":memory:".to_string(),
            llm_provider: provider.to_string(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2".to_string(),
            bot_heartbeat_default_seconds: 30,
            bot_runner_max_bots: 5,
        }
    }

    #[test]
    fn test_build_messages_order() {
        let history = vec![
            ConversationMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            },
            ConversationMessage {
                role: "assistant".to_string(),
                content: "hello".to_string(),
            },
        ];
        let messages = build_messages("what's next?", &history);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], SYSTEM_PROMPT);
        assert_eq!(messages[1]["content"], "hi");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["role"], "user");
        assert_eq!(messages[3]["content"], "what's next?");
    }

    #[tokio::test]
    async fn test_unknown_provider_soft_fails() {
        let service = AiService::new(&test_config("anthropic"));
        let reply = service.generate("hello", &[]).await;
        assert!(reply.contains("Unsupported LLM_PROVIDER 'anthropic'"));
    }

    #[tokio::test]
    async fn test_openai_without_key_soft_fails() {
        let service = AiService::new(&test_config("openai"));
        let reply = service.generate("hello", &[]).await;
        assert_eq!(reply, "OPENAI_API_KEY not configured.");
    }
}
