//! Anthropic Messages API provider.
//!
//! The projected history is folded into a single user message using
//! `Human:` / `Assistant:` labels, so the request never has to satisfy the
//! API's strict role alternation.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;
use crate::participant::Participant;
use crate::prompt::render_system_prompt;
use crate::provider::{
    HistoryMessage, ProjectedMessage, ProjectedRole, ProviderSettings, Reply, ReplyProvider,
    project_history, sanitize_response,
};

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Speaks for one participant through the Anthropic Messages API.
pub struct AnthropicProvider {
    participant: Participant,
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    settings: ProviderSettings,
}

impl AnthropicProvider {
    pub fn new(
        participant: Participant,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        settings: ProviderSettings,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            participant,
            http,
            api_url: api_url.into(),
            api_key: api_key.into(),
            settings,
        })
    }
}

#[async_trait]
impl ReplyProvider for AnthropicProvider {
    fn participant(&self) -> Participant {
        self.participant
    }

    async fn generate(
        &self,
        history: &[HistoryMessage],
        topic: &str,
    ) -> Result<Reply, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey("ANTHROPIC_API_KEY"));
        }

        let body = serde_json::json!({
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "system": render_system_prompt(&self.settings.system_template, topic),
            "messages": [{
                "role": "user",
                "content": flatten_history(&project_history(self.participant, history)),
            }]
        });

        debug!(
            participant = %self.participant,
            model = %self.settings.model,
            history_len = history.len(),
            "requesting message"
        );

        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = response.json().await?;
        let mut reply = parse_reply(&value)?;
        reply.content = sanitize_response(&reply.content);
        Ok(reply)
    }
}

/// Render a projected history as a labelled dialogue ending on the assistant's cue.
pub(crate) fn flatten_history(messages: &[ProjectedMessage]) -> String {
    let mut prompt = String::new();
    for msg in messages {
        let label = match msg.role {
            ProjectedRole::Assistant => "Assistant",
            ProjectedRole::User => "Human",
        };
        prompt.push_str(label);
        prompt.push_str(": ");
        prompt.push_str(&msg.content);
        prompt.push_str("\n\n");
    }
    prompt.push_str("Assistant:");
    prompt
}

/// Extract text and token usage from a Messages API response body.
///
/// Expected shape:
/// `{ "content": [{ "type": "text", "text": "..." }], "usage": { "input_tokens": N, "output_tokens": M } }`
pub(crate) fn parse_reply(value: &Value) -> Result<Reply, ProviderError> {
    let content = value
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| {
            blocks
                .iter()
                .find_map(|b| b.get("text").and_then(Value::as_str))
        })
        .ok_or_else(|| ProviderError::MalformedResponse("no text content block".to_string()))?;

    let usage = value
        .get("usage")
        .ok_or_else(|| ProviderError::MalformedResponse("no token usage".to_string()))?;
    let tokens = |field: &str| {
        usage
            .get(field)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                ProviderError::MalformedResponse(format!("missing or invalid usage.{field}"))
            })
    };

    Ok(Reply {
        content: content.to_string(),
        prompt_tokens: tokens("input_tokens")?,
        completion_tokens: tokens("output_tokens")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::DEFAULT_SYSTEM_PROMPT;

    #[test]
    fn test_flatten_history_labels_roles() {
        let messages = vec![
            ProjectedMessage {
                role: ProjectedRole::User,
                content: "Opening.".to_string(),
            },
            ProjectedMessage {
                role: ProjectedRole::Assistant,
                content: "Counter.".to_string(),
            },
        ];
        assert_eq!(
            flatten_history(&messages),
            "Human: Opening.\n\nAssistant: Counter.\n\nAssistant:"
        );
    }

    #[test]
    fn test_flatten_empty_history() {
        assert_eq!(flatten_history(&[]), "Assistant:");
    }

    #[test]
    fn test_parse_reply() {
        let value = serde_json::json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "text", "text": "Agreed." }],
            "usage": { "input_tokens": 120, "output_tokens": 40 }
        });
        let reply = parse_reply(&value).unwrap();
        assert_eq!(reply.content, "Agreed.");
        assert_eq!(reply.prompt_tokens, 120);
        assert_eq!(reply.completion_tokens, 40);
    }

    #[test]
    fn test_parse_reply_missing_content() {
        let value = serde_json::json!({ "content": [], "usage": { "input_tokens": 1, "output_tokens": 1 } });
        assert!(matches!(
            parse_reply(&value),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_reply_missing_usage() {
        let value = serde_json::json!({ "content": [{ "type": "text", "text": "Hi." }] });
        assert!(matches!(
            parse_reply(&value),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_reply_rejects_oversized_token_count() {
        let value = serde_json::json!({
            "content": [{ "type": "text", "text": "Hi." }],
            "usage": { "input_tokens": 4_294_967_301u64, "output_tokens": 1 }
        });
        assert!(matches!(
            parse_reply(&value),
            Err(ProviderError::MalformedResponse(msg)) if msg.contains("input_tokens")
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let provider = AnthropicProvider::new(
            Participant::Claude,
            DEFAULT_API_URL,
            "",
            ProviderSettings {
                model: "claude-3-5-sonnet-20241022".to_string(),
                max_tokens: 800,
                temperature: 0.7,
                system_template: DEFAULT_SYSTEM_PROMPT.to_string(),
            },
        )
        .unwrap();

        let err = provider.generate(&[], "Topic").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey("ANTHROPIC_API_KEY")));
    }
}
