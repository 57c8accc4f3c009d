//! OpenAI-compatible chat completion provider.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::debug;

use crate::error::ProviderError;
use crate::participant::Participant;
use crate::prompt::render_system_prompt;
use crate::provider::{
    HistoryMessage, ProjectedRole, ProviderSettings, Reply, ReplyProvider, project_history,
    sanitize_response,
};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Speaks for one participant through an OpenAI-compatible API.
///
/// Calls to the hosted OpenAI API need a key. Other base URLs, such as local
/// OpenAI-compatible servers, are called even when the key is empty.
pub struct OpenAiProvider {
    participant: Participant,
    client: Client<OpenAIConfig>,
    settings: ProviderSettings,
    missing_key: bool,
}

impl OpenAiProvider {
    pub fn new(
        participant: Participant,
        api_base: &str,
        api_key: &str,
        settings: ProviderSettings,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        let missing_key =
            api_key.trim().is_empty() && api_base.trim_end_matches('/') == DEFAULT_API_BASE;

        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        Ok(Self {
            participant,
            client: Client::with_config(config).with_http_client(http_client),
            settings,
            missing_key,
        })
    }

    /// System prompt followed by the history as seen by this participant.
    fn build_messages(
        &self,
        history: &[HistoryMessage],
        topic: &str,
    ) -> Vec<ChatCompletionRequestMessage> {
        let system_prompt = render_system_prompt(&self.settings.system_template, topic);
        let mut messages = vec![ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage {
                content: system_prompt.into(),
                name: None,
            },
        )];

        for msg in project_history(self.participant, history) {
            messages.push(match msg.role {
                ProjectedRole::Assistant => {
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(msg.content.into()),
                        name: None,
                        tool_calls: None,
                        refusal: None,
                        audio: None,
                        function_call: None,
                    })
                }
                ProjectedRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: msg.content.into(),
                        name: None,
                    })
                }
            });
        }

        messages
    }
}

#[async_trait]
impl ReplyProvider for OpenAiProvider {
    fn participant(&self) -> Participant {
        self.participant
    }

    async fn generate(
        &self,
        history: &[HistoryMessage],
        topic: &str,
    ) -> Result<Reply, ProviderError> {
        if self.missing_key {
            return Err(ProviderError::MissingApiKey("OPENAI_API_KEY"));
        }

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.settings.model)
            .max_completion_tokens(self.settings.max_tokens)
            .temperature(self.settings.temperature)
            .messages(self.build_messages(history, topic))
            .build()?;

        debug!(
            participant = %self.participant,
            model = %self.settings.model,
            history_len = history.len(),
            "requesting chat completion"
        );

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| ProviderError::MalformedResponse("no message content".to_string()))?;

        let usage = response
            .usage
            .ok_or_else(|| ProviderError::MalformedResponse("no token usage".to_string()))?;

        Ok(Reply {
            content: sanitize_response(&content),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::DEFAULT_SYSTEM_PROMPT;
    use crate::transcript::Turn;

    fn provider_with(api_base: &str, api_key: &str) -> OpenAiProvider {
        OpenAiProvider::new(
            Participant::ChatGpt,
            api_base,
            api_key,
            ProviderSettings {
                model: "gpt-4".to_string(),
                max_tokens: 800,
                temperature: 0.7,
                system_template: DEFAULT_SYSTEM_PROMPT.to_string(),
            },
        )
        .unwrap()
    }

    fn provider() -> OpenAiProvider {
        provider_with(DEFAULT_API_BASE, "test-key")
    }

    #[test]
    fn test_messages_start_with_system_prompt() {
        let messages = provider().build_messages(&[], "Tabs or spaces?");
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
    }

    #[test]
    fn test_messages_follow_projection() {
        let history = vec![
            HistoryMessage::from(&Turn::new(Participant::ChatGpt, "Mine.", 0.0)),
            HistoryMessage::from(&Turn::new(Participant::Claude, "Theirs.", 0.0)),
        ];
        let messages = provider().build_messages(&history, "Tabs or spaces?");
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[1], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::User(_)));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let provider = provider_with("https://api.openai.com/v1/", "");
        let err = provider.generate(&[], "Topic").await.unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey("OPENAI_API_KEY")));
    }

    #[test]
    fn test_custom_base_does_not_require_key() {
        assert!(!provider_with("http://localhost:11434/v1", "").missing_key);
        assert!(!provider().missing_key);
    }
}
