//! Reply providers: the seam between the debate loop and external chat APIs.
//!
//! The loop only ever sees [`ReplyProvider`]. Each implementation re-projects
//! the shared history from its own participant's point of view with
//! [`project_history`] and translates it into its API's message format.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::participant::Participant;
use crate::transcript::Turn;

/// Author of a history message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Participant(Participant),
    /// Instructions injected by the debate itself, such as the closing prompt.
    Moderator,
}

/// One message of the history handed to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryMessage {
    pub speaker: Speaker,
    pub content: String,
}

impl HistoryMessage {
    pub fn moderator(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Moderator,
            content: content.into(),
        }
    }
}

impl From<&Turn> for HistoryMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            speaker: Speaker::Participant(turn.speaker),
            content: turn.content.clone(),
        }
    }
}

/// Conversational role from the calling participant's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectedRole {
    /// Written by the participant being asked.
    Assistant,
    /// Written by anyone else, including the moderator.
    User,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedMessage {
    pub role: ProjectedRole,
    pub content: String,
}

/// Re-project a shared history for `me`: my messages become the assistant
/// voice, everything else becomes the user voice.
pub fn project_history(me: Participant, history: &[HistoryMessage]) -> Vec<ProjectedMessage> {
    history
        .iter()
        .map(|msg| ProjectedMessage {
            role: match msg.speaker {
                Speaker::Participant(p) if p == me => ProjectedRole::Assistant,
                _ => ProjectedRole::User,
            },
            content: msg.content.clone(),
        })
        .collect()
}

/// A successful reply and its token usage.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Produces replies for one participant.
#[async_trait]
pub trait ReplyProvider: Send + Sync {
    /// The participant this provider speaks for.
    fn participant(&self) -> Participant;

    /// Generate the next reply given the history so far.
    async fn generate(
        &self,
        history: &[HistoryMessage],
        topic: &str,
    ) -> Result<Reply, ProviderError>;
}

/// Request settings shared by every provider variant.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// System prompt template with `{topic}` and `{agreement_token}` placeholders.
    pub system_template: String,
}

/// Sanitize AI response by stripping reasoning tokens and XML-like tags.
///
/// Removes patterns like <thinking>...</thinking>, <reflection>...</reflection>, etc.
pub(crate) fn sanitize_response(response: &str) -> String {
    let tags_to_strip = [
        "thinking",
        "think",
        "reflection",
        "reflect",
        "internal",
        "reasoning",
        "thought",
        "scratchpad",
        "analysis",
    ];

    let mut result = response.to_string();

    for tag in &tags_to_strip {
        let pattern = format!(r"(?is)<{tag}[^>]*>.*?</{tag}>", tag = tag);
        if let Ok(re) = regex::Regex::new(&pattern) {
            result = re.replace_all(&result, "").to_string();
        }
    }

    // Orphaned opening/closing tags, only for the names above
    let orphan_pattern = format!(r"(?i)</?(?:{})\b[^>]*>", tags_to_strip.join("|"));
    if let Ok(orphan_re) = regex::Regex::new(&orphan_pattern) {
        result = orphan_re.replace_all(&result, "").to_string();
    }

    // Markdown emphasis
    result = result.replace("**", "");

    if let Ok(ws_re) = regex::Regex::new(r"[ \t]+") {
        result = ws_re.replace_all(&result, " ").to_string();
    }

    result.trim().to_string()
}
