//! The two fixed debaters.
//!
//! Each participant maps to exactly one reply provider and one error counter
//! for the lifetime of a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two debaters, in speaking order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Participant {
    /// Speaks first in every round. Backed by an OpenAI chat model.
    #[serde(rename = "ChatGPT")]
    ChatGpt,
    /// Speaks second in every round. Backed by an Anthropic model.
    #[serde(rename = "Claude")]
    Claude,
}

impl Participant {
    /// Both participants in the fixed order they speak within a round.
    pub const ALL: [Participant; 2] = [Participant::ChatGpt, Participant::Claude];

    pub fn display_name(&self) -> &'static str {
        match self {
            Participant::ChatGpt => "ChatGPT",
            Participant::Claude => "Claude",
        }
    }

    /// CSS class used by the HTML report.
    pub fn css_class(&self) -> &'static str {
        match self {
            Participant::ChatGpt => "chatgpt",
            Participant::Claude => "claude",
        }
    }

    /// Position in the speaking order.
    pub fn index(&self) -> usize {
        match self {
            Participant::ChatGpt => 0,
            Participant::Claude => 1,
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
