//! Turns and the append-only transcript.

use serde::{Deserialize, Serialize};

use crate::participant::Participant;

/// A single recorded reply. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Participant,
    pub content: String,
    /// Monetary cost of producing this reply, in USD. Zero for error placeholders.
    pub cost: f64,
}

impl Turn {
    pub fn new(speaker: Participant, content: impl Into<String>, cost: f64) -> Self {
        Self {
            speaker,
            content: content.into(),
            cost: cost.max(0.0),
        }
    }
}

/// Ordered conversation. Insertion order is conversation order is display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Sum of every turn's cost.
    pub fn total_cost(&self) -> f64 {
        self.turns.iter().map(|t| t.cost).sum()
    }

    /// Index of the first turn whose content contains `marker`.
    pub fn first_marker_index(&self, marker: &str) -> Option<usize> {
        self.turns.iter().position(|t| t.content.contains(marker))
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

impl From<Vec<Turn>> for Transcript {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_cost_includes_zero_cost_placeholders() {
        let transcript = Transcript::from(vec![
            Turn::new(Participant::ChatGpt, "One.", 0.0125),
            Turn::new(Participant::Claude, "I'm sorry, an error occurred (error #1/3).", 0.0),
            Turn::new(Participant::ChatGpt, "Two.", 0.0375),
        ]);
        assert!((transcript.total_cost() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_empty_transcript_costs_nothing() {
        assert_eq!(Transcript::new().total_cost(), 0.0);
    }

    #[test]
    fn test_negative_cost_is_clamped() {
        let turn = Turn::new(Participant::Claude, "x.", -1.0);
        assert_eq!(turn.cost, 0.0);
    }

    #[test]
    fn test_first_marker_index() {
        let transcript = Transcript::from(vec![
            Turn::new(Participant::ChatGpt, "No.", 0.0),
            Turn::new(Participant::Claude, "Fine ##END##", 0.0),
            Turn::new(Participant::ChatGpt, "Also ##END##", 0.0),
        ]);
        assert_eq!(transcript.first_marker_index("##END##"), Some(1));
        assert_eq!(transcript.first_marker_index("##NOPE##"), None);
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let transcript = Transcript::from(vec![Turn::new(Participant::ChatGpt, "Hi.", 0.5)]);
        let value = serde_json::to_value(&transcript).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{ "speaker": "ChatGPT", "content": "Hi.", "cost": 0.5 }])
        );
    }
}
