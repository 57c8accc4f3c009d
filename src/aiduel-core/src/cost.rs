//! Per-participant token pricing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::DebateError;
use crate::participant::Participant;

/// Prices in USD per 1000 tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

impl Pricing {
    pub fn new(prompt_per_1k: f64, completion_per_1k: f64) -> Self {
        Self {
            prompt_per_1k,
            completion_per_1k,
        }
    }
}

/// Maps token usage to money for each participant.
#[derive(Debug, Clone, Default)]
pub struct CostModel {
    pricing: HashMap<Participant, Pricing>,
}

impl CostModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pricing(mut self, participant: Participant, pricing: Pricing) -> Self {
        self.pricing.insert(participant, pricing);
        self
    }

    pub fn pricing(&self, participant: Participant) -> Option<&Pricing> {
        self.pricing.get(&participant)
    }

    /// Cost of one reply.
    ///
    /// A participant without a pricing entry is a configuration fault and is
    /// reported instead of being billed as free.
    pub fn cost(
        &self,
        prompt_tokens: u32,
        completion_tokens: u32,
        participant: Participant,
    ) -> Result<f64, DebateError> {
        let pricing = self
            .pricing
            .get(&participant)
            .ok_or(DebateError::UnknownParticipant(participant))?;

        Ok((prompt_tokens as f64 * pricing.prompt_per_1k
            + completion_tokens as f64 * pricing.completion_per_1k)
            / 1000.0)
    }
}
