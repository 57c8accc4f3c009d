//! Debate orchestration logic.
//!
//! Drives the turn-taking state machine: an exchange phase of alternating
//! rounds, an optional closing phase in which each participant states a final
//! position, and the end conditions that move between them.

use std::time::Duration;

use tracing::{info, warn};

use crate::completion::{AGREEMENT_TOKEN, contains_agreement_marker, normalize};
use crate::cost::CostModel;
use crate::error::DebateError;
use crate::participant::Participant;
use crate::prompt::{DEFAULT_CLOSING_PROMPT, render_closing_prompt};
use crate::provider::{HistoryMessage, ReplyProvider};
use crate::transcript::{Transcript, Turn};

/// Failed replies a participant may produce before the run is aborted.
pub const MAX_ERRORS: u32 = 3;

/// Configuration for running a debate.
#[derive(Debug, Clone)]
pub struct DebateConfig {
    /// The topic being debated.
    pub topic: String,
    /// Rounds that must complete before an agreement marker is honored.
    pub min_turns: u32,
    /// Upper bound on exchange rounds.
    pub max_turns: u32,
    /// Pause after each reply that does not end the exchange.
    pub inter_call_delay: Duration,
    /// Closing prompt template with an `{example_conclusion}` placeholder.
    pub closing_template: String,
}

impl DebateConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            min_turns: 3,
            max_turns: 5,
            inter_call_delay: Duration::from_secs(2),
            closing_template: DEFAULT_CLOSING_PROMPT.to_string(),
        }
    }

    pub fn with_turns(mut self, min_turns: u32, max_turns: u32) -> Self {
        self.min_turns = min_turns;
        self.max_turns = max_turns;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.inter_call_delay = delay;
        self
    }

    pub fn with_closing_template(mut self, template: impl Into<String>) -> Self {
        self.closing_template = template.into();
        self
    }
}

/// Where the run currently is. Never moves back to `Exchange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Exchange,
    Closing,
    Done,
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebateEnd {
    /// A participant signalled agreement and the closing phase ran to completion.
    Agreement,
    /// `max_turns` rounds were exchanged without an honored agreement.
    MaxTurns,
    /// The participant hit the error threshold; no further turns were taken.
    ErrorsExhausted(Participant),
}

/// Mutable state of a single run, owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct DebateState {
    pub transcript: Transcript,
    pub turn_index: u32,
    error_counts: [u32; 2],
    pub phase: Phase,
    /// Transcript index of the first closing-phase turn.
    pub closing_start: Option<usize>,
}

impl DebateState {
    pub fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            turn_index: 0,
            error_counts: [0; 2],
            phase: Phase::Exchange,
            closing_start: None,
        }
    }

    pub fn error_count(&self, participant: Participant) -> u32 {
        self.error_counts[participant.index()]
    }

    /// Count a failed reply and return the new total for that participant.
    fn record_error(&mut self, participant: Participant) -> u32 {
        let count = &mut self.error_counts[participant.index()];
        *count += 1;
        *count
    }

    fn is_exhausted(&self, participant: Participant) -> bool {
        self.error_count(participant) >= MAX_ERRORS
    }
}

impl Default for DebateState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct DebateOutcome {
    pub transcript: Transcript,
    pub end: DebateEnd,
    /// Transcript index where closing statements begin, if the closing phase started.
    pub closing_start: Option<usize>,
}

impl DebateOutcome {
    pub fn exchange_turns(&self) -> &[Turn] {
        let end = self.closing_start.unwrap_or(self.transcript.len());
        &self.transcript.turns()[..end]
    }

    pub fn closing_turns(&self) -> &[Turn] {
        match self.closing_start {
            Some(start) => &self.transcript.turns()[start..],
            None => &[],
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.transcript.total_cost()
    }
}

/// Callback for debate events.
pub type DebateCallback = Box<dyn Fn(DebateEvent) + Send + Sync>;

/// Events emitted during a debate.
#[derive(Debug, Clone)]
pub enum DebateEvent {
    /// The run is starting.
    DebateStart { topic: String },
    /// A participant is about to be asked for a reply.
    SpeakerStart { speaker: Participant, closing: bool },
    /// A reply (or error placeholder) was appended to the transcript.
    TurnRecorded {
        speaker: Participant,
        content: String,
        cost: f64,
        closing: bool,
    },
    /// A provider call failed.
    ProviderFailed {
        speaker: Participant,
        attempt: u32,
        max: u32,
        error: String,
    },
    /// Agreement was honored; closing statements follow.
    ClosingStart,
    /// The run has finished.
    DebateEnd { end: DebateEnd, total_cost: f64 },
}

/// What a single recorded turn means for the exchange.
enum TurnOutcome {
    Continue,
    Agreement,
    Exhausted(Participant),
}

/// Orchestrates the debate between the two participants.
pub struct DebateOrchestrator {
    config: DebateConfig,
    /// Indexed by `Participant::index`.
    providers: Vec<Box<dyn ReplyProvider>>,
    cost_model: CostModel,
    state: DebateState,
    callback: Option<DebateCallback>,
}

impl DebateOrchestrator {
    /// Create a new orchestrator. Exactly one provider per participant is required.
    pub fn new(
        config: DebateConfig,
        providers: Vec<Box<dyn ReplyProvider>>,
        cost_model: CostModel,
    ) -> Result<Self, DebateError> {
        let expected = Participant::ALL.len();
        if providers.len() != expected {
            return Err(DebateError::InvalidParticipantCount {
                expected,
                actual: providers.len(),
            });
        }

        let mut slots: Vec<Option<Box<dyn ReplyProvider>>> =
            (0..expected).map(|_| None).collect();
        for provider in providers {
            let participant = provider.participant();
            let slot = &mut slots[participant.index()];
            if slot.is_some() {
                return Err(DebateError::DuplicateParticipant(participant));
            }
            *slot = Some(provider);
        }
        // Two distinct participants out of two fill every slot.
        let providers = slots.into_iter().flatten().collect();

        Ok(Self {
            config,
            providers,
            cost_model,
            state: DebateState::new(),
            callback: None,
        })
    }

    /// Set a callback for debate events.
    pub fn with_callback(mut self, callback: DebateCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Run the full debate.
    ///
    /// Provider failures never surface here; only configuration faults such as a
    /// participant without pricing do.
    pub async fn run(&mut self) -> Result<DebateOutcome, DebateError> {
        self.state = DebateState::new();
        self.emit_event(DebateEvent::DebateStart {
            topic: self.config.topic.clone(),
        });
        info!(
            topic = %self.config.topic,
            min_turns = self.config.min_turns,
            max_turns = self.config.max_turns,
            "debate starting"
        );

        let end = match self.run_exchange().await? {
            TurnOutcome::Agreement => {
                self.state.phase = Phase::Closing;
                self.state.closing_start = Some(self.state.transcript.len());
                self.emit_event(DebateEvent::ClosingStart);
                self.run_closing().await?
            }
            TurnOutcome::Exhausted(p) => DebateEnd::ErrorsExhausted(p),
            TurnOutcome::Continue => DebateEnd::MaxTurns,
        };
        self.state.phase = Phase::Done;

        let total_cost = self.state.transcript.total_cost();
        if let DebateEnd::ErrorsExhausted(p) = end {
            warn!(participant = %p, errors = MAX_ERRORS, "error limit reached, debate aborted");
        }
        info!(?end, turns = self.state.transcript.len(), total_cost, "debate finished");
        self.emit_event(DebateEvent::DebateEnd { end, total_cost });

        Ok(DebateOutcome {
            transcript: self.state.transcript.clone(),
            end,
            closing_start: self.state.closing_start,
        })
    }

    /// Alternate rounds until agreement, error exhaustion, or `max_turns`.
    ///
    /// Returns `Continue` when the round limit was reached.
    async fn run_exchange(&mut self) -> Result<TurnOutcome, DebateError> {
        while self.state.turn_index < self.config.max_turns {
            for speaker in Participant::ALL {
                let history: Vec<HistoryMessage> =
                    self.state.transcript.iter().map(HistoryMessage::from).collect();
                let turn = self.take_turn(speaker, &history, false).await?;

                // A placeholder never carries the marker, so checking exhaustion first
                // does not change which condition fires.
                if self.state.is_exhausted(speaker) {
                    return Ok(TurnOutcome::Exhausted(speaker));
                }

                if contains_agreement_marker(&turn.content, AGREEMENT_TOKEN) {
                    if self.state.turn_index + 1 >= self.config.min_turns {
                        info!(
                            participant = %speaker,
                            round = self.state.turn_index,
                            "agreement signalled, moving to closing statements"
                        );
                        return Ok(TurnOutcome::Agreement);
                    }
                    info!(
                        participant = %speaker,
                        round = self.state.turn_index,
                        min_turns = self.config.min_turns,
                        "agreement signalled before minimum rounds, ignoring"
                    );
                }

                self.pause().await;
            }
            self.state.turn_index += 1;
        }

        Ok(TurnOutcome::Continue)
    }

    /// Ask each participant, in isolation, for a one-sentence final position.
    async fn run_closing(&mut self) -> Result<DebateEnd, DebateError> {
        let prompt = render_closing_prompt(&self.config.closing_template, &self.config.topic);

        for speaker in Participant::ALL {
            let history = [HistoryMessage::moderator(prompt.clone())];
            self.take_turn(speaker, &history, true).await?;

            if self.state.is_exhausted(speaker) {
                return Ok(DebateEnd::ErrorsExhausted(speaker));
            }
        }

        Ok(DebateEnd::Agreement)
    }

    /// Ask one provider for a reply and append the resulting turn.
    ///
    /// A failed call is recorded as a zero-cost apology that counts against the
    /// participant's error budget.
    async fn take_turn(
        &mut self,
        speaker: Participant,
        history: &[HistoryMessage],
        closing: bool,
    ) -> Result<Turn, DebateError> {
        self.emit_event(DebateEvent::SpeakerStart { speaker, closing });

        let provider = &self.providers[speaker.index()];
        let turn = match provider.generate(history, &self.config.topic).await {
            Ok(reply) => {
                let cost =
                    self.cost_model
                        .cost(reply.prompt_tokens, reply.completion_tokens, speaker)?;
                Turn::new(speaker, normalize(&reply.content), cost)
            }
            Err(err) => {
                let attempt = self.state.record_error(speaker);
                warn!(
                    participant = %speaker,
                    attempt,
                    max = MAX_ERRORS,
                    error = %err,
                    "provider call failed"
                );
                self.emit_event(DebateEvent::ProviderFailed {
                    speaker,
                    attempt,
                    max: MAX_ERRORS,
                    error: err.to_string(),
                });
                Turn::new(speaker, error_placeholder(attempt), 0.0)
            }
        };

        info!(
            participant = %speaker,
            round = self.state.turn_index,
            closing,
            cost = turn.cost,
            "turn recorded"
        );
        self.emit_event(DebateEvent::TurnRecorded {
            speaker,
            content: turn.content.clone(),
            cost: turn.cost,
            closing,
        });
        self.state.transcript.push(turn.clone());

        Ok(turn)
    }

    /// Courtesy delay between provider calls.
    async fn pause(&self) {
        if !self.config.inter_call_delay.is_zero() {
            tokio::time::sleep(self.config.inter_call_delay).await;
        }
    }

    /// Emit an event if a callback is registered.
    fn emit_event(&self, event: DebateEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }

    /// Current run state.
    pub fn state(&self) -> &DebateState {
        &self.state
    }

    /// Get the full transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.state.transcript
    }
}

/// Stand-in reply for a failed provider call.
pub fn error_placeholder(attempt: u32) -> String {
    format!("I'm sorry, an error occurred (error #{attempt}/{MAX_ERRORS}).")
}
