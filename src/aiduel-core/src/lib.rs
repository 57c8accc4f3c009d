//! AIDuel Core Library
//!
//! Runs a scripted debate between two chat models, tracks what each reply
//! cost, and writes the transcript to JSON and HTML reports.

pub mod anthropic;
pub mod completion;
pub mod config;
pub mod cost;
pub mod error;
pub mod export;
pub mod openai;
pub mod orchestrator;
pub mod participant;
pub mod prompt;
pub mod provider;
pub mod transcript;

pub use anthropic::AnthropicProvider;
pub use completion::AGREEMENT_TOKEN;
pub use config::{Config, default_config};
pub use cost::{CostModel, Pricing};
pub use error::{DebateError, ExportError, ProviderError};
pub use export::{ExportPaths, TranscriptExporter};
pub use openai::OpenAiProvider;
pub use orchestrator::{
    DebateConfig, DebateEnd, DebateEvent, DebateOrchestrator, DebateOutcome, Phase,
};
pub use participant::Participant;
pub use provider::{HistoryMessage, Reply, ReplyProvider};
pub use transcript::{Transcript, Turn};
