//! Configuration module for loading TOML config files.
//!
//! Every table is optional; missing keys fall back to [`default_config`].

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::anthropic::DEFAULT_API_URL;
use crate::cost::{CostModel, Pricing};
use crate::error::DebateError;
use crate::openai::DEFAULT_API_BASE;
use crate::participant::Participant;
use crate::prompt::{DEFAULT_CLOSING_PROMPT, DEFAULT_SYSTEM_PROMPT};
use crate::provider::ProviderSettings;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debate: DebateSection,
    pub output: OutputConfig,
    pub openai: ModelConfig,
    pub anthropic: ModelConfig,
    pub prompts: PromptsConfig,
}

/// Turn limits and pacing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DebateSection {
    pub min_turns: u32,
    pub max_turns: u32,
    pub inter_call_delay_ms: u64,
}

impl Default for DebateSection {
    fn default() -> Self {
        Self {
            min_turns: 3,
            max_turns: 5,
            inter_call_delay_ms: 2000,
        }
    }
}

/// Where reports are written.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub base_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("debate_outputs"),
        }
    }
}

/// Model, endpoint and pricing for one participant.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model: String,
    /// API base URL (OpenAI) or full messages endpoint (Anthropic). Empty means the vendor default.
    #[serde(alias = "api_base", alias = "api_url")]
    pub endpoint: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// USD per 1000 prompt tokens.
    pub price_prompt_per_1k: Option<f64>,
    /// USD per 1000 completion tokens.
    pub price_completion_per_1k: Option<f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            endpoint: String::new(),
            max_tokens: 800,
            temperature: 0.7,
            price_prompt_per_1k: None,
            price_completion_per_1k: None,
        }
    }
}

impl ModelConfig {
    fn pricing(&self) -> Option<Pricing> {
        Some(Pricing::new(
            self.price_prompt_per_1k?,
            self.price_completion_per_1k?,
        ))
    }
}

/// Prompt templates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub system: String,
    pub closing: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            closing: DEFAULT_CLOSING_PROMPT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, filling gaps with defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load configuration from string content.
    pub fn from_str(content: &str) -> Result<Self, DebateError> {
        let parsed: Config = toml::from_str(content)
            .map_err(|e| DebateError::ConfigError(format!("Failed to parse config: {}", e)))?;
        Ok(parsed.with_defaults())
    }

    /// Fill vendor-specific blanks (model names, endpoints, prices).
    fn with_defaults(mut self) -> Self {
        let defaults = default_config();
        fill_model(&mut self.openai, &defaults.openai);
        fill_model(&mut self.anthropic, &defaults.anthropic);
        self
    }

    /// Get the model section for a participant.
    pub fn model(&self, participant: Participant) -> &ModelConfig {
        match participant {
            Participant::ChatGpt => &self.openai,
            Participant::Claude => &self.anthropic,
        }
    }

    /// Provider request settings for a participant.
    pub fn provider_settings(&self, participant: Participant) -> ProviderSettings {
        let model = self.model(participant);
        ProviderSettings {
            model: model.model.clone(),
            max_tokens: model.max_tokens,
            temperature: model.temperature,
            system_template: self.prompts.system.clone(),
        }
    }

    /// Pricing table built from both model sections.
    ///
    /// A participant without a complete price pair gets no entry. [`Config::validate`]
    /// rejects such configs before a run starts.
    pub fn cost_model(&self) -> CostModel {
        Participant::ALL
            .iter()
            .fold(CostModel::new(), |model, &p| match self.model(p).pricing() {
                Some(pricing) => model.with_pricing(p, pricing),
                None => model,
            })
    }

    pub fn inter_call_delay(&self) -> Duration {
        Duration::from_millis(self.debate.inter_call_delay_ms)
    }

    pub fn validate(&self) -> Result<(), DebateError> {
        if self.debate.max_turns == 0 {
            return Err(DebateError::ConfigError(
                "max_turns must be at least 1".to_string(),
            ));
        }
        for p in Participant::ALL {
            if self.model(p).model.trim().is_empty() {
                return Err(DebateError::ConfigError(format!(
                    "No model configured for {}",
                    p
                )));
            }
            let model = self.model(p);
            if model.price_prompt_per_1k.is_some() != model.price_completion_per_1k.is_some() {
                return Err(DebateError::ConfigError(format!(
                    "Pricing for {} needs both price_prompt_per_1k and price_completion_per_1k",
                    p
                )));
            }
        }
        Ok(())
    }
}

fn fill_model(target: &mut ModelConfig, defaults: &ModelConfig) {
    if target.model.is_empty() {
        target.model = defaults.model.clone();
    }
    if target.endpoint.is_empty() {
        target.endpoint = defaults.endpoint.clone();
    }
    if target.price_prompt_per_1k.is_none() && target.price_completion_per_1k.is_none() {
        target.price_prompt_per_1k = defaults.price_prompt_per_1k;
        target.price_completion_per_1k = defaults.price_completion_per_1k;
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config {
        debate: DebateSection::default(),
        output: OutputConfig::default(),
        openai: ModelConfig {
            model: "gpt-4".to_string(),
            endpoint: DEFAULT_API_BASE.to_string(),
            price_prompt_per_1k: Some(0.03),
            price_completion_per_1k: Some(0.06),
            ..ModelConfig::default()
        },
        anthropic: ModelConfig {
            model: "claude-3-5-sonnet-20241022".to_string(),
            endpoint: DEFAULT_API_URL.to_string(),
            price_prompt_per_1k: Some(0.025),
            price_completion_per_1k: Some(0.055),
            ..ModelConfig::default()
        },
        prompts: PromptsConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.debate.min_turns, 3);
        assert_eq!(config.debate.max_turns, 5);
        assert_eq!(config.inter_call_delay(), Duration::from_secs(2));
        assert_eq!(config.output.base_dir, PathBuf::from("debate_outputs"));
        assert_eq!(config.openai.model, "gpt-4");
        assert_eq!(config.anthropic.endpoint, DEFAULT_API_URL);
        assert!(config.prompts.system.contains("{agreement_token}"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_str(
            r#"
            [debate]
            max_turns = 8

            [openai]
            model = "gpt-4o"
            price_prompt_per_1k = 0.005
            price_completion_per_1k = 0.015

            [output]
            base_dir = "reports"
            "#,
        )
        .unwrap();

        assert_eq!(config.debate.min_turns, 3);
        assert_eq!(config.debate.max_turns, 8);
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.openai.endpoint, DEFAULT_API_BASE);
        assert_eq!(config.output.base_dir, PathBuf::from("reports"));

        let costs = config.cost_model();
        let gpt = costs.cost(1000, 1000, Participant::ChatGpt).unwrap();
        assert!((gpt - 0.02).abs() < 1e-12);
        let claude = costs.cost(1000, 1000, Participant::Claude).unwrap();
        assert!((claude - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_half_specified_pricing_is_rejected() {
        let config = Config::from_str(
            r#"
            [anthropic]
            price_prompt_per_1k = 0.01
            "#,
        )
        .unwrap();
        assert!(config.cost_model().pricing(Participant::Claude).is_none());
        assert!(config.cost_model().pricing(Participant::ChatGpt).is_some());
        match config.validate() {
            Err(DebateError::ConfigError(msg)) => assert!(msg.contains("Claude")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_vendor_endpoint_key_names() {
        let config = Config::from_str(
            r#"
            [openai]
            api_base = "http://localhost:8080/v1"

            [anthropic]
            api_url = "http://proxy/v1/messages"
            "#,
        )
        .unwrap();
        assert_eq!(config.openai.endpoint, "http://localhost:8080/v1");
        assert_eq!(config.anthropic.endpoint, "http://proxy/v1/messages");
    }

    #[test]
    fn test_endpoint_key() {
        let config = Config::from_str("[openai]\nendpoint = \"http://localhost:11434/v1\"\n").unwrap();
        assert_eq!(config.openai.endpoint, "http://localhost:11434/v1");
        assert_eq!(config.anthropic.endpoint, DEFAULT_API_URL);
    }

    #[test]
    fn test_zero_max_turns_is_rejected() {
        let config = Config::from_str("[debate]\nmax_turns = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(DebateError::ConfigError(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_str("[debate\n"),
            Err(DebateError::ConfigError(_))
        ));
    }

    #[test]
    fn test_provider_settings() {
        let config = default_config();
        let settings = config.provider_settings(Participant::Claude);
        assert_eq!(settings.model, "claude-3-5-sonnet-20241022");
        assert_eq!(settings.max_tokens, 800);
        assert_eq!(settings.system_template, DEFAULT_SYSTEM_PROMPT);
    }
}
