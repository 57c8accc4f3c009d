//! AIDuel CLI - watch two chat models debate a topic
//!
//! Runs the debate, streams every turn to the console, and saves JSON and
//! HTML reports when it ends.

use aiduel_core::orchestrator::MAX_ERRORS;
use aiduel_core::{
    AnthropicProvider, Config, DebateConfig, DebateEnd, DebateEvent, DebateOrchestrator,
    OpenAiProvider, Participant, ReplyProvider, TranscriptExporter, default_config,
};
use clap::Parser;
use colored::Colorize;
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "aiduel",
    version,
    about = "AI Debate Tool - ChatGPT and Claude debate a topic",
    long_about = "Runs a turn-based debate between an OpenAI model and an Anthropic model, \
                  then saves the transcript with per-turn costs as JSON and HTML."
)]
struct Cli {
    /// The topic to debate
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Rounds that must pass before an agreement can end the exchange
    #[arg(long, value_name = "ROUNDS")]
    min_turns: Option<u32>,

    /// Maximum number of exchange rounds
    #[arg(long, value_name = "ROUNDS")]
    max_turns: Option<u32>,

    /// Directory for the JSON and HTML reports
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Pause between provider calls, in milliseconds
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// OpenAI model name
    #[arg(long, value_name = "MODEL")]
    openai_model: Option<String>,

    /// Anthropic model name
    #[arg(long, value_name = "MODEL")]
    anthropic_model: Option<String>,
}

impl Cli {
    /// Apply command line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(min_turns) = self.min_turns {
            config.debate.min_turns = min_turns;
        }
        if let Some(max_turns) = self.max_turns {
            config.debate.max_turns = max_turns;
        }
        if let Some(dir) = &self.output_dir {
            config.output.base_dir = dir.clone();
        }
        if let Some(delay) = self.delay_ms {
            config.debate.inter_call_delay_ms = delay;
        }
        if let Some(model) = &self.openai_model {
            config.openai.model = model.clone();
        }
        if let Some(model) = &self.anthropic_model {
            config.anthropic.model = model.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => default_config(),
    };
    cli.apply(&mut config);
    config.validate()?;

    if config.debate.min_turns > config.debate.max_turns {
        eprintln!(
            "{}",
            format!(
                "Warning: min-turns ({}) exceeds max-turns ({}); an agreement can never end the debate early.",
                config.debate.min_turns, config.debate.max_turns
            )
            .yellow()
        );
    }

    // OpenAI-compatible base URL may be overridden from the environment
    let api_base = env::var("OPENAI_API_BASE")
        .or_else(|_| env::var("OPENAI_BASE_URL"))
        .unwrap_or_else(|_| config.openai.endpoint.clone());
    let openai_key = api_key("OPENAI_API_KEY");
    let anthropic_key = api_key("ANTHROPIC_API_KEY");

    let providers: Vec<Box<dyn ReplyProvider>> = vec![
        Box::new(OpenAiProvider::new(
            Participant::ChatGpt,
            &api_base,
            &openai_key,
            config.provider_settings(Participant::ChatGpt),
        )?),
        Box::new(AnthropicProvider::new(
            Participant::Claude,
            config.anthropic.endpoint.clone(),
            anthropic_key,
            config.provider_settings(Participant::Claude),
        )?),
    ];

    print_header(&cli.topic, &config);

    let debate_config = DebateConfig::new(&cli.topic)
        .with_turns(config.debate.min_turns, config.debate.max_turns)
        .with_delay(config.inter_call_delay())
        .with_closing_template(config.prompts.closing.clone());

    let mut orchestrator = DebateOrchestrator::new(debate_config, providers, config.cost_model())?
        .with_callback(create_console_callback());

    let outcome = orchestrator.run().await?;

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", format!("  {}", end_message(outcome.end)).bright_green().bold());
    println!(
        "  {} {}",
        "Total cost:".bold(),
        format!("${:.4}", outcome.total_cost()).bright_white()
    );
    println!("{}", "═".repeat(70).bright_blue());

    let exporter = TranscriptExporter::new(&config.output.base_dir);
    match exporter.export(&cli.topic, &outcome.transcript) {
        Ok(paths) => {
            println!();
            println!("{}", "Files saved:".bold());
            println!("  HTML: {}", paths.html.display());
            println!("  JSON: {}", paths.json.display());
        }
        Err(e) => {
            eprintln!();
            eprintln!("{} {}", "Could not save the transcript:".red().bold(), e);
            eprintln!(
                "  {} turns were recorded; total cost ${:.4}.",
                outcome.transcript.len(),
                outcome.total_cost()
            );
        }
    }
    println!();

    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the default `warn` level.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Read an API key from the environment, warning when it is absent.
fn api_key(var: &str) -> String {
    env::var(var).unwrap_or_else(|_| {
        eprintln!(
            "{}",
            format!("Warning: {} not set. API calls may fail.", var).yellow()
        );
        String::new()
    })
}

fn print_header(topic: &str, config: &Config) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", format!("  {}", "AIDuel".bold()).bright_blue().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{} {}", "Topic:".bold(), topic.bright_white());
    println!(
        "{} {}-{} rounds",
        "Rounds:".bold(),
        config.debate.min_turns,
        config.debate.max_turns
    );
    println!();
    println!("{}", "Participants:".bold());
    for p in Participant::ALL {
        println!(
            "  {}. {} - using {}",
            p.index() + 1,
            p.display_name().bright_cyan(),
            config.model(p).model.dimmed()
        );
    }
    println!();
    println!("{}", "─".repeat(70).dimmed());
}

fn end_message(end: DebateEnd) -> String {
    match end {
        DebateEnd::Agreement => "Debate concluded with closing statements.".to_string(),
        DebateEnd::MaxTurns => "Debate reached the round limit.".to_string(),
        DebateEnd::ErrorsExhausted(p) => format!("Debate stopped: {} failed too many times.", p),
    }
}

/// Create a callback that prints debate events to the console.
fn create_console_callback() -> Box<dyn Fn(DebateEvent) + Send + Sync> {
    Box::new(move |event| match event {
        DebateEvent::DebateStart { topic: _ } => {
            println!();
            println!("{}", "  Debate starting...".bright_magenta().bold());
        }
        DebateEvent::SpeakerStart { speaker, closing } => {
            let action = if closing {
                "is stating a final position..."
            } else {
                "is thinking..."
            };
            println!();
            println!(
                "{} {} {}",
                "▶".bright_cyan(),
                speaker.display_name().bright_cyan().bold(),
                action.dimmed()
            );
        }
        DebateEvent::TurnRecorded {
            speaker,
            content,
            cost,
            closing,
        } => {
            let label = if closing {
                format!("{} (Closing)", speaker)
            } else {
                speaker.to_string()
            };
            println!("{}", label.bold());
            println!("{}", "─".repeat(40).dimmed());
            for line in textwrap(&content, 66).lines() {
                println!("  {}", line);
            }
            println!("  {}", format!("Cost: ${:.4}", cost).dimmed());
            println!("{}", "─".repeat(40).dimmed());
        }
        DebateEvent::ProviderFailed {
            speaker,
            attempt,
            max,
            error,
        } => {
            eprintln!(
                "{} {}",
                format!("  [{} error {}/{}]", speaker, attempt, max).red().bold(),
                error.red()
            );
        }
        DebateEvent::ClosingStart => {
            println!();
            println!("{}", "═".repeat(70).bright_magenta());
            println!(
                "{}",
                "  The debate is ending. Both sides will state their final positions."
                    .bright_magenta()
                    .bold()
            );
            println!("{}", "═".repeat(70).bright_magenta());
        }
        DebateEvent::DebateEnd { end, total_cost: _ } => {
            if let DebateEnd::ErrorsExhausted(p) = end {
                eprintln!();
                eprintln!(
                    "{}",
                    format!("  {} failed {} times. Ending the debate.", p, MAX_ERRORS).yellow().bold()
                );
            }
        }
    })
}

/// Simple text wrapping function.
fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line_len = 0;

    for word in text.split_whitespace() {
        if current_line_len + word.len() + 1 > width && current_line_len > 0 {
            result.push('\n');
            current_line_len = 0;
        }
        if current_line_len > 0 {
            result.push(' ');
            current_line_len += 1;
        }
        result.push_str(word);
        current_line_len += word.len();
    }

    result
}
