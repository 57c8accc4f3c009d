//! Writes a finished transcript to JSON and HTML reports.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::completion::AGREEMENT_TOKEN;
use crate::error::ExportError;
use crate::transcript::{Transcript, Turn};

/// Timestamp embedded in file names and the JSON document.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MAX_TOPIC_LEN: usize = 50;

/// Letters with a fixed plain-ASCII spelling.
const TRANSLITERATIONS: &[(char, &str)] = &[
    ('ı', "i"),
    ('İ', "i"),
    ('ğ', "g"),
    ('Ğ', "g"),
    ('ü', "u"),
    ('Ü', "u"),
    ('ş', "s"),
    ('Ş', "s"),
    ('ö', "o"),
    ('Ö', "o"),
    ('ç', "c"),
    ('Ç', "c"),
    ('â', "a"),
    ('á', "a"),
    ('à', "a"),
    ('ä', "a"),
    ('ã', "a"),
    ('å', "a"),
    ('é', "e"),
    ('è', "e"),
    ('ê', "e"),
    ('ë', "e"),
    ('î', "i"),
    ('í', "i"),
    ('ì', "i"),
    ('ï', "i"),
    ('ó', "o"),
    ('ò', "o"),
    ('ô', "o"),
    ('õ', "o"),
    ('ø', "o"),
    ('û', "u"),
    ('ú', "u"),
    ('ù', "u"),
    ('ñ', "n"),
    ('ß', "ss"),
    ('æ', "ae"),
    ('œ', "oe"),
];

/// Reduce a topic to a safe file-name segment.
///
/// Lowercases, transliterates known letters to ASCII, replaces everything that
/// is not an ASCII letter or digit with `_`, and keeps the first 50 characters.
pub fn sanitize_topic(topic: &str) -> String {
    let mut plain = String::with_capacity(topic.len());
    for c in topic.chars() {
        // Map before lowercasing so 'İ' does not turn into 'i' plus a combining dot.
        if let Some(ascii) = transliterate(c) {
            plain.push_str(ascii);
            continue;
        }
        for lower in c.to_lowercase() {
            match transliterate(lower) {
                Some(ascii) => plain.push_str(ascii),
                None => plain.push(lower),
            }
        }
    }

    plain
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(MAX_TOPIC_LEN)
        .collect()
}

fn transliterate(c: char) -> Option<&'static str> {
    TRANSLITERATIONS
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
}

/// Paths of the two files written for one debate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub json: PathBuf,
    pub html: PathBuf,
}

/// The persisted JSON document.
#[derive(Debug, Serialize)]
pub struct TranscriptDocument<'a> {
    pub conversation: &'a [Turn],
    pub total_cost: f64,
    pub timestamp: String,
    pub topic: &'a str,
}

/// Serializes transcripts into a base directory.
#[derive(Debug, Clone)]
pub struct TranscriptExporter {
    base_dir: PathBuf,
}

impl TranscriptExporter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// `{base_dir}/debate_{sanitized_topic}_{timestamp}.{json,html}`
    pub fn paths(&self, topic: &str, timestamp: &str) -> ExportPaths {
        let stem = format!("debate_{}_{}", sanitize_topic(topic), timestamp);
        ExportPaths {
            json: self.base_dir.join(format!("{stem}.json")),
            html: self.base_dir.join(format!("{stem}.html")),
        }
    }

    /// Write both reports stamped with the current local time.
    pub fn export(&self, topic: &str, transcript: &Transcript) -> Result<ExportPaths, ExportError> {
        self.export_at(topic, transcript, Local::now())
    }

    /// Write both reports stamped with `now`.
    pub fn export_at(
        &self,
        topic: &str,
        transcript: &Transcript,
        now: DateTime<Local>,
    ) -> Result<ExportPaths, ExportError> {
        fs::create_dir_all(&self.base_dir).map_err(|source| ExportError::Io {
            path: self.base_dir.clone(),
            source,
        })?;

        let timestamp = now.format(FILE_TIMESTAMP_FORMAT).to_string();
        let paths = self.paths(topic, &timestamp);

        let document = TranscriptDocument {
            conversation: transcript.turns(),
            total_cost: transcript.total_cost(),
            timestamp,
            topic,
        };
        let json = serde_json::to_string_pretty(&document)?;
        write_file(&paths.json, &json)?;

        let html = render_html(
            topic,
            transcript,
            &now.format(DISPLAY_TIMESTAMP_FORMAT).to_string(),
        );
        write_file(&paths.html, &html)?;

        info!(json = %paths.json.display(), html = %paths.html.display(), "transcript exported");
        Ok(paths)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

const CSS_STYLE: &str = r#"
    body { font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; background-color: #f5f5f5; }
    .message { margin: 10px 0; padding: 15px; border-radius: 10px; max-width: 80%; }
    .chatgpt { background-color: #e9f5ff; margin-right: auto; }
    .claude { background-color: #f0f0f0; margin-left: auto; }
    .cost { font-size: 0.8em; color: #666; margin-top: 5px; text-align: right; }
    .header { text-align: center; margin-bottom: 30px; }
    .total-cost { text-align: right; margin-top: 20px; font-weight: bold; }
    .timestamp { text-align: center; color: #666; margin-bottom: 20px; }
    .conclusion-header { text-align: center; margin-top: 40px; margin-bottom: 20px; padding: 10px; background-color: #333; color: white; border-radius: 5px; font-weight: bold; }
"#;

/// Render the static HTML report.
///
/// Turns from the first one carrying the agreement marker onward are placed in
/// a separate CONCLUSION section.
pub fn render_html(topic: &str, transcript: &Transcript, display_timestamp: &str) -> String {
    let split = transcript
        .first_marker_index(AGREEMENT_TOKEN)
        .unwrap_or(transcript.len());
    let (main, conclusion) = transcript.turns().split_at(split);

    let mut body = String::new();
    for turn in main {
        render_turn(&mut body, turn);
    }
    if !conclusion.is_empty() {
        body.push_str("\n    <div class=\"conclusion-header\">CONCLUSION</div>");
        for turn in conclusion {
            render_turn(&mut body, turn);
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>AI Debate Results</title>
  <style>{css}</style>
</head>
<body>
  <div class="header">
    <h1>AI Debate</h1>
    <p>Topic: {topic}</p>
  </div>
  <div class="timestamp">Date: {timestamp}</div>
  <div id="conversation">{body}
  </div>
  <div class="total-cost">Total cost: ${total:.4}</div>
</body>
</html>
"#,
        css = CSS_STYLE,
        topic = escape_html(topic),
        timestamp = escape_html(display_timestamp),
        body = body,
        total = transcript.total_cost(),
    )
}

fn render_turn(out: &mut String, turn: &Turn) {
    let _ = write!(
        out,
        r#"
    <div class="message {class}">
      <strong>{speaker}:</strong>
      <p>{content}</p>
      <div class="cost">Cost: ${cost:.4}</div>
    </div>"#,
        class = turn.speaker.css_class(),
        speaker = turn.speaker.display_name(),
        content = escape_html(&turn.content),
        cost = turn.cost,
    );
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::Participant;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    fn transcript_with_agreement() -> Transcript {
        Transcript::from(vec![
            Turn::new(Participant::ChatGpt, "Opening.", 0.01),
            Turn::new(Participant::Claude, format!("Agreed. {AGREEMENT_TOKEN}"), 0.02),
            Turn::new(Participant::ChatGpt, "Final GPT.", 0.0),
            Turn::new(Participant::Claude, "Final Claude.", 0.03),
        ])
    }

    #[test]
    fn test_sanitize_topic_transliterates_and_replaces() {
        assert_eq!(sanitize_topic("Çok güzel?!"), "cok_guzel__");
        assert_eq!(sanitize_topic("İSTANBUL ışık"), "istanbul_isik");
        assert_eq!(sanitize_topic("Straße café"), "strasse_cafe");
        assert_eq!(sanitize_topic("日本"), "__");
    }

    #[test]
    fn test_sanitize_topic_truncates() {
        let topic = "a".repeat(80);
        assert_eq!(sanitize_topic(&topic).len(), 50);
    }

    #[test]
    fn test_paths_follow_naming_convention() {
        let exporter = TranscriptExporter::new("out");
        let paths = exporter.paths("Çok güzel?!", "20240309_140507");
        assert_eq!(paths.json, PathBuf::from("out/debate_cok_guzel___20240309_140507.json"));
        assert_eq!(paths.html, PathBuf::from("out/debate_cok_guzel___20240309_140507.html"));
    }

    #[test]
    fn test_export_writes_json_with_total_cost() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nested").join("reports");
        let exporter = TranscriptExporter::new(&base);
        let transcript = transcript_with_agreement();

        let paths = exporter
            .export_at("Test mi?", &transcript, fixed_time())
            .unwrap();
        assert_eq!(paths.json, base.join("debate_test_mi__20240309_140507.json"));

        let raw = fs::read_to_string(&paths.json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["topic"], "Test mi?");
        assert_eq!(value["timestamp"], "20240309_140507");
        assert_eq!(value["conversation"].as_array().unwrap().len(), 4);
        assert_eq!(value["conversation"][1]["speaker"], "Claude");

        let per_turn: f64 = value["conversation"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["cost"].as_f64().unwrap())
            .sum();
        let total = value["total_cost"].as_f64().unwrap();
        assert!((total - per_turn).abs() < 1e-9);
        assert!((total - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_html_splits_conclusion_at_first_marker() {
        let html = render_html("Topic", &transcript_with_agreement(), "2024-03-09 14:05:07");
        let header = html.find("CONCLUSION").unwrap();

        let opening = html.find("Opening.").unwrap();
        let agreed = html.find("Agreed.").unwrap();
        let closing = html.find("Final Claude.").unwrap();
        assert!(opening < header);
        assert!(header < agreed);
        assert!(agreed < closing);
        assert!(html.contains("Total cost: $0.0600"));
        assert!(html.contains("class=\"message claude\""));
    }

    #[test]
    fn test_html_without_marker_has_no_conclusion() {
        let transcript = Transcript::from(vec![
            Turn::new(Participant::ChatGpt, "A.", 0.0),
            Turn::new(Participant::Claude, "B.", 0.0),
        ]);
        let html = render_html("Topic", &transcript, "now");
        assert!(!html.contains("conclusion-header\">"));
        assert!(html.contains("Total cost: $0.0000"));
    }

    #[test]
    fn test_html_escapes_content() {
        let transcript = Transcript::from(vec![Turn::new(
            Participant::ChatGpt,
            "<script>alert('x')</script> & more.",
            0.0,
        )]);
        let html = render_html("A < B", &transcript, "now");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Topic: A &lt; B"));
    }

    #[test]
    fn test_export_failure_keeps_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let transcript = transcript_with_agreement();
        let exporter = TranscriptExporter::new(blocker.join("sub"));
        let err = exporter.export("Topic", &transcript).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
        assert_eq!(transcript.len(), 4);
    }
}
