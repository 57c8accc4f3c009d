//! Prompt templates and the closing-statement example phrase.

use crate::completion::AGREEMENT_TOKEN;

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an objective and analytical debater. You are talking with another person and will debate the following topic: {topic}

Important rules:
1. Be polite and respectful
2. Every answer must be a single paragraph
3. Support your ideas with data
4. Decide your own position freely - you may agree with the other side
5. Weigh the other side's arguments carefully
6. When you want to end the debate, append "{agreement_token}" to the end of your answer
7. If the debate ends, state your clear position in one final sentence

Debate topic: {topic}"#;

pub const DEFAULT_CLOSING_PROMPT: &str = r#"The debate is over. Please summarize the position you defended in one clear sentence.
Your answer must consist only of your position, with no additional explanation.

Example format:
"{example_conclusion}""#;

/// Fill the system prompt template for a topic.
pub fn render_system_prompt(template: &str, topic: &str) -> String {
    template
        .replace("{agreement_token}", AGREEMENT_TOKEN)
        .replace("{topic}", topic)
}

/// Fill the closing prompt template with the example phrase for `topic`.
pub fn render_closing_prompt(template: &str, topic: &str) -> String {
    template.replace("{example_conclusion}", &example_conclusion(topic))
}

#[derive(Debug, Clone, Copy)]
enum ExampleRule {
    /// Topic contains the needle: use a fixed sentence.
    Canned(&'static str, &'static str),
    /// Topic is a yes/no question: echo the text before the particle.
    QuestionParticle,
}

/// Checked in order; the first match wins.
const EXAMPLE_RULES: &[ExampleRule] = &[
    ExampleRule::Canned("futbol kulübü", "Türkiye'nin en büyük kulübü [takım adı]'dır."),
    ExampleRule::Canned("football club", "The biggest club is [club name]."),
    ExampleRule::Canned("en iyi", "En iyi [konu] [seçim]'dir."),
    ExampleRule::Canned("best", "The best [subject] is [choice]."),
    ExampleRule::QuestionParticle,
];

const FALLBACK_EXAMPLE: &str = "My position on this topic: [position].";

/// Turkish yes/no question particle as a separate word.
const QUESTION_PARTICLE: &str = r"(?i)\s+m[ıiuü]\b";

/// Pick a canned example sentence that steers the style of closing statements.
pub fn example_conclusion(topic: &str) -> String {
    let lowered = topic.to_lowercase();

    for rule in EXAMPLE_RULES {
        match rule {
            ExampleRule::Canned(needle, example) => {
                if lowered.contains(needle) {
                    return (*example).to_string();
                }
            }
            ExampleRule::QuestionParticle => {
                let Ok(re) = regex::Regex::new(QUESTION_PARTICLE) else {
                    continue;
                };
                if let Some(found) = re.find(topic) {
                    let prefix = topic[..found.start()].trim();
                    if !prefix.is_empty() {
                        return format!("{prefix}.");
                    }
                }
            }
        }
    }

    FALLBACK_EXAMPLE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_placeholders() {
        let prompt = render_system_prompt(DEFAULT_SYSTEM_PROMPT, "Cats vs dogs");
        assert!(prompt.contains("Debate topic: Cats vs dogs"));
        assert!(prompt.contains(AGREEMENT_TOKEN));
        assert!(!prompt.contains("{topic}"));
        assert!(!prompt.contains("{agreement_token}"));
    }

    #[test]
    fn test_closing_prompt_contains_example() {
        let prompt = render_closing_prompt(DEFAULT_CLOSING_PROMPT, "Test mi?");
        assert!(prompt.contains("\"Test.\""));
        assert!(!prompt.contains("{example_conclusion}"));
    }

    #[test]
    fn test_example_canned_rules() {
        assert_eq!(
            example_conclusion("Türkiye'nin en büyük FUTBOL KULÜBÜ hangisi?"),
            "Türkiye'nin en büyük kulübü [takım adı]'dır."
        );
        assert_eq!(
            example_conclusion("Which is the best programming language?"),
            "The best [subject] is [choice]."
        );
    }

    #[test]
    fn test_example_rule_order() {
        // Both "football club" and "best" match; the earlier rule wins.
        assert_eq!(
            example_conclusion("The best football club"),
            "The biggest club is [club name]."
        );
    }

    #[test]
    fn test_example_question_particle() {
        assert_eq!(
            example_conclusion("Yapay Zeka Dünyayı ele geçirebilir mi? Geçiremez mi?"),
            "Yapay Zeka Dünyayı ele geçirebilir."
        );
        assert_eq!(
            example_conclusion("Zaman yolculuğu geçmişe mi yapılmalı?"),
            "Zaman yolculuğu geçmişe."
        );
    }

    #[test]
    fn test_particle_must_be_a_separate_word() {
        assert_eq!(
            example_conclusion("Should the minimum wage rise?"),
            FALLBACK_EXAMPLE
        );
    }

    #[test]
    fn test_example_fallback() {
        assert_eq!(
            example_conclusion("Should pineapple go on pizza?"),
            "My position on this topic: [position]."
        );
        assert_eq!(example_conclusion(""), FALLBACK_EXAMPLE);
    }
}
