//! Answer Normalizer
//!
//! Information Hiding:
//! - JSON extraction and vocabulary matching hidden behind `normalize_reply`
//! - Guess detection expressed as an explicit `Verdict`, never as a loose flag
//! - Hint cleanup kept separate and more permissive

use super::types::Answer;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

const MAX_RAW_LEN: usize = 50;
const MAX_HINT_LEN: usize = 200;

static HINT_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*(hint|answer)\s*:\s*").unwrap());
static CORRECTNESS_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(correct|you got it|that['’]s right|exactly)\b").unwrap());
static NEGATED_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\bnot|\bnever|n['’]t)\s+$").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[\r\n]+\s*").unwrap());

/// Classification of one model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Direct(Answer),
    /// The player's question named the secret. Always implies "Yes".
    GuessConfirmed,
    /// Nothing in the vocabulary matched; `raw` is truncated.
    Malformed { raw: String },
}

impl Verdict {
    pub fn is_guess(&self) -> bool {
        matches!(self, Verdict::GuessConfirmed)
    }

    pub fn answer(&self) -> Option<Answer> {
        match self {
            Verdict::Direct(a) => Some(*a),
            Verdict::GuessConfirmed => Some(Answer::Yes),
            Verdict::Malformed { .. } => None,
        }
    }

    /// Text shown to the player and persisted in the log.
    pub fn text(&self) -> String {
        match self {
            Verdict::Direct(a) => a.to_string(),
            Verdict::GuessConfirmed => Answer::Yes.to_string(),
            Verdict::Malformed { raw } => raw.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StructuredReply {
    answer: Option<serde_json::Value>,
    #[serde(default, alias = "isGuess")]
    is_guess: Option<bool>,
}

/// Interpret a model reply meant to carry `{answer, is_guess?}`.
pub fn normalize_reply(raw: &str) -> Verdict {
    if let Some(object) = first_json_object(raw) {
        if let Ok(reply) = serde_json::from_str::<StructuredReply>(object) {
            let answer_text = match &reply.answer {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            return structured_verdict(&answer_text, reply.is_guess.unwrap_or(false));
        }
        tracing::debug!("[AnswerNormalizer] JSON-looking reply did not parse, using text fallback");
    }

    let trimmed = raw.trim();
    match classify_prefix(trimmed) {
        Some(Answer::Yes) if has_correctness_marker(trimmed) => Verdict::GuessConfirmed,
        Some(answer) => Verdict::Direct(answer),
        None => Verdict::Malformed {
            raw: truncate(trimmed, MAX_RAW_LEN),
        },
    }
}

fn structured_verdict(answer_text: &str, is_guess: bool) -> Verdict {
    let cleaned = answer_text.trim();
    match classify_prefix(cleaned) {
        Some(Answer::Yes) if is_guess => Verdict::GuessConfirmed,
        Some(answer) => {
            if is_guess {
                // Backend contract breach: a guess can only be confirmed with "Yes".
                tracing::error!(
                    "[AnswerNormalizer] Validation error: is_guess=true with answer '{}'",
                    answer
                );
            }
            Verdict::Direct(answer)
        }
        None => {
            if is_guess {
                tracing::error!(
                    "[AnswerNormalizer] Validation error: is_guess=true with unrecognized answer '{}'",
                    cleaned
                );
            }
            Verdict::Malformed {
                raw: truncate(cleaned, MAX_RAW_LEN),
            }
        }
    }
}

/// Case-insensitive prefix match against the fixed vocabulary.
pub fn classify_prefix(text: &str) -> Option<Answer> {
    let lower = text
        .trim_start_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace())
        .to_lowercase();
    // "not sure" must be tested before "no".
    if lower.starts_with("not sure") {
        Some(Answer::NotSure)
    } else if lower.starts_with("yes") {
        Some(Answer::Yes)
    } else if lower.starts_with("no") {
        Some(Answer::No)
    } else if lower.starts_with("sometimes") {
        Some(Answer::Sometimes)
    } else {
        None
    }
}

/// Whole-word marker such as "correct" or "you got it", not preceded by a negation.
pub fn has_correctness_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    CORRECTNESS_MARKER
        .find_iter(&lower)
        .any(|m| !NEGATED_TAIL.is_match(&lower[..m.start()]))
}

/// Slice of the first balanced `{...}` object, ignoring braces inside strings.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Strip labels and quotes, collapse newlines, cap at 200 characters.
pub fn clean_hint(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    loop {
        let stripped = HINT_LABEL.replace(&text, "").to_string();
        let stripped = stripped
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '“' || c == '”')
            .trim()
            .to_string();
        if stripped == text {
            break;
        }
        text = stripped;
    }

    let collapsed = WHITESPACE_RUN.replace_all(&text, " ").to_string();
    if collapsed.chars().count() > MAX_HINT_LEN {
        let head: String = collapsed.chars().take(MAX_HINT_LEN - 3).collect();
        format!("{}...", head.trim_end())
    } else {
        collapsed
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_yes_without_marker_is_not_a_guess() {
        let v = normalize_reply("Yes, it is alive.");
        assert_eq!(v, Verdict::Direct(Answer::Yes));
        assert!(!v.is_guess());
        assert_eq!(v.text(), "Yes");
    }

    #[test]
    fn test_json_answer_is_cleaned() {
        assert_eq!(
            normalize_reply(r#"{"answer":"no, definitely not"}"#),
            Verdict::Direct(Answer::No)
        );
        assert_eq!(
            normalize_reply("Sure! {\"answer\": \"Not sure really\"} hope that helps"),
            Verdict::Direct(Answer::NotSure)
        );
    }

    #[test]
    fn test_json_guess_confirmed() {
        let v = normalize_reply(r#"{"answer": "Yes", "is_guess": true}"#);
        assert_eq!(v, Verdict::GuessConfirmed);
        assert_eq!(v.answer(), Some(Answer::Yes));
    }

    #[test]
    fn test_guess_flag_with_no_is_never_a_guess() {
        let v = normalize_reply(r#"{"answer": "No", "is_guess": true}"#);
        assert_eq!(v, Verdict::Direct(Answer::No));
        assert!(!v.is_guess());
    }

    #[test]
    fn test_text_fallback_detects_correctness_marker() {
        assert_eq!(
            normalize_reply("Yes, that's right! It is a cat."),
            Verdict::GuessConfirmed
        );
        // A marker without "Yes" never counts.
        assert_eq!(
            normalize_reply("No, that's not correct."),
            Verdict::Direct(Answer::No)
        );
    }

    #[test]
    fn test_negated_or_embedded_marker_is_not_a_guess() {
        assert_eq!(
            normalize_reply("Yes, that's not correct."),
            Verdict::Direct(Answer::Yes)
        );
        assert_eq!(
            normalize_reply("Yes, that's incorrect."),
            Verdict::Direct(Answer::Yes)
        );
        assert_eq!(
            normalize_reply("Yes, it isn't exactly a pet."),
            Verdict::Direct(Answer::Yes)
        );
        assert!(has_correctness_marker("Yes! You got it."));
        assert!(has_correctness_marker("Yes, not bad, that is correct"));
        assert!(!has_correctness_marker("Yes, it's uncorrected"));
    }

    #[test]
    fn test_malformed_is_truncated() {
        let long = "I would rather describe this creature in considerable detail for you";
        match normalize_reply(long) {
            Verdict::Malformed { raw } => assert_eq!(raw.chars().count(), 50),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_no_verdict_pairs_guess_with_other_answers() {
        let samples = [
            "Yes",
            "No",
            "yes you got it",
            "no, exactly wrong",
            "Sometimes, correct",
            r#"{"answer":"Sometimes","is_guess":true}"#,
            r#"{"answer":"Yes","is_guess":true}"#,
            r#"{"answer":42,"is_guess":true}"#,
            "{broken json yes}",
        ];
        for s in samples {
            let v = normalize_reply(s);
            if v.is_guess() {
                assert_eq!(v.answer(), Some(Answer::Yes), "sample: {s}");
            }
        }
    }

    #[test]
    fn test_first_json_object_skips_braces_in_strings() {
        let text = r#"prefix {"answer": "Yes {really}", "x": {"y": 1}} tail {"z": 2}"#;
        assert_eq!(
            first_json_object(text),
            Some(r#"{"answer": "Yes {really}", "x": {"y": 1}}"#)
        );
        assert_eq!(first_json_object("no braces"), None);
    }

    #[test]
    fn test_clean_hint() {
        assert_eq!(clean_hint("Hint: \"It purrs.\""), "It purrs.");
        assert_eq!(clean_hint("Answer:  It lives\n\nindoors"), "It lives indoors");

        let long = "x".repeat(300);
        let cleaned = clean_hint(&long);
        assert_eq!(cleaned.chars().count(), 200);
        assert!(cleaned.ends_with("..."));
    }
}
