//! Fact Extractor
//!
//! Rebuilds the fact ledger from the ordered message log. Questions and
//! answers are paired by `question_number`, so the result does not depend
//! on storage order and never needs caching.

use super::similarity::significant_words;
use super::types::{Message, MessageType};
use serde::Serialize;
use std::collections::BTreeMap;

const AFFIRMATIVE_PREFIXES: &[&str] = &["yes", "yeah", "yep", "yup"];
const AFFIRMATIVE_WORDS: &[&str] = &["correct", "right", "affirmative", "true"];
const NEGATIVE_WORDS: &[&str] = &["no", "nope", "nah", "wrong", "incorrect", "not", "false", "never"];
const UNCERTAIN_PHRASES: &[&str] = &[
    "sometimes",
    "maybe",
    "not sure",
    "unsure",
    "don't know",
    "dont know",
    "do not know",
    "depends",
    "partially",
    "kind of",
    "sort of",
];

const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("mammal", "mammals"),
    ("bird", "birds"),
    ("fish", "fish"),
    ("insect", "insects"),
    ("reptile", "reptiles"),
    ("animal", "animals"),
    ("alive", "living things"),
    ("living", "living things"),
    ("plant", "plants"),
    ("food", "food"),
    ("edible", "food"),
    ("eat", "food"),
    ("vehicle", "vehicles"),
    ("place", "places"),
    ("person", "people"),
    ("human", "people"),
    ("electronic", "electronics"),
    ("machine", "machines"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Affirmative,
    Negative,
    Uncertain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    pub question_number: u32,
    pub question: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncertainFact {
    pub question_number: u32,
    pub question: String,
    pub raw_answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FactLedger {
    pub confirmed_yes: Vec<Fact>,
    pub confirmed_no: Vec<Fact>,
    pub uncertain: Vec<UncertainFact>,
    pub eliminated_categories: Vec<String>,
}

impl FactLedger {
    /// Build the ledger from a message log. Pure: same input, same output.
    pub fn extract(messages: &[Message]) -> Self {
        let mut questions: BTreeMap<u32, &str> = BTreeMap::new();
        let mut answers: BTreeMap<u32, &str> = BTreeMap::new();

        for msg in messages.iter().filter(|m| m.question_number > 0) {
            match msg.message_type {
                MessageType::Question | MessageType::Guess => {
                    questions.entry(msg.question_number).or_insert(msg.content.as_str());
                }
                MessageType::Answer => {
                    answers.entry(msg.question_number).or_insert(msg.content.as_str());
                }
                MessageType::Hint => {}
            }
        }

        let mut ledger = FactLedger::default();
        for (number, question) in questions {
            let Some(answer) = answers.get(&number) else {
                continue;
            };
            let confidence = confidence_of(answer);
            match classify_answer(answer) {
                Polarity::Affirmative => ledger.confirmed_yes.push(Fact {
                    question_number: number,
                    question: question.to_string(),
                    confidence,
                }),
                Polarity::Negative => {
                    for label in category_labels(question) {
                        if !ledger.eliminated_categories.iter().any(|c| c == label) {
                            ledger.eliminated_categories.push(label.to_string());
                        }
                    }
                    ledger.confirmed_no.push(Fact {
                        question_number: number,
                        question: question.to_string(),
                        confidence,
                    });
                }
                Polarity::Uncertain => ledger.uncertain.push(UncertainFact {
                    question_number: number,
                    question: question.to_string(),
                    raw_answer: answer.to_string(),
                }),
            }
        }
        ledger
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed_yes.is_empty() && self.confirmed_no.is_empty() && self.uncertain.is_empty()
    }

    pub fn fact_count(&self) -> usize {
        self.confirmed_yes.len() + self.confirmed_no.len()
    }

    /// Prompt-ready summary grouped by polarity.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let section = |title: &str, items: Vec<String>, out: &mut String| {
            out.push_str(title);
            out.push('\n');
            if items.is_empty() {
                out.push_str("- (none)\n");
            }
            for item in items {
                out.push_str("- ");
                out.push_str(&item);
                out.push('\n');
            }
        };

        section(
            "CONFIRMED TRUE:",
            self.confirmed_yes.iter().map(|f| f.question.clone()).collect(),
            &mut out,
        );
        section(
            "CONFIRMED FALSE:",
            self.confirmed_no.iter().map(|f| f.question.clone()).collect(),
            &mut out,
        );
        section(
            "UNCERTAIN:",
            self.uncertain
                .iter()
                .map(|f| format!("{} ({})", f.question, f.raw_answer))
                .collect(),
            &mut out,
        );
        out
    }
}

/// Questions asked so far, in question-number order.
pub fn asked_questions(messages: &[Message]) -> Vec<String> {
    let mut asked: BTreeMap<u32, String> = BTreeMap::new();
    for msg in messages {
        if matches!(msg.message_type, MessageType::Question | MessageType::Guess)
            && msg.question_number > 0
        {
            asked.entry(msg.question_number).or_insert_with(|| msg.content.clone());
        }
    }
    asked.into_values().collect()
}

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lexicon classification of a free-form answer.
pub fn classify_answer(answer: &str) -> Polarity {
    let lower = answer.to_lowercase();
    if UNCERTAIN_PHRASES.iter().any(|p| lower.contains(p)) {
        return Polarity::Uncertain;
    }

    let affirmative = |w: &str| {
        AFFIRMATIVE_PREFIXES.iter().any(|p| w.starts_with(p)) || AFFIRMATIVE_WORDS.contains(&w)
    };
    let negative = |w: &str| NEGATIVE_WORDS.contains(&w);

    // A leading yes/no settles it; qualifiers after it don't flip the answer.
    let words = tokens(answer);
    match words.first().map(String::as_str) {
        Some(w) if affirmative(w) => return Polarity::Affirmative,
        Some(w) if negative(w) => return Polarity::Negative,
        _ => {}
    }
    if words.iter().any(|w| negative(w)) {
        return Polarity::Negative;
    }
    if words.iter().any(|w| affirmative(w)) {
        return Polarity::Affirmative;
    }
    Polarity::Uncertain
}

pub fn confidence_of(answer: &str) -> f32 {
    let lower = answer.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["definitely", "absolutely"]) {
        1.0
    } else if has(&["probably", "likely"]) {
        0.8
    } else if has(&["maybe", "sometimes"]) {
        0.5
    } else if has(&["unsure", "don't know", "dont know", "not sure"]) {
        0.2
    } else {
        0.9
    }
}

fn category_labels(question: &str) -> Vec<&'static str> {
    let words = significant_words(question);
    CATEGORY_LABELS
        .iter()
        .filter(|(keyword, _)| words.contains(*keyword))
        .map(|(_, label)| *label)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Role;

    fn qa(n: u32, q: &str, a: &str) -> Vec<Message> {
        vec![
            Message::new("s", Role::User, MessageType::Question, n, q),
            Message::new("s", Role::Assistant, MessageType::Answer, n, a),
        ]
    }

    fn sample() -> Vec<Message> {
        let mut msgs = vec![Message::new("s", Role::System, MessageType::Question, 0, "prime")];
        msgs.extend(qa(1, "Is it a mammal?", "Yes"));
        msgs.extend(qa(2, "Does it fly?", "No"));
        msgs.extend(qa(3, "Is it a pet?", "Sometimes"));
        msgs.extend(qa(4, "Is it big?", "Probably yes"));
        msgs
    }

    #[test]
    fn test_classify_answer_lexicon() {
        assert_eq!(classify_answer("Yes"), Polarity::Affirmative);
        assert_eq!(classify_answer("yep!"), Polarity::Affirmative);
        assert_eq!(classify_answer("That's correct"), Polarity::Affirmative);
        assert_eq!(classify_answer("Nope"), Polarity::Negative);
        assert_eq!(classify_answer("incorrect"), Polarity::Negative);
        assert_eq!(classify_answer("Not sure"), Polarity::Uncertain);
        assert_eq!(classify_answer("maybe yes"), Polarity::Uncertain);
        assert_eq!(classify_answer("banana"), Polarity::Uncertain);
    }

    #[test]
    fn test_leading_answer_wins_over_later_qualifiers() {
        assert_eq!(classify_answer("Yes, but not always"), Polarity::Affirmative);
        assert_eq!(classify_answer("Yes, it is not wild"), Polarity::Affirmative);
        assert_eq!(classify_answer("Yes it's not a pet"), Polarity::Affirmative);
        assert_eq!(classify_answer("No, that's right out"), Polarity::Negative);
        // Without a leading answer word, any negation still counts.
        assert_eq!(classify_answer("It is not a pet"), Polarity::Negative);
        assert_eq!(classify_answer("Not really"), Polarity::Negative);
    }

    #[test]
    fn test_confidence_heuristic() {
        assert_eq!(confidence_of("Definitely yes"), 1.0);
        assert_eq!(confidence_of("probably"), 0.8);
        assert_eq!(confidence_of("sometimes"), 0.5);
        assert_eq!(confidence_of("I don't know"), 0.2);
        assert_eq!(confidence_of("Yes"), 0.9);
    }

    #[test]
    fn test_extract_builds_ledger() {
        let ledger = FactLedger::extract(&sample());

        assert_eq!(ledger.confirmed_yes.len(), 2);
        assert_eq!(ledger.confirmed_yes[0].question, "Is it a mammal?");
        assert_eq!(ledger.confirmed_yes[1].confidence, 0.8);
        assert_eq!(ledger.confirmed_no.len(), 1);
        assert_eq!(ledger.confirmed_no[0].question, "Does it fly?");
        assert_eq!(ledger.uncertain.len(), 1);
        assert_eq!(ledger.uncertain[0].raw_answer, "Sometimes");
    }

    #[test]
    fn test_extract_is_pure_and_order_insensitive() {
        let msgs = sample();
        assert_eq!(FactLedger::extract(&msgs), FactLedger::extract(&msgs));

        let mut reordered = msgs.clone();
        // Swap the Q/A pairs for questions 1 and 2.
        reordered.swap(1, 3);
        reordered.swap(2, 4);
        assert_eq!(FactLedger::extract(&reordered), FactLedger::extract(&msgs));
    }

    #[test]
    fn test_unanswered_question_is_ignored() {
        let mut msgs = qa(1, "Is it a mammal?", "Yes");
        msgs.push(Message::new("s", Role::Assistant, MessageType::Question, 2, "Is it wild?"));
        let ledger = FactLedger::extract(&msgs);
        assert_eq!(ledger.fact_count(), 1);
        assert_eq!(asked_questions(&msgs).len(), 2);
    }

    #[test]
    fn test_eliminated_categories_from_negatives() {
        let mut msgs = qa(1, "Is it a mammal?", "No");
        msgs.extend(qa(2, "Is it a bird?", "No"));
        let ledger = FactLedger::extract(&msgs);
        assert_eq!(ledger.eliminated_categories, vec!["mammals", "birds"]);
    }

    #[test]
    fn test_summary_lists_sections() {
        let summary = FactLedger::extract(&sample()).summary();
        assert!(summary.contains("CONFIRMED TRUE:\n- Is it a mammal?"));
        assert!(summary.contains("CONFIRMED FALSE:\n- Does it fly?"));
        assert!(summary.contains("UNCERTAIN:\n- Is it a pet? (Sometimes)"));
    }
}
