//! Question similarity shared by the strategist and the consistency check.
//!
//! Two questions are "similar" when they overlap on significant words
//! (ratio > 0.5 with at least two shared words), when one normalized text
//! contains the other, or when they hit opposite ends of a known antonym
//! pair. Antonym matches flip the expected polarity.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "it", "its", "it's", "does", "do", "can", "could", "would", "will",
    "be", "are", "was", "were", "has", "have", "you", "your", "this", "that", "of", "in", "on",
    "to", "for", "with", "at", "by", "as", "or", "and", "some", "any", "usually", "typically",
    "generally", "often", "kind", "type", "sort", "thing", "something", "someone", "he", "she",
    "they", "them", "his", "her", "their",
];

const ANTONYMS: &[(&str, &str)] = &[
    ("active", "retired"),
    ("alive", "dead"),
    ("current", "former"),
    ("living", "extinct"),
    ("modern", "ancient"),
    ("indoor", "outdoor"),
    ("natural", "artificial"),
    ("wild", "domestic"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Same underlying question: answers should agree
    Same,
    /// Opposite ends of an antonym pair: answers should differ
    Opposite,
}

/// Lowercased, punctuation-free text.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let cleaned = NON_WORD.replace_all(&lowered, " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Content words of a question, with trailing plural "s" folded.
pub fn significant_words(text: &str) -> BTreeSet<String> {
    normalize(text)
        .split_whitespace()
        .filter(|w| w.len() > 1 && !STOPWORDS.contains(w))
        .map(stem)
        .collect()
}

fn stem(word: &str) -> String {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// Shared words over the larger word set.
pub fn overlap_ratio(a: &BTreeSet<String>, b: &BTreeSet<String>) -> (f32, usize) {
    let shared = a.intersection(b).count();
    let denom = a.len().max(b.len());
    if denom == 0 {
        return (0.0, 0);
    }
    (shared as f32 / denom as f32, shared)
}

pub fn relation(a: &str, b: &str) -> Option<Relation> {
    let na = normalize(a);
    let nb = normalize(b);
    if na.is_empty() || nb.is_empty() {
        return None;
    }

    let wa = significant_words(a);
    let wb = significant_words(b);

    for (x, y) in ANTONYMS {
        let (x, y) = (x.to_string(), y.to_string());
        if (wa.contains(&x) && wb.contains(&y)) || (wa.contains(&y) && wb.contains(&x)) {
            return Some(Relation::Opposite);
        }
    }

    if na == nb || contains_phrase(&na, &nb) || contains_phrase(&nb, &na) {
        return Some(Relation::Same);
    }

    let (ratio, shared) = overlap_ratio(&wa, &wb);
    if ratio > 0.5 && shared >= 2 {
        return Some(Relation::Same);
    }

    // Single-concept questions ("Is it a mammal?" vs "Is it some kind of
    // mammal?") collapse to the same one significant word.
    if wa.len() == 1 && wa == wb {
        return Some(Relation::Same);
    }

    None
}

pub fn is_similar(a: &str, b: &str) -> bool {
    relation(a, b) == Some(Relation::Same)
}

/// Whole-word containment of the significant part of `inner` in `outer`.
fn contains_phrase(outer: &str, inner: &str) -> bool {
    let core = |text: &str| -> Vec<String> {
        text.split_whitespace()
            .filter(|w| !STOPWORDS.contains(w))
            .map(stem)
            .collect()
    };
    let inner_core = core(inner);
    if inner_core.len() < 2 {
        return false;
    }
    let needle = format!(" {} ", inner_core.join(" "));
    let haystack = format!(" {} ", core(outer).join(" "));
    haystack.contains(&needle)
}

/// Whether `keyword` already appears (as a word) in any asked question.
pub fn keyword_asked(keyword: &str, asked: &[String]) -> bool {
    let key = stem(&normalize(keyword));
    asked
        .iter()
        .any(|q| significant_words(q).iter().any(|w| *w == key))
}
