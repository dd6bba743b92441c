//! Possibility-Space Builder
//!
//! Coarse keyword elimination over the category's candidate list. This is
//! a heuristic, not inference: a "No" to a question that mentions a known
//! property removes every item tagged with it, and each fact an item fails
//! to satisfy costs it 0.2 of fit score.

use super::catalog::ItemKnowledge;
use super::facts::{Fact, FactLedger};
use serde::Serialize;

const FIT_PENALTY: f32 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PossibilitySpace {
    pub category: String,
    pub total_items: usize,
    pub eliminated: Vec<String>,
    /// Remaining items, best fit first
    pub remaining: Vec<String>,
    /// Fit score per remaining item, in the same order as `remaining`
    pub confidence_scores: Vec<(String, f32)>,
}

impl PossibilitySpace {
    pub fn build(category: &str, ledger: &FactLedger, knowledge: &dyn ItemKnowledge) -> Self {
        let items = knowledge.items(category);
        let total_items = items.len();

        let mut eliminated = Vec::new();
        let mut scored: Vec<(String, f32)> = Vec::new();

        for item in items {
            if is_eliminated(category, &item, &ledger.confirmed_no, knowledge) {
                eliminated.push(item);
                continue;
            }
            let score = fit_score(category, &item, ledger, knowledge);
            scored.push((item, score));
        }

        // Stable sort keeps catalog order among equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        tracing::debug!(
            "[PossibilitySpace] {}: {} of {} items remain",
            category,
            scored.len(),
            total_items
        );

        Self {
            category: category.to_string(),
            total_items,
            eliminated,
            remaining: scored.iter().map(|(item, _)| item.clone()).collect(),
            confidence_scores: scored,
        }
    }

    pub fn remaining_count(&self) -> usize {
        self.remaining.len()
    }

    /// Highest-fit remaining item for which `skip` is false.
    pub fn best_item_except(&self, skip: impl Fn(&str) -> bool) -> Option<&str> {
        self.remaining.iter().map(String::as_str).find(|item| !skip(item))
    }

    pub fn score_of(&self, item: &str) -> Option<f32> {
        self.confidence_scores
            .iter()
            .find(|(name, _)| name == item)
            .map(|(_, score)| *score)
    }
}

fn is_eliminated(
    category: &str,
    item: &str,
    negatives: &[Fact],
    knowledge: &dyn ItemKnowledge,
) -> bool {
    negatives.iter().any(|fact| {
        let named = knowledge.mentioned_items(category, &fact.question);
        if named.iter().any(|n| n.eq_ignore_ascii_case(item)) {
            return true;
        }
        knowledge
            .mentioned_properties(category, &fact.question)
            .iter()
            .any(|tag| knowledge.has_property(category, item, tag) == Some(true))
    })
}

/// Whether `item` is consistent with one fact. Unknown properties count as
/// consistent.
fn satisfies(
    category: &str,
    item: &str,
    question: &str,
    expected: bool,
    knowledge: &dyn ItemKnowledge,
) -> bool {
    let named = knowledge.mentioned_items(category, question);
    if !named.is_empty() {
        let is_named = named.iter().any(|n| n.eq_ignore_ascii_case(item));
        return is_named == expected;
    }
    knowledge
        .mentioned_properties(category, question)
        .iter()
        .all(|tag| match knowledge.has_property(category, item, tag) {
            Some(has) => has == expected,
            None => true,
        })
}

fn fit_score(category: &str, item: &str, ledger: &FactLedger, knowledge: &dyn ItemKnowledge) -> f32 {
    let failed = ledger
        .confirmed_yes
        .iter()
        .filter(|f| !satisfies(category, item, &f.question, true, knowledge))
        .count()
        + ledger
            .confirmed_no
            .iter()
            .filter(|f| !satisfies(category, item, &f.question, false, knowledge))
            .count();

    (1.0 - FIT_PENALTY * failed as f32).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::StaticCatalog;

    fn fact(question: &str) -> Fact {
        Fact {
            question_number: 1,
            question: question.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_empty_ledger_keeps_everything() {
        let catalog = StaticCatalog::new();
        let space = PossibilitySpace::build("Animals", &FactLedger::default(), &catalog);
        assert_eq!(space.total_items, space.remaining_count());
        assert!(space.eliminated.is_empty());
        assert!(space.confidence_scores.iter().all(|(_, s)| *s == 1.0));
    }

    #[test]
    fn test_no_to_mammal_removes_mammals() {
        let catalog = StaticCatalog::new();
        let ledger = FactLedger {
            confirmed_no: vec![fact("Is it a mammal?")],
            ..Default::default()
        };
        let space = PossibilitySpace::build("Animals", &ledger, &catalog);
        assert!(space.eliminated.contains(&"Cat".to_string()));
        assert!(space.eliminated.contains(&"Dolphin".to_string()));
        assert!(space.remaining.contains(&"Eagle".to_string()));
    }

    #[test]
    fn test_no_to_named_item_removes_it() {
        let catalog = StaticCatalog::new();
        let ledger = FactLedger {
            confirmed_no: vec![fact("Is it a dog?")],
            ..Default::default()
        };
        let space = PossibilitySpace::build("Animals", &ledger, &catalog);
        assert_eq!(space.eliminated, vec!["Dog".to_string()]);
    }

    #[test]
    fn test_yes_facts_rank_matching_items_first() {
        let catalog = StaticCatalog::new();
        let ledger = FactLedger {
            confirmed_yes: vec![fact("Is it a mammal?"), fact("Is it commonly kept as a pet?")],
            ..Default::default()
        };
        let space = PossibilitySpace::build("Animals", &ledger, &catalog);

        assert_eq!(space.score_of("Cat"), Some(1.0));
        assert!((space.score_of("Lion").unwrap() - 0.8).abs() < 1e-6);
        assert!((space.score_of("Eagle").unwrap() - 0.6).abs() < 1e-6);
        assert_eq!(space.best_item_except(|_| false), Some("Dog"));
        assert_eq!(space.best_item_except(|item| item == "Dog"), Some("Cat"));
    }

    #[test]
    fn test_score_floors_at_zero() {
        let catalog = StaticCatalog::new();
        let ledger = FactLedger {
            confirmed_yes: (0..7).map(|_| fact("Is it a bird?")).collect(),
            ..Default::default()
        };
        let space = PossibilitySpace::build("Animals", &ledger, &catalog);
        assert_eq!(space.score_of("Cat"), Some(0.0));
    }

    #[test]
    fn test_unknown_category_is_empty() {
        let space = PossibilitySpace::build("Planets", &FactLedger::default(), &StaticCatalog::new());
        assert_eq!(space.total_items, 0);
        assert!(space.best_item_except(|_| false).is_none());
    }
}
