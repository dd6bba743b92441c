//! Consistency/Accuracy Validator
//!
//! Monitoring only: findings are logged and returned, the answer always
//! stands. A contradiction that follows a web search this turn is treated
//! as a deliberate correction and logged at info level.

use super::facts::{classify_answer, Fact, FactLedger, Polarity};
use super::similarity::{relation, Relation};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contradiction {
    pub question_number: u32,
    pub earlier_question: String,
    pub earlier_polarity: Polarity,
    /// True when the questions are antonyms rather than the same question
    pub antonym: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsistencyReport {
    pub contradictions: Vec<Contradiction>,
    pub search_performed: bool,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.contradictions.is_empty()
    }
}

/// Compare one question/answer pair against the confirmed facts.
pub fn check_answer(
    question: &str,
    answer: &str,
    ledger: &FactLedger,
    search_performed: bool,
) -> ConsistencyReport {
    let mut report = ConsistencyReport {
        search_performed,
        ..Default::default()
    };

    let current = classify_answer(answer);
    if current == Polarity::Uncertain {
        return report;
    }

    let prior = ledger
        .confirmed_yes
        .iter()
        .map(|f| (f, Polarity::Affirmative))
        .chain(ledger.confirmed_no.iter().map(|f| (f, Polarity::Negative)));

    for (fact, polarity) in prior {
        if let Some(contradiction) = conflict(question, current, fact, polarity) {
            report.contradictions.push(contradiction);
        }
    }

    for c in &report.contradictions {
        if search_performed {
            tracing::info!(
                "[ConsistencyValidator] Answer '{}' to '{}' corrects Q{} '{}' after web search",
                answer,
                question,
                c.question_number,
                c.earlier_question
            );
        } else {
            tracing::warn!(
                "[ConsistencyValidator] Possible contradiction: '{}' -> '{}' conflicts with Q{} '{}' ({:?})",
                question,
                answer,
                c.question_number,
                c.earlier_question,
                c.earlier_polarity
            );
        }
    }

    report
}

fn conflict(question: &str, current: Polarity, fact: &Fact, earlier: Polarity) -> Option<Contradiction> {
    let antonym = match relation(question, &fact.question)? {
        Relation::Same if current != earlier => false,
        Relation::Opposite if current == earlier => true,
        _ => return None,
    };
    Some(Contradiction {
        question_number: fact.question_number,
        earlier_question: fact.question.clone(),
        earlier_polarity: earlier,
        antonym,
    })
}
