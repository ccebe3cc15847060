//! Question answering over a document.
//!
//! Composes the context selector, an optional inference backend and the
//! reference attributor. Backend trouble never reaches the caller; the
//! keyword-overlap fallback answers instead, with reduced confidence.

use std::cmp::Reverse;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use pagewise_shared::{Outline, QaAnswer};
use pagewise_text::{overlap, split_sentences, word_set};

use crate::attribution::attribute;
use crate::backend::InferenceBackend;
use crate::context;

/// Confidence reported for every fallback answer.
pub const FALLBACK_CONFIDENCE: f32 = 0.5;

/// Answer given when nothing in the document relates to the question.
pub const NO_ANSWER: &str = "I couldn't find a specific answer to your question in the document.";

/// Sentences joined into a fallback answer.
const FALLBACK_SENTENCES: usize = 2;

pub struct QaEngine {
    backend: Option<Arc<dyn InferenceBackend>>,
    context_budget: usize,
}

impl QaEngine {
    pub fn new(backend: Option<Arc<dyn InferenceBackend>>, context_budget: usize) -> Self {
        Self {
            backend,
            context_budget,
        }
    }

    /// Answer `question` from `full_text`, citing up to three outline headings.
    #[instrument(skip_all, fields(question_len = question.len(), text_len = full_text.len()))]
    pub fn answer_question(&self, question: &str, full_text: &str, outline: &Outline) -> QaAnswer {
        if question.trim().is_empty() || full_text.trim().is_empty() {
            debug!("empty question or document, nothing to answer");
            return QaAnswer {
                answer: NO_ANSWER.to_string(),
                confidence: 0.0,
                references: Vec::new(),
            };
        }

        let (answer, confidence) = match &self.backend {
            Some(backend) => {
                let context = context::select(question, full_text, self.context_budget);
                match backend.answer(question, &context) {
                    Ok(result) => {
                        let answer = if result.answer.trim().is_empty() {
                            NO_ANSWER.to_string()
                        } else {
                            result.answer.trim().to_string()
                        };
                        (answer, clamp_confidence(result.confidence))
                    }
                    Err(e) => {
                        warn!(error = %e, "QA backend failed, using keyword fallback");
                        (fallback_answer(question, full_text), FALLBACK_CONFIDENCE)
                    }
                }
            }
            None => (fallback_answer(question, full_text), FALLBACK_CONFIDENCE),
        };

        let references = attribute(&answer, outline).into_iter().cloned().collect();
        QaAnswer {
            answer,
            confidence,
            references,
        }
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Model-free answer: the sentences sharing the most words with the question.
///
/// Up to two overlapping sentences, best first (earlier sentences win ties),
/// joined with `". "` and closed with `"."`. Returns [`NO_ANSWER`] when no
/// sentence overlaps.
pub fn fallback_answer(question: &str, text: &str) -> String {
    let question_words = word_set(question);

    let mut scored: Vec<(usize, usize, &str)> = split_sentences(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(order, sentence)| (overlap(&question_words, &word_set(sentence)), order, sentence))
        .filter(|(score, _, _)| *score > 0)
        .collect();

    if scored.is_empty() {
        return NO_ANSWER.to_string();
    }

    scored.sort_by_key(|&(score, order, _)| (Reverse(score), order));

    let picked: Vec<String> = scored
        .iter()
        .take(FALLBACK_SENTENCES)
        .map(|(_, _, sentence)| sentence.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();

    format!("{}.", picked.join(". "))
}

#[cfg(test)]
mod tests {
    use pagewise_shared::{Heading, HeadingId, PagewiseError, Result};

    use super::*;
    use crate::backend::BackendAnswer;

    struct FailingBackend;

    impl InferenceBackend for FailingBackend {
        fn answer(&self, _question: &str, _context: &str) -> Result<BackendAnswer> {
            Err(PagewiseError::backend("model not loaded"))
        }

        fn summarize(&self, _text: &str) -> Result<String> {
            Err(PagewiseError::backend("model not loaded"))
        }
    }

    /// Answers every question with a fixed string.
    struct FixedBackend {
        answer: &'static str,
        confidence: f32,
    }

    impl InferenceBackend for FixedBackend {
        fn answer(&self, _question: &str, _context: &str) -> Result<BackendAnswer> {
            Ok(BackendAnswer {
                answer: self.answer.to_string(),
                confidence: self.confidence,
            })
        }

        fn summarize(&self, text: &str) -> Result<String> {
            Ok(text.to_string())
        }
    }

    fn heading(text: &str, position: usize) -> Heading {
        Heading {
            id: HeadingId::new(),
            text: text.into(),
            level: 1,
            page: 1,
            position,
            offset: None,
        }
    }

    #[test]
    fn fallback_finds_deadline_with_half_confidence() {
        let engine = QaEngine::new(None, 4000);
        let answer = engine.answer_question(
            "What is the deadline?",
            "The deadline is March 1. Other text.",
            &Outline::default(),
        );
        assert!(answer.answer.contains("deadline"));
        assert_eq!(answer.confidence, 0.5);
        assert!(answer.references.is_empty());
    }

    #[test]
    fn failing_backend_uses_fallback() {
        let engine = QaEngine::new(Some(Arc::new(FailingBackend)), 4000);
        let answer = engine.answer_question(
            "What is the deadline?",
            "The deadline is March 1. Other text.",
            &Outline::default(),
        );
        assert_eq!(answer.answer, "The deadline is March 1.");
        assert_eq!(answer.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn fallback_without_overlap_gives_no_answer() {
        assert_eq!(fallback_answer("zebra migration", "Cats sleep. Dogs bark."), NO_ANSWER);
    }

    #[test]
    fn fallback_takes_two_best_sentences() {
        let text = "Budgets were cut. The survey deadline moved. \
                    The survey deadline for samples is March 1. Unrelated.";
        assert_eq!(
            fallback_answer("survey deadline for samples", text),
            "The survey deadline for samples is March 1. The survey deadline moved."
        );
    }

    #[test]
    fn fallback_normalizes_whitespace() {
        assert_eq!(
            fallback_answer("deadline", "The\ndeadline   is\tsoon."),
            "The deadline is soon."
        );
    }

    #[test]
    fn backend_answer_is_attributed() {
        let outline = Outline::new(vec![
            heading("Sampling Deadline", 0),
            heading("Budget", 1),
        ]);
        let engine = QaEngine::new(
            Some(Arc::new(FixedBackend {
                answer: "before the deadline",
                confidence: 0.9,
            })),
            4000,
        );
        let answer = engine.answer_question("When?", "Samples are due before the deadline.", &outline);
        assert_eq!(answer.answer, "before the deadline");
        assert!((answer.confidence - 0.9).abs() < 1e-6);
        assert_eq!(answer.references.len(), 1);
        assert_eq!(answer.references[0].text, "Sampling Deadline");
    }

    #[test]
    fn backend_confidence_is_clamped() {
        let engine = QaEngine::new(
            Some(Arc::new(FixedBackend {
                answer: "yes",
                confidence: 7.5,
            })),
            4000,
        );
        let answer = engine.answer_question("Is it?", "It is.", &Outline::default());
        assert_eq!(answer.confidence, 1.0);
    }

    #[test]
    fn empty_backend_answer_becomes_no_answer() {
        let engine = QaEngine::new(
            Some(Arc::new(FixedBackend {
                answer: "  ",
                confidence: 0.1,
            })),
            4000,
        );
        let answer = engine.answer_question("Is it?", "It is.", &Outline::default());
        assert_eq!(answer.answer, NO_ANSWER);
    }

    #[test]
    fn empty_question_has_zero_confidence() {
        let engine = QaEngine::new(None, 4000);
        let answer = engine.answer_question("   ", "Some text.", &Outline::default());
        assert_eq!(answer.answer, NO_ANSWER);
        assert_eq!(answer.confidence, 0.0);
        assert!(answer.references.is_empty());
    }

    #[test]
    fn fallback_references_come_from_the_answer() {
        let outline = Outline::new(vec![
            heading("Deadline", 0),
            heading("Methods", 1),
        ]);
        let engine = QaEngine::new(None, 4000);
        let answer = engine.answer_question(
            "When is the deadline?",
            "The deadline is March 1. Methods are described later.",
            &outline,
        );
        assert_eq!(answer.references.len(), 1);
        assert_eq!(answer.references[0].text, "Deadline");
    }
}
