//! Follow-up question selection from per-label term weights.

use std::collections::BTreeSet;

use crate::classifier::{Classifier, ClassifierError};
use crate::knowledge::CanonicalSymptom;

/// Picks the vocabulary terms that most strongly support a label and are
/// not yet known.
pub struct QuestionSelector;

impl QuestionSelector {
    /// Up to `max_questions` terms with strictly positive weight for
    /// `top_label`, strongest first.
    ///
    /// Any failure (no weights exposed, unknown label, bad shape) is logged
    /// and yields an empty list.
    pub fn next_questions(
        classifier: &dyn Classifier,
        top_label: &str,
        already_known: &BTreeSet<CanonicalSymptom>,
        max_questions: usize,
    ) -> Vec<CanonicalSymptom> {
        match Self::try_next_questions(classifier, top_label, already_known, max_questions) {
            Ok(questions) => questions,
            Err(e) => {
                tracing::warn!(label = %top_label, error = %e, "Question generation degraded");
                Vec::new()
            }
        }
    }

    fn try_next_questions(
        classifier: &dyn Classifier,
        top_label: &str,
        already_known: &BTreeSet<CanonicalSymptom>,
        max_questions: usize,
    ) -> Result<Vec<CanonicalSymptom>, ClassifierError> {
        let weighted = classifier
            .weighted()
            .ok_or(ClassifierError::WeightsUnavailable)?;
        let vocabulary = weighted.vocabulary();
        let weights = weighted.label_weights(top_label)?;
        if weights.len() != vocabulary.len() {
            return Err(ClassifierError::ShapeMismatch {
                expected: vocabulary.len(),
                actual: weights.len(),
            });
        }

        let mut ranked: Vec<(&String, f64)> = vocabulary.iter().zip(weights).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(ranked
            .into_iter()
            .filter(|(term, _)| !already_known.contains(term.as_str()))
            .take_while(|(_, weight)| *weight > 0.0)
            .take(max_questions)
            .map(|(term, _)| term.clone())
            .collect())
    }
}
