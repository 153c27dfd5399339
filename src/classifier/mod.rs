//! Disease classifier capability and its linear backends.
//!
//! Two traits define the seam between the triage core and whatever model
//! is loaded:
//! - `Classifier`: label vocabulary + class probabilities for a bag of terms
//! - `WeightedClassifier`: optional per-label linear term weights, used to
//!   pick informative follow-up questions
//!
//! `SymptomPredictor` wraps an optional classifier and owns the degraded-mode
//! contract (sentinel when no model, empty ranking when inference fails).

pub mod backend;
pub mod error;
pub mod linear;
pub mod predictor;

pub use backend::{InferenceStrategy, LinearClassifier, ModelBackend};
pub use error::{ClassifierError, StrategyFailure};
pub use linear::{CountVectorizer, LogisticModel, ModelInput};
pub use predictor::{DiseaseCandidate, SymptomPredictor, MODEL_NOT_LOADED_LABEL};

/// Opaque disease classifier. Inference is a pure function of its input.
pub trait Classifier: Send + Sync {
    /// Label vocabulary fixed at training time, aligned with `predict_proba`.
    fn labels(&self) -> &[String];

    /// Class probabilities for a space-joined bag of symptom terms.
    fn predict_proba(&self, text: &str) -> Result<Vec<f64>, ClassifierError>;

    /// Linear term weights, when this model exposes them.
    fn weighted(&self) -> Option<&dyn WeightedClassifier> {
        None
    }
}

/// Per-label linear term weights over a fixed vocabulary.
pub trait WeightedClassifier: Send + Sync {
    fn vocabulary(&self) -> &[String];

    /// Weight of every vocabulary term for `label`, aligned with `vocabulary()`.
    fn label_weights(&self, label: &str) -> Result<Vec<f64>, ClassifierError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traits_are_object_safe() {
        fn _assert_classifier(_: &dyn Classifier) {}
        fn _assert_weighted(_: &dyn WeightedClassifier) {}
    }
}
