use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::backend::LinearClassifier;
use super::Classifier;
use crate::config::MIN_CONFIDENCE;
use crate::knowledge::CanonicalSymptom;

/// Placeholder label returned when no model is loaded.
pub const MODEL_NOT_LOADED_LABEL: &str = "System Error: Model not loaded";

/// One ranked diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseCandidate {
    pub label: String,
    pub confidence: f64,
}

/// Ranks disease labels for a symptom set.
///
/// Holds at most one classifier. Without one, every prediction yields the
/// single sentinel candidate so callers can tell "no model" from "no match".
#[derive(Clone)]
pub struct SymptomPredictor {
    classifier: Option<Arc<dyn Classifier>>,
    min_confidence: f64,
}

impl SymptomPredictor {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier: Some(classifier),
            min_confidence: MIN_CONFIDENCE,
        }
    }

    /// Predictor with no model. Every call returns the sentinel.
    pub fn unavailable() -> Self {
        Self {
            classifier: None,
            min_confidence: MIN_CONFIDENCE,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Load the artifact at `path`. A missing or broken artifact is logged
    /// and leaves the predictor unavailable rather than failing startup.
    pub fn load(path: &Path) -> Self {
        match LinearClassifier::load(path) {
            Ok(classifier) => Self::new(Arc::new(classifier)),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Model unavailable, predictions degraded");
                Self::unavailable()
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn classifier(&self) -> Option<&dyn Classifier> {
        self.classifier.as_deref()
    }

    /// Up to `top_k` candidates, descending confidence, each at least
    /// `min_confidence`. Ties keep label order. Inference failure yields an
    /// empty ranking.
    pub fn predict(&self, symptoms: &BTreeSet<CanonicalSymptom>, top_k: usize) -> Vec<DiseaseCandidate> {
        let Some(classifier) = self.classifier.as_deref() else {
            return vec![DiseaseCandidate {
                label: MODEL_NOT_LOADED_LABEL.to_string(),
                confidence: 0.0,
            }];
        };

        let text = symptoms.iter().map(String::as_str).collect::<Vec<_>>().join(" ");
        let probs = match classifier.predict_proba(&text) {
            Ok(probs) => probs,
            Err(e) => {
                tracing::error!(error = %e, "Prediction failed");
                return Vec::new();
            }
        };

        let labels = classifier.labels();
        if probs.len() != labels.len() {
            tracing::error!(
                labels = labels.len(),
                probabilities = probs.len(),
                "Probability vector does not match label set"
            );
            return Vec::new();
        }

        let mut ranked: Vec<DiseaseCandidate> = labels
            .iter()
            .zip(probs)
            .filter(|(_, p)| *p >= self.min_confidence)
            .map(|(label, confidence)| DiseaseCandidate {
                label: label.clone(),
                confidence,
            })
            .collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked.truncate(top_k);

        tracing::debug!(symptoms = symptoms.len(), candidates = ranked.len(), "Prediction complete");
        ranked
    }
}

impl std::fmt::Debug for SymptomPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymptomPredictor")
            .field("loaded", &self.is_loaded())
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::classifier::ClassifierError;

    /// Classifier returning fixed probabilities regardless of input.
    pub(crate) struct FixedClassifier {
        pub labels: Vec<String>,
        pub probs: Result<Vec<f64>, String>,
    }

    impl FixedClassifier {
        pub(crate) fn new(pairs: &[(&str, f64)]) -> Self {
            Self {
                labels: pairs.iter().map(|(l, _)| l.to_string()).collect(),
                probs: Ok(pairs.iter().map(|(_, p)| *p).collect()),
            }
        }
    }

    impl Classifier for FixedClassifier {
        fn labels(&self) -> &[String] {
            &self.labels
        }

        fn predict_proba(&self, _text: &str) -> Result<Vec<f64>, ClassifierError> {
            self.probs.clone().map_err(ClassifierError::Inference)
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ranks_descending_and_truncates() {
        let predictor = SymptomPredictor::new(Arc::new(FixedClassifier::new(&[
            ("Cold", 0.2),
            ("Flu", 0.7),
            ("Migraine", 0.05),
            ("Gastritis", 0.05),
        ])));
        let ranked = predictor.predict(&set(&["fever"]), 3);
        let labels: Vec<&str> = ranked.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Flu", "Cold", "Migraine"]);
    }

    #[test]
    fn drops_low_confidence_labels() {
        let predictor = SymptomPredictor::new(Arc::new(FixedClassifier::new(&[
            ("Flu", 0.995),
            ("Cold", 0.005),
        ])));
        let ranked = predictor.predict(&set(&["fever"]), 3);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].label, "Flu");
    }

    #[test]
    fn confidence_floor_is_inclusive() {
        let predictor = SymptomPredictor::new(Arc::new(FixedClassifier::new(&[
            ("Flu", 0.9801),
            ("Cold", 0.01),
            ("Gastritis", 0.0099),
        ])));
        let ranked = predictor.predict(&set(&["fever"]), 3);
        let labels: Vec<&str> = ranked.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["Flu", "Cold"]);
    }

    #[test]
    fn missing_model_returns_sentinel() {
        let ranked = SymptomPredictor::unavailable().predict(&set(&["cough"]), 3);
        assert_eq!(
            ranked,
            vec![DiseaseCandidate {
                label: MODEL_NOT_LOADED_LABEL.into(),
                confidence: 0.0
            }]
        );
    }

    #[test]
    fn inference_failure_yields_empty() {
        let predictor = SymptomPredictor::new(Arc::new(FixedClassifier {
            labels: vec!["Flu".into()],
            probs: Err("boom".into()),
        }));
        assert!(predictor.predict(&set(&["fever"]), 3).is_empty());
    }

    #[test]
    fn length_mismatch_yields_empty() {
        let predictor = SymptomPredictor::new(Arc::new(FixedClassifier {
            labels: vec!["Flu".into(), "Cold".into()],
            probs: Ok(vec![1.0]),
        }));
        assert!(predictor.predict(&set(&["fever"]), 3).is_empty());
    }

    #[test]
    fn load_degrades_on_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = SymptomPredictor::load(&dir.path().join("nope.json"));
        assert!(!predictor.is_loaded());
        assert_eq!(predictor.predict(&BTreeSet::new(), 3)[0].label, MODEL_NOT_LOADED_LABEL);
    }

    #[test]
    fn loaded_linear_model_ranks_flu_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, crate::classifier::backend::tests::PIPELINE_JSON).unwrap();

        let predictor = SymptomPredictor::load(&path);
        assert!(predictor.is_loaded());
        let ranked = predictor.predict(&set(&["cough", "fever"]), 3);
        assert_eq!(ranked[0].label, "Flu");
        assert!(ranked.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }
}
