//! Loaded linear model backends and the inference strategy chain.
//!
//! The artifact shape is resolved once at load time into a `ModelBackend`
//! variant together with the ordered list of strategies to try. Each
//! strategy returns a `Result`; the first success wins and every failure
//! is kept for diagnostics.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ClassifierError, StrategyFailure};
use super::linear::{CountVectorizer, LogisticModel, ModelInput};
use super::{Classifier, WeightedClassifier};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// How raw symptom text reaches the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceStrategy {
    /// Hand the joined text straight to the estimator.
    DirectText,
    /// Vectorize with the standalone vectorizer, then classify features.
    Vectorized,
}

/// Text pipeline: vectorizer and classifier fused, accepts raw text.
#[derive(Debug, Clone)]
pub struct TextPipeline {
    vectorizer: CountVectorizer,
    classifier: LogisticModel,
}

impl TextPipeline {
    pub fn new(vectorizer: CountVectorizer, classifier: LogisticModel) -> Result<Self, ClassifierError> {
        check_alignment(&vectorizer, &classifier)?;
        Ok(Self {
            vectorizer,
            classifier,
        })
    }

    pub fn predict_proba(&self, input: &ModelInput<'_>) -> Result<Vec<f64>, ClassifierError> {
        match input {
            ModelInput::Text(text) => self
                .classifier
                .predict_proba_features(self.vectorizer.transform(text).view()),
            ModelInput::Features(_) => Err(ClassifierError::InputRejected(
                "pipeline expects raw text".into(),
            )),
        }
    }
}

/// Loaded model, one variant per supported artifact shape.
#[derive(Debug, Clone)]
pub enum ModelBackend {
    /// Unified pipeline that accepts raw text.
    TextPipeline(TextPipeline),
    /// Separate vectorizer + classifier; text must be vectorized first.
    VectorizerPair {
        vectorizer: CountVectorizer,
        classifier: LogisticModel,
    },
}

impl ModelBackend {
    pub fn vectorizer_pair(
        vectorizer: CountVectorizer,
        classifier: LogisticModel,
    ) -> Result<Self, ClassifierError> {
        check_alignment(&vectorizer, &classifier)?;
        Ok(Self::VectorizerPair {
            vectorizer,
            classifier,
        })
    }

    /// Strategies in the order they are tried.
    pub fn strategies(&self) -> Vec<InferenceStrategy> {
        match self {
            Self::TextPipeline(_) => vec![InferenceStrategy::DirectText],
            Self::VectorizerPair { .. } => {
                vec![InferenceStrategy::DirectText, InferenceStrategy::Vectorized]
            }
        }
    }

    fn classifier(&self) -> &LogisticModel {
        match self {
            Self::TextPipeline(p) => &p.classifier,
            Self::VectorizerPair { classifier, .. } => classifier,
        }
    }

    fn vectorizer(&self) -> &CountVectorizer {
        match self {
            Self::TextPipeline(p) => &p.vectorizer,
            Self::VectorizerPair { vectorizer, .. } => vectorizer,
        }
    }

    fn run(&self, strategy: InferenceStrategy, text: &str) -> Result<Vec<f64>, ClassifierError> {
        match (strategy, self) {
            (InferenceStrategy::DirectText, Self::TextPipeline(p)) => {
                p.predict_proba(&ModelInput::Text(text))
            }
            (InferenceStrategy::DirectText, Self::VectorizerPair { classifier, .. }) => {
                classifier.predict_proba(&ModelInput::Text(text))
            }
            (InferenceStrategy::Vectorized, Self::VectorizerPair { vectorizer, classifier }) => {
                classifier.predict_proba(&ModelInput::Features(vectorizer.transform(text)))
            }
            (InferenceStrategy::Vectorized, Self::TextPipeline(_)) => Err(
                ClassifierError::InputRejected("no standalone vectorizer loaded".into()),
            ),
        }
    }
}

fn check_alignment(
    vectorizer: &CountVectorizer,
    classifier: &LogisticModel,
) -> Result<(), ClassifierError> {
    if vectorizer.len() != classifier.n_features() {
        return Err(ClassifierError::ShapeMismatch {
            expected: classifier.n_features(),
            actual: vectorizer.len(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// LinearClassifier
// ═══════════════════════════════════════════════════════════

/// `Classifier` over a loaded linear backend.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    backend: ModelBackend,
    strategies: Vec<InferenceStrategy>,
}

impl LinearClassifier {
    pub fn new(backend: ModelBackend) -> Self {
        let strategies = backend.strategies();
        Self {
            backend,
            strategies,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_strategies(backend: ModelBackend, strategies: Vec<InferenceStrategy>) -> Self {
        Self {
            backend,
            strategies,
        }
    }

    pub fn backend(&self) -> &ModelBackend {
        &self.backend
    }

    pub fn strategies(&self) -> &[InferenceStrategy] {
        &self.strategies
    }

    /// Load a model artifact from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        if !path.exists() {
            return Err(ClassifierError::ArtifactNotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ClassifierError::ArtifactLoad(path.display().to_string(), e.to_string()))?;
        let classifier = Self::from_json(&raw)?;

        tracing::info!(
            path = %path.display(),
            labels = classifier.labels().len(),
            vocabulary = classifier.backend.vectorizer().len(),
            strategies = ?classifier.strategies,
            "Classifier loaded"
        );
        Ok(classifier)
    }

    pub fn from_json(raw: &str) -> Result<Self, ClassifierError> {
        let artifact: ModelArtifact =
            serde_json::from_str(raw).map_err(|e| ClassifierError::ArtifactParse(e.to_string()))?;
        artifact.into_backend().map(Self::new)
    }
}

impl Classifier for LinearClassifier {
    fn labels(&self) -> &[String] {
        self.backend.classifier().classes()
    }

    fn predict_proba(&self, text: &str) -> Result<Vec<f64>, ClassifierError> {
        let mut failures = Vec::new();
        for &strategy in &self.strategies {
            match self.backend.run(strategy, text) {
                Ok(probs) => return Ok(probs),
                Err(e) => {
                    tracing::debug!(?strategy, error = %e, "Inference strategy failed, trying next");
                    failures.push(StrategyFailure {
                        strategy,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Err(ClassifierError::AllStrategiesFailed(failures))
    }

    fn weighted(&self) -> Option<&dyn WeightedClassifier> {
        Some(self)
    }
}

impl WeightedClassifier for LinearClassifier {
    fn vocabulary(&self) -> &[String] {
        self.backend.vectorizer().vocabulary()
    }

    fn label_weights(&self, label: &str) -> Result<Vec<f64>, ClassifierError> {
        let classifier = self.backend.classifier();
        let idx = classifier
            .classes()
            .iter()
            .position(|c| c == label)
            .ok_or_else(|| ClassifierError::UnknownLabel(label.to_string()))?;
        classifier.class_weights(idx)
    }
}

// ═══════════════════════════════════════════════════════════
// Artifact format
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct VectorizerArtifact {
    vocabulary: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LogisticArtifact {
    classes: Vec<String>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ModelArtifact {
    TextPipeline {
        vectorizer: VectorizerArtifact,
        classifier: LogisticArtifact,
    },
    VectorizerPair {
        vectorizer: VectorizerArtifact,
        classifier: LogisticArtifact,
    },
}

impl ModelArtifact {
    fn into_backend(self) -> Result<ModelBackend, ClassifierError> {
        match self {
            Self::TextPipeline {
                vectorizer,
                classifier,
            } => {
                let (v, c) = build_parts(vectorizer, classifier)?;
                Ok(ModelBackend::TextPipeline(TextPipeline::new(v, c)?))
            }
            Self::VectorizerPair {
                vectorizer,
                classifier,
            } => {
                let (v, c) = build_parts(vectorizer, classifier)?;
                ModelBackend::vectorizer_pair(v, c)
            }
        }
    }
}

fn build_parts(
    vectorizer: VectorizerArtifact,
    classifier: LogisticArtifact,
) -> Result<(CountVectorizer, LogisticModel), ClassifierError> {
    let v = CountVectorizer::new(vectorizer.vocabulary)?;
    let c = LogisticModel::from_rows(classifier.classes, classifier.coef, classifier.intercept)?;
    Ok((v, c))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const PIPELINE_JSON: &str = r#"{
        "kind": "text_pipeline",
        "vectorizer": {"vocabulary": ["cough", "fever", "headache", "nausea", "light_sensitivity"]},
        "classifier": {
            "classes": ["Flu", "Migraine", "Gastritis"],
            "coef": [
                [2.0, 2.0, 0.0, -1.0, -0.5],
                [-1.0, 0.0, 3.0, 1.0, 2.0],
                [0.0, -0.5, -1.0, 3.0, -1.0]
            ],
            "intercept": [0.0, 0.0, 0.0]
        }
    }"#;

    fn pair_json() -> String {
        PIPELINE_JSON.replace("text_pipeline", "vectorizer_pair")
    }

    #[test]
    fn pipeline_predicts_from_text() {
        let clf = LinearClassifier::from_json(PIPELINE_JSON).unwrap();
        assert_eq!(clf.strategies(), &[InferenceStrategy::DirectText]);

        let probs = clf.predict_proba("fever cough").unwrap();
        assert_eq!(probs.len(), 3);
        assert!(probs[0] > 0.9, "Flu should dominate, got {probs:?}");
    }

    #[test]
    fn pair_falls_back_to_vectorized() {
        let pair = LinearClassifier::from_json(&pair_json()).unwrap();
        assert_eq!(
            pair.strategies(),
            &[InferenceStrategy::DirectText, InferenceStrategy::Vectorized]
        );

        let pipeline = LinearClassifier::from_json(PIPELINE_JSON).unwrap();
        let a = pair.predict_proba("headache light_sensitivity").unwrap();
        let b = pipeline.predict_proba("headache light_sensitivity").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn exhausted_strategies_report_every_failure() {
        let pair = LinearClassifier::from_json(&pair_json()).unwrap();
        let crippled =
            LinearClassifier::with_strategies(pair.backend().clone(), vec![InferenceStrategy::DirectText]);

        match crippled.predict_proba("fever").unwrap_err() {
            ClassifierError::AllStrategiesFailed(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].strategy, InferenceStrategy::DirectText);
                assert!(failures[0].reason.contains("Input rejected"));
            }
            other => panic!("Expected AllStrategiesFailed, got: {other}"),
        }
    }

    #[test]
    fn weights_follow_label() {
        let clf = LinearClassifier::from_json(PIPELINE_JSON).unwrap();
        let weighted = clf.weighted().unwrap();
        assert_eq!(weighted.vocabulary().len(), 5);
        assert_eq!(
            weighted.label_weights("Migraine").unwrap(),
            vec![-1.0, 0.0, 3.0, 1.0, 2.0]
        );
        assert!(matches!(
            weighted.label_weights("Plague"),
            Err(ClassifierError::UnknownLabel(_))
        ));
    }

    #[test]
    fn vocabulary_must_match_coefficients() {
        let bad = PIPELINE_JSON.replace(r#", "light_sensitivity""#, "");
        let err = LinearClassifier::from_json(&bad).unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::ShapeMismatch {
                expected: 5,
                actual: 4
            }
        ));
    }

    #[test]
    fn unknown_kind_is_parse_error() {
        let bad = PIPELINE_JSON.replace("text_pipeline", "random_forest");
        assert!(matches!(
            LinearClassifier::from_json(&bad),
            Err(ClassifierError::ArtifactParse(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, PIPELINE_JSON).unwrap();
        let clf = LinearClassifier::load(&path).unwrap();
        assert_eq!(clf.labels(), &["Flu", "Migraine", "Gastritis"]);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LinearClassifier::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ClassifierError::ArtifactNotFound(_)));
    }
}
