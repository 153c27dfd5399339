//! Bag-of-words vectorizer and logistic regression, the model family the
//! triage service is trained with.

use std::collections::HashMap;
use std::sync::LazyLock;

use ndarray::{Array1, Array2, ArrayView1};
use regex::Regex;

use super::error::ClassifierError;

/// Tokens of two or more word characters, like the training vectorizer.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("Invalid token pattern"));

/// What an estimator is handed: raw text or an already-vectorized bag.
#[derive(Debug, Clone)]
pub enum ModelInput<'a> {
    Text(&'a str),
    Features(Array1<f64>),
}

// ═══════════════════════════════════════════════════════════
// CountVectorizer
// ═══════════════════════════════════════════════════════════

/// Term-count vectorizer over a fixed vocabulary.
#[derive(Debug, Clone)]
pub struct CountVectorizer {
    vocabulary: Vec<String>,
    index: HashMap<String, usize>,
}

impl CountVectorizer {
    pub fn new(vocabulary: Vec<String>) -> Result<Self, ClassifierError> {
        let mut index = HashMap::with_capacity(vocabulary.len());
        for (i, term) in vocabulary.iter().enumerate() {
            if index.insert(term.to_lowercase(), i).is_some() {
                return Err(ClassifierError::InvalidArtifact(format!(
                    "duplicate vocabulary term '{term}'"
                )));
            }
        }
        Ok(Self { vocabulary, index })
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    /// Count vocabulary hits in `text`. Out-of-vocabulary tokens are ignored.
    pub fn transform(&self, text: &str) -> Array1<f64> {
        let lower = text.to_lowercase();
        let mut counts = Array1::<f64>::zeros(self.vocabulary.len());
        for token in TOKEN_PATTERN.find_iter(&lower) {
            if let Some(&i) = self.index.get(token.as_str()) {
                counts[i] += 1.0;
            }
        }
        counts
    }
}

// ═══════════════════════════════════════════════════════════
// LogisticModel
// ═══════════════════════════════════════════════════════════

/// Linear classifier over count features.
///
/// `coef` is `n_classes × n_features`, or `1 × n_features` for a two-class
/// model where the single row scores the second class.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    classes: Vec<String>,
    coef: Array2<f64>,
    intercept: Array1<f64>,
}

impl LogisticModel {
    pub fn new(
        classes: Vec<String>,
        coef: Array2<f64>,
        intercept: Array1<f64>,
    ) -> Result<Self, ClassifierError> {
        if classes.len() < 2 {
            return Err(ClassifierError::InvalidArtifact(
                "classifier needs at least two classes".into(),
            ));
        }
        let binary = classes.len() == 2 && coef.nrows() == 1;
        if !binary && coef.nrows() != classes.len() {
            return Err(ClassifierError::InvalidArtifact(format!(
                "{} coefficient rows for {} classes",
                coef.nrows(),
                classes.len()
            )));
        }
        if intercept.len() != coef.nrows() {
            return Err(ClassifierError::ShapeMismatch {
                expected: coef.nrows(),
                actual: intercept.len(),
            });
        }
        Ok(Self {
            classes,
            coef,
            intercept,
        })
    }

    /// Build from nested rows as stored in an artifact.
    pub fn from_rows(
        classes: Vec<String>,
        rows: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    ) -> Result<Self, ClassifierError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().find(|r| r.len() != n_cols) {
            return Err(ClassifierError::ShapeMismatch {
                expected: n_cols,
                actual: bad.len(),
            });
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let coef = Array2::from_shape_vec((n_rows, n_cols), flat)
            .map_err(|e| ClassifierError::InvalidArtifact(e.to_string()))?;
        Self::new(classes, coef, Array1::from(intercept))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.coef.ncols()
    }

    fn is_binary(&self) -> bool {
        self.coef.nrows() == 1
    }

    /// Class probabilities. Only feature vectors are accepted.
    pub fn predict_proba(&self, input: &ModelInput<'_>) -> Result<Vec<f64>, ClassifierError> {
        match input {
            ModelInput::Features(x) => self.predict_proba_features(x.view()),
            ModelInput::Text(_) => Err(ClassifierError::InputRejected(
                "classifier expects a feature vector, got raw text".into(),
            )),
        }
    }

    pub fn predict_proba_features(&self, x: ArrayView1<'_, f64>) -> Result<Vec<f64>, ClassifierError> {
        if x.len() != self.n_features() {
            return Err(ClassifierError::ShapeMismatch {
                expected: self.n_features(),
                actual: x.len(),
            });
        }

        let scores = self.coef.dot(&x) + &self.intercept;
        let probs = if self.is_binary() {
            let p = sigmoid(scores[0]);
            vec![1.0 - p, p]
        } else {
            softmax(scores.view())
        };

        if probs.iter().any(|p| !p.is_finite()) {
            return Err(ClassifierError::Inference("non-finite probability".into()));
        }
        Ok(probs)
    }

    /// Term weights pushing toward `class_idx`.
    ///
    /// For the single-row binary shape the row favours the second class,
    /// so the first class gets the negated row.
    pub fn class_weights(&self, class_idx: usize) -> Result<Vec<f64>, ClassifierError> {
        if class_idx >= self.classes.len() {
            return Err(ClassifierError::UnknownLabel(format!("class index {class_idx}")));
        }
        if self.is_binary() {
            let row = self.coef.row(0);
            return Ok(if class_idx == 1 {
                row.to_vec()
            } else {
                row.iter().map(|w| -w).collect()
            });
        }
        Ok(self.coef.row(class_idx).to_vec())
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(scores: ArrayView1<'_, f64>) -> Vec<f64> {
    let max = scores.fold(f64::NEG_INFINITY, |m, &s| m.max(s));
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
