use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::classifier::DiseaseCandidate;
use crate::disposition::Disposition;
use crate::knowledge::CanonicalSymptom;
use crate::red_flags::RedFlagAlert;
use crate::session_store::SessionId;

/// Top label reported when no candidate survives ranking.
pub const UNKNOWN_DISEASE: &str = "Unknown";

// ═══════════════════════════════════════════════════════════
// Requests
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub text: String,
    #[serde(default)]
    pub confirmed_symptoms: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerQuestionRequest {
    pub session_id: SessionId,
    pub symptom: String,
    pub answer: bool,
}

// ═══════════════════════════════════════════════════════════
// Responses
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: SessionId,
    pub extracted_symptoms: BTreeSet<CanonicalSymptom>,
    pub candidate_diseases: Vec<DiseaseCandidate>,
    pub top_disease: String,
    pub top_confidence: f64,
    pub next_questions: Vec<CanonicalSymptom>,
    pub red_flags: Vec<RedFlagAlert>,
    pub advice: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerQuestionResponse {
    pub extracted_symptoms: BTreeSet<CanonicalSymptom>,
    pub candidate_diseases: Vec<DiseaseCandidate>,
    pub top_disease: String,
    pub top_confidence: f64,
    pub next_questions: Vec<CanonicalSymptom>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub removed: usize,
    pub remaining: usize,
}

/// Caller-side recommendation for a live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub session_id: SessionId,
    pub candidate_diseases: Vec<DiseaseCandidate>,
    pub red_flags: Vec<RedFlagAlert>,
    #[serde(flatten)]
    pub disposition: Disposition,
}

/// Top label and confidence of a ranking, `("Unknown", 0.0)` when empty.
pub(crate) fn top_of(candidates: &[DiseaseCandidate]) -> (String, f64) {
    candidates
        .first()
        .map(|c| (c.label.clone(), c.confidence))
        .unwrap_or_else(|| (UNKNOWN_DISEASE.to_string(), 0.0))
}
