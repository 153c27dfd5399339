//! Caller-side disposition: turn the triage core's output into a
//! "keep asking" or "stop here" recommendation.
//!
//! The core never ends a session on its own. This is an advisory policy a
//! front end can apply after each turn.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::classifier::DiseaseCandidate;
use crate::knowledge::CanonicalSymptom;
use crate::red_flags::RedFlagAlert;

/// Top-candidate confidence at which questioning stops.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Answered questions after which questioning stops.
pub const DEFAULT_POLICY_MAX_QUESTIONS: usize = 10;

// ═══════════════════════════════════════════════════════════
// Follow-up prompt
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    YesNo,
}

/// A follow-up question rendered for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub symptom_id: CanonicalSymptom,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
}

impl FollowUpQuestion {
    pub fn yes_no(symptom: &str) -> Self {
        Self {
            symptom_id: symptom.to_string(),
            text: format!("Do you also experience {}?", symptom.replace('_', " ")),
            kind: QuestionKind::YesNo,
            options: vec!["Yes".into(), "No".into()],
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Disposition
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriageLevel {
    Emergency,
    #[serde(rename = "Consultation Recommended")]
    ConsultationRecommended,
    #[serde(rename = "Self Care")]
    SelfCare,
}

impl TriageLevel {
    pub fn advice(self) -> &'static str {
        match self {
            Self::Emergency => "Critical symptoms detected. Seek immediate medical attention.",
            Self::ConsultationRecommended => "Based on your symptoms, we recommend a consultation.",
            Self::SelfCare => "No specific condition identified. Monitor your symptoms.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Emergency,
    ConfidenceThreshold,
    MaxQuestions,
    NoMoreQuestions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Disposition {
    Continue {
        next_question: FollowUpQuestion,
    },
    Complete {
        stop_reason: StopReason,
        triage_level: TriageLevel,
        advice: String,
    },
}

impl Disposition {
    fn complete(stop_reason: StopReason, triage_level: TriageLevel) -> Self {
        Self::Complete {
            stop_reason,
            triage_level,
            advice: triage_level.advice().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Stop conditions, checked in order: red flag, confident top candidate or
/// question budget spent, no unasked question left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispositionPolicy {
    pub confidence_threshold: f64,
    pub max_questions: usize,
}

impl Default for DispositionPolicy {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_questions: DEFAULT_POLICY_MAX_QUESTIONS,
        }
    }
}

impl DispositionPolicy {
    pub fn assess(
        &self,
        candidates: &[DiseaseCandidate],
        red_flags: &[RedFlagAlert],
        next_questions: &[CanonicalSymptom],
        asked: &BTreeSet<CanonicalSymptom>,
    ) -> Disposition {
        if !red_flags.is_empty() {
            return Disposition::complete(StopReason::Emergency, TriageLevel::Emergency);
        }

        let confident = candidates
            .first()
            .is_some_and(|top| top.confidence >= self.confidence_threshold);
        if confident {
            return Disposition::complete(
                StopReason::ConfidenceThreshold,
                TriageLevel::ConsultationRecommended,
            );
        }
        if asked.len() >= self.max_questions {
            return Disposition::complete(StopReason::MaxQuestions, TriageLevel::ConsultationRecommended);
        }

        match next_questions.iter().find(|s| !asked.contains(*s)) {
            Some(symptom) => Disposition::Continue {
                next_question: FollowUpQuestion::yes_no(symptom),
            },
            None => Disposition::complete(StopReason::NoMoreQuestions, TriageLevel::SelfCare),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(label: &str, confidence: f64) -> DiseaseCandidate {
        DiseaseCandidate {
            label: label.into(),
            confidence,
        }
    }

    fn terms(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn question_text_replaces_underscores() {
        let q = FollowUpQuestion::yes_no("light_sensitivity");
        assert_eq!(q.text, "Do you also experience light sensitivity?");
        assert_eq!(q.symptom_id, "light_sensitivity");
        assert_eq!(q.options, vec!["Yes", "No"]);
    }

    #[test]
    fn red_flag_wins() {
        let alert = RedFlagAlert {
            symptom: "chest pain".into(),
            action: "call emergency".into(),
        };
        let d = DispositionPolicy::default().assess(
            &[candidate("Flu", 0.95)],
            &[alert],
            &terms(&["cough"]),
            &BTreeSet::new(),
        );
        assert!(matches!(
            d,
            Disposition::Complete {
                stop_reason: StopReason::Emergency,
                triage_level: TriageLevel::Emergency,
                ..
            }
        ));
    }

    #[test]
    fn confident_top_candidate_stops() {
        let d = DispositionPolicy::default().assess(
            &[candidate("Flu", 0.8)],
            &[],
            &terms(&["cough"]),
            &BTreeSet::new(),
        );
        assert!(matches!(
            d,
            Disposition::Complete {
                stop_reason: StopReason::ConfidenceThreshold,
                ..
            }
        ));
    }

    #[test]
    fn question_budget_stops() {
        let policy = DispositionPolicy {
            max_questions: 2,
            ..Default::default()
        };
        let asked: BTreeSet<String> = terms(&["a", "b"]).into_iter().collect();
        let d = policy.assess(&[candidate("Flu", 0.4)], &[], &terms(&["cough"]), &asked);
        assert!(matches!(
            d,
            Disposition::Complete {
                stop_reason: StopReason::MaxQuestions,
                triage_level: TriageLevel::ConsultationRecommended,
                ..
            }
        ));
    }

    #[test]
    fn next_unasked_question_continues() {
        let asked: BTreeSet<String> = terms(&["fever"]).into_iter().collect();
        let d = DispositionPolicy::default().assess(
            &[candidate("Flu", 0.4)],
            &[],
            &terms(&["fever", "cough"]),
            &asked,
        );
        assert_eq!(
            d,
            Disposition::Continue {
                next_question: FollowUpQuestion::yes_no("cough")
            }
        );
    }

    #[test]
    fn nothing_left_to_ask_is_self_care() {
        let d = DispositionPolicy::default().assess(&[], &[], &[], &BTreeSet::new());
        assert!(matches!(
            d,
            Disposition::Complete {
                stop_reason: StopReason::NoMoreQuestions,
                triage_level: TriageLevel::SelfCare,
                ..
            }
        ));
    }

    #[test]
    fn serializes_with_status_tag() {
        let d = DispositionPolicy::default().assess(&[], &[], &[], &BTreeSet::new());
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["stop_reason"], "no_more_questions");
        assert_eq!(json["triage_level"], "Self Care");
    }
}
