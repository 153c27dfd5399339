//! Triage orchestration over the knowledge base, predictor and sessions.
//!
//! `TriageEngine` is the application context: built once at startup, then
//! shared (behind `Arc`) by every request. Static tables and the classifier
//! are read-only after construction; the session store is the only shared
//! mutable state.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use crate::classifier::{DiseaseCandidate, SymptomPredictor};
use crate::config::TriageConfig;
use crate::disposition::DispositionPolicy;
use crate::extraction::{normalize_confirmed, TextSymptomExtractor};
use crate::knowledge::{CanonicalSymptom, KnowledgeBase, KnowledgeError};
use crate::questions::QuestionSelector;
use crate::red_flags::RedFlagGuard;
use crate::session_store::{SessionData, SessionStore};

use super::error::TriageError;
use super::types::{
    top_of, AnswerQuestionRequest, AnswerQuestionResponse, AssessmentResponse,
    StartSessionRequest, StartSessionResponse, SweepReport,
};

pub struct TriageEngine {
    knowledge: KnowledgeBase,
    predictor: SymptomPredictor,
    sessions: SessionStore,
    config: TriageConfig,
    policy: DispositionPolicy,
}

impl TriageEngine {
    pub fn new(knowledge: KnowledgeBase, predictor: SymptomPredictor, config: TriageConfig) -> Self {
        let sessions = SessionStore::new(Duration::from_secs(config.session_ttl_secs));
        Self::with_session_store(knowledge, predictor, sessions, config)
    }

    /// Engine over a caller-built store (custom clock or id generator).
    pub fn with_session_store(
        knowledge: KnowledgeBase,
        predictor: SymptomPredictor,
        sessions: SessionStore,
        config: TriageConfig,
    ) -> Self {
        Self {
            knowledge,
            predictor: predictor.with_min_confidence(config.min_confidence),
            sessions,
            config,
            policy: DispositionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DispositionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Startup: load static tables and the model artifact. A missing or
    /// broken model degrades predictions; a malformed table is fatal.
    pub fn load(
        config: TriageConfig,
        knowledge_dir: &Path,
        model_path: &Path,
    ) -> Result<Self, KnowledgeError> {
        let knowledge = KnowledgeBase::load(knowledge_dir)?;
        let predictor = SymptomPredictor::load(model_path);
        tracing::info!(
            model_loaded = predictor.is_loaded(),
            session_ttl_secs = config.session_ttl_secs,
            "Triage engine ready"
        );
        Ok(Self::new(knowledge, predictor, config))
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn predictor(&self) -> &SymptomPredictor {
        &self.predictor
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    // ── Operations ───────────────────────────────────────

    /// Extract, rank, advise and open a new session.
    pub fn start_session(
        &self,
        req: StartSessionRequest,
    ) -> Result<StartSessionResponse, TriageError> {
        let mut extracted = TextSymptomExtractor::new(&self.knowledge.synonyms).normalize(&req.text);
        if let Some(confirmed) = &req.confirmed_symptoms {
            extracted.extend(normalize_confirmed(confirmed));
        }

        let candidates = self.predictor.predict(&extracted, self.config.top_k);
        let (top_disease, top_confidence) = top_of(&candidates);
        let next_questions = self.questions_for(&top_disease, &extracted);
        let red_flags = RedFlagGuard::new(&self.knowledge.red_flags).check(&extracted);
        let advice = self.knowledge.medicine.advice_for(&top_disease);

        let session_id = self.sessions.create(SessionData::new(
            req.text,
            extracted.clone(),
            candidates.clone(),
        ))?;

        tracing::info!(
            session_id = %session_id,
            symptoms = extracted.len(),
            top_disease = %top_disease,
            red_flags = red_flags.len(),
            "Triage session started"
        );

        Ok(StartSessionResponse {
            session_id,
            extracted_symptoms: extracted,
            candidate_diseases: candidates,
            top_disease,
            top_confidence,
            next_questions,
            red_flags,
            advice,
        })
    }

    /// Record a yes/no answer and re-rank.
    ///
    /// "Yes" adds the symptom to the session. "No" changes nothing but the
    /// asked-question history; it is not negative evidence.
    pub fn answer_question(
        &self,
        req: AnswerQuestionRequest,
    ) -> Result<AnswerQuestionResponse, TriageError> {
        let symptom = normalize_confirmed([req.symptom.as_str()]).into_iter().next();

        let extracted = self
            .sessions
            .update_with(&req.session_id, |data| {
                if let Some(symptom) = &symptom {
                    if req.answer {
                        data.extracted_symptoms.insert(symptom.clone());
                    }
                    data.asked_questions.insert(symptom.clone());
                }
                data.extracted_symptoms.clone()
            })?
            .ok_or_else(|| self.not_found(&req.session_id))?;

        let candidates = self.predictor.predict(&extracted, self.config.top_k);
        let (top_disease, top_confidence) = top_of(&candidates);
        let next_questions = self.questions_for(&top_disease, &extracted);

        self.store_candidates(&req.session_id, &extracted, &candidates)?;

        tracing::info!(
            session_id = %req.session_id,
            answer = req.answer,
            symptoms = extracted.len(),
            top_disease = %top_disease,
            "Answer recorded"
        );

        Ok(AnswerQuestionResponse {
            extracted_symptoms: extracted,
            candidate_diseases: candidates,
            top_disease,
            top_confidence,
            next_questions,
        })
    }

    /// Remove expired sessions eagerly.
    pub fn sweep_sessions(&self) -> Result<SweepReport, TriageError> {
        let removed = self.sessions.cleanup()?;
        let remaining = self.sessions.len()?;
        Ok(SweepReport { removed, remaining })
    }

    /// Advisory stop/continue recommendation for a live session. Does not
    /// modify the session.
    pub fn assess(&self, session_id: &str) -> Result<AssessmentResponse, TriageError> {
        let session = self
            .sessions
            .get(session_id)?
            .ok_or_else(|| self.not_found(session_id))?;
        let data = session.data;

        let (top_disease, _) = top_of(&data.candidate_diseases);
        let next_questions = self.questions_for(&top_disease, &data.extracted_symptoms);
        let red_flags = RedFlagGuard::new(&self.knowledge.red_flags).check(&data.extracted_symptoms);
        let disposition = self.policy.assess(
            &data.candidate_diseases,
            &red_flags,
            &next_questions,
            &data.asked_questions,
        );

        Ok(AssessmentResponse {
            session_id: session.id,
            candidate_diseases: data.candidate_diseases,
            red_flags,
            disposition,
        })
    }

    // ── Internals ────────────────────────────────────────

    fn questions_for(
        &self,
        top_disease: &str,
        known: &BTreeSet<CanonicalSymptom>,
    ) -> Vec<CanonicalSymptom> {
        match self.predictor.classifier() {
            Some(classifier) => {
                QuestionSelector::next_questions(classifier, top_disease, known, self.config.max_questions)
            }
            None => Vec::new(),
        }
    }

    /// Write back a ranking unless a concurrent answer has already changed
    /// the symptom set it was computed from.
    fn store_candidates(
        &self,
        session_id: &str,
        computed_from: &BTreeSet<CanonicalSymptom>,
        candidates: &[DiseaseCandidate],
    ) -> Result<(), TriageError> {
        let stored = self
            .sessions
            .update_with(session_id, |data| {
                let current = data.extracted_symptoms == *computed_from;
                if current {
                    data.candidate_diseases = candidates.to_vec();
                }
                current
            })?
            .ok_or_else(|| self.not_found(session_id))?;

        if !stored {
            tracing::debug!(session_id = %session_id, "Newer answer superseded this ranking");
        }
        Ok(())
    }

    fn not_found(&self, session_id: &str) -> TriageError {
        tracing::info!(session_id = %session_id, "Session not found or expired");
        TriageError::SessionNotFound(session_id.to_string())
    }
}

impl std::fmt::Debug for TriageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriageEngine")
            .field("predictor", &self.predictor)
            .field("sessions", &self.sessions)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
