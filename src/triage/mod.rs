//! Multi-turn triage: open a session from free text, refine it with yes/no
//! answers, sweep expired sessions.
//!
//! Termination is caller-driven. A session stays open until its TTL lapses;
//! `TriageEngine::assess` offers a non-binding stop/continue recommendation.

pub mod engine;
pub mod error;
pub mod types;

pub use engine::TriageEngine;
pub use error::TriageError;
pub use types::{
    AnswerQuestionRequest, AnswerQuestionResponse, AssessmentResponse, StartSessionRequest,
    StartSessionResponse, SweepReport, UNKNOWN_DISEASE,
};
