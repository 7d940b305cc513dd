//! Error taxonomy and the engine trait.
//!
//! Every failure mode is a typed variant returned to the caller; nothing is
//! logged-and-swallowed. Input problems (unknown analyte, bad unit) abort the
//! report they arrived in; model-lifecycle problems stay scoped to their
//! condition.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::config::ConfigError;
use crate::history::SubjectHistory;
use crate::models::{ParsedReport, ReportOutcome, SubjectProfile};

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No reference range for analyte '{analyte}'")]
    UnknownAnalyte { analyte: String },

    #[error("Invalid reference range for '{analyte}': {reason}")]
    InvalidRange { analyte: String, reason: String },

    #[error("Unit '{unit}' for '{analyte}' does not convert to '{expected}'")]
    UnitMismatch {
        analyte: String,
        unit: String,
        expected: String,
    },

    #[error("Value {value} for '{analyte}' is not a usable measurement")]
    InvalidValue { analyte: String, value: f64 },

    #[error("Not enough training data for '{condition}': got {got}, need {needed}")]
    InsufficientData {
        condition: String,
        needed: usize,
        got: usize,
    },

    #[error("No trained model for condition '{condition}'")]
    ModelNotTrained { condition: String },

    #[error("Training '{condition}' exceeded its {budget_ms} ms budget")]
    TrainingTimeout { condition: String, budget_ms: u64 },

    #[error("Training '{condition}' was cancelled")]
    TrainingCancelled { condition: String },

    #[error("Model for '{condition}' does not support attribution")]
    ExplanationUnavailable { condition: String },

    #[error("Model for '{condition}' expects {expected} features, got {got}")]
    FeatureMismatch {
        condition: String,
        expected: usize,
        got: usize,
    },

    #[error("Report for subject '{subject_id}' at {taken_at} already recorded")]
    DuplicateReport {
        subject_id: String,
        taken_at: NaiveDateTime,
    },

    #[error("Report for subject '{got}' appended to history of '{expected}'")]
    SubjectMismatch { expected: String, got: String },

    #[error("Invalid {field} value: '{value}'")]
    InvalidEnum { field: String, value: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal lock failed")]
    LockFailed,
}

// ---------------------------------------------------------------------------
// ScoringEngine trait
// ---------------------------------------------------------------------------

/// The main scoring entry point: one parsed report in, one full outcome out.
pub trait ScoringEngine {
    /// Score a report against the subject's history, append the resulting
    /// score to that history, and return the complete outcome bundle.
    fn score_report(
        &self,
        report: &ParsedReport,
        history: &mut SubjectHistory,
        profile: &SubjectProfile,
    ) -> Result<ReportOutcome, EngineError>;
}
