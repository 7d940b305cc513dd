//! Per-subject report history: an append-only, timestamp-ordered log of
//! scored reports. Scores are never recomputed in place — corrections arrive
//! as new reports, and trend windows recompute from the log on demand.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::models::ReportScore;
use crate::trend::TrendPoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectHistory {
    subject_id: String,
    /// Ascending by taken_at; strictly increasing (no duplicates).
    scores: Vec<ReportScore>,
}

impl SubjectHistory {
    pub fn new(subject_id: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            scores: Vec::new(),
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn latest(&self) -> Option<&ReportScore> {
        self.scores.last()
    }

    pub fn scores(&self) -> &[ReportScore] {
        &self.scores
    }

    pub fn contains_timestamp(&self, taken_at: NaiveDateTime) -> bool {
        self.scores.iter().any(|s| s.taken_at == taken_at)
    }

    /// Append a score, keeping the log ordered.
    ///
    /// An exact timestamp collision is rejected with `DuplicateReport` and
    /// the log is left untouched. A late-arriving older report is inserted
    /// at its sorted position rather than dropped.
    pub fn append(&mut self, score: ReportScore) -> Result<(), EngineError> {
        if score.subject_id != self.subject_id {
            return Err(EngineError::SubjectMismatch {
                expected: self.subject_id.clone(),
                got: score.subject_id,
            });
        }
        match self
            .scores
            .binary_search_by(|s| s.taken_at.cmp(&score.taken_at))
        {
            Ok(_) => Err(EngineError::DuplicateReport {
                subject_id: score.subject_id,
                taken_at: score.taken_at,
            }),
            Err(pos) => {
                self.scores.insert(pos, score);
                Ok(())
            }
        }
    }

    /// The most recent `window` observations of one analyte, oldest-first.
    /// Reports not containing the analyte are skipped, not zero-filled.
    pub fn recent_points(&self, analyte: &str, window: usize) -> Vec<TrendPoint> {
        if window == 0 {
            return Vec::new();
        }
        let mut points: Vec<TrendPoint> = self
            .scores
            .iter()
            .rev()
            .filter_map(|score| score.assessment(analyte))
            .take(window)
            .map(|a| TrendPoint {
                value: a.value,
                status: a.status.clone(),
            })
            .collect();
        points.reverse();
        points
    }
}
