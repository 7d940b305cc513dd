//! Report aggregation: the single pass that turns a parsed report into a
//! complete outcome.
//!
//! The pass is ordered so each layer reads only what earlier layers wrote:
//! canonicalize and threshold-classify every value, evaluate trends over the
//! window ending at this report, run each condition model in isolation, blend
//! severities, build the narrative, and only then append the finished score
//! to the subject's history. Any per-value input error aborts the whole
//! report before the history changes; a per-condition failure only costs that
//! condition its prediction.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{ConditionSpec, EngineConfig};
use crate::history::SubjectHistory;
use crate::models::{
    ParsedReport, ReportOutcome, ReportScore, RiskPrediction, SeverityPolicy, SkippedCondition,
    SubjectProfile,
};
use crate::risk::dataset::{self, CohortConfig};
use crate::risk::features::{assemble, FeatureSnapshot};
use crate::risk::model::TrainOptions;
use crate::risk::{predict_with_explanation, RiskModelRegistry};
use crate::trend::{self, TrendPoint};

use super::narrative::{build_narrative, guidance_lines};
use super::reference::ReferenceRangeTable;
use super::rules::{self, RuleVerdict};
use super::scorer::{self, model_confidence};
use super::types::{EngineError, ScoringEngine};

/// One value after canonicalization and threshold classification.
struct Classified {
    analyte: String,
    value: f64,
    verdict: RuleVerdict,
}

/// The standard engine: reference table + rule classifier + trend tracker +
/// model registry behind the `ScoringEngine` trait.
#[derive(Debug)]
pub struct DefaultScoringEngine {
    config: EngineConfig,
    table: ReferenceRangeTable,
    registry: Arc<RiskModelRegistry>,
}

impl DefaultScoringEngine {
    /// Build an engine, checking that every configured condition feature has
    /// a reference range. A feature the table cannot resolve would otherwise
    /// surface report-by-report instead of once at startup.
    pub fn new(
        config: EngineConfig,
        table: ReferenceRangeTable,
        registry: Arc<RiskModelRegistry>,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Config)?;
        for spec in &config.risk.conditions {
            for analyte in spec.value_features.iter().chain(&spec.slope_features) {
                table.get(analyte)?;
            }
        }
        Ok(Self {
            config,
            table,
            registry,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn table(&self) -> &ReferenceRangeTable {
        &self.table
    }

    pub fn registry(&self) -> &Arc<RiskModelRegistry> {
        &self.registry
    }

    /// First-run bootstrap: train every configured condition from its seeded
    /// synthetic cohort and install the artifacts.
    pub fn bootstrap_models(&self, cohort: &CohortConfig) -> Result<(), EngineError> {
        let opts = TrainOptions::from_config(&self.config.risk);
        for spec in &self.config.risk.conditions {
            let examples = dataset::for_condition(&spec.name, cohort)?;
            self.registry.train_and_install(
                &spec.name,
                spec.model_kind.clone(),
                spec.feature_names(),
                &examples,
                &opts,
            )?;
        }
        Ok(())
    }

    /// Evaluate one condition model against the assembled snapshot. Every
    /// failure mode stays scoped to the condition.
    fn predict_condition(
        &self,
        spec: &ConditionSpec,
        snapshot: &FeatureSnapshot,
    ) -> Result<RiskPrediction, EngineError> {
        let model = self.registry.get(&spec.name)?;
        let features = assemble(spec, snapshot, &self.table)?;
        predict_with_explanation(&model, &features.values)
    }
}

impl ScoringEngine for DefaultScoringEngine {
    fn score_report(
        &self,
        report: &ParsedReport,
        history: &mut SubjectHistory,
        profile: &SubjectProfile,
    ) -> Result<ReportOutcome, EngineError> {
        let started = Instant::now();

        if report.subject_id != history.subject_id() {
            return Err(EngineError::SubjectMismatch {
                expected: history.subject_id().to_string(),
                got: report.subject_id.clone(),
            });
        }
        if history.contains_timestamp(report.taken_at) {
            tracing::warn!(
                subject = %report.subject_id,
                taken_at = %report.taken_at,
                "duplicate report rejected"
            );
            return Err(EngineError::DuplicateReport {
                subject_id: report.subject_id.clone(),
                taken_at: report.taken_at,
            });
        }

        // Canonicalize and classify every value; the first bad value aborts
        // the report before anything is recorded.
        let mut classified = Vec::with_capacity(report.values.len());
        let mut canonical = BTreeMap::new();
        for (analyte, raw) in &report.values {
            let value = self.table.normalize(raw)?;
            let range = self.table.get(analyte)?;
            let verdict = rules::classify(value, range, profile, &self.config);
            tracing::debug!(
                analyte = %analyte,
                value,
                status = verdict.status.as_str(),
                confidence = verdict.confidence,
                "value classified"
            );
            canonical.insert(analyte.clone(), value);
            classified.push(Classified {
                analyte: analyte.clone(),
                value,
                verdict,
            });
        }

        // Trends over the window ending at this report's value.
        let window = self.config.trend.window;
        let mut trends = Vec::with_capacity(classified.len());
        let mut slopes = HashMap::new();
        for c in &classified {
            let mut points = history.recent_points(&c.analyte, window.saturating_sub(1));
            points.push(TrendPoint {
                value: c.value,
                status: c.verdict.status.clone(),
            });
            let midpoint = self.table.get(&c.analyte)?.midpoint(profile);
            let verdict = trend::assess_trend(&c.analyte, &points, midpoint, &self.config.trend);
            slopes.insert(c.analyte.clone(), verdict.slope);
            trends.push(verdict);
        }

        // Condition predictions, each in isolation.
        let snapshot = FeatureSnapshot {
            values: &canonical,
            slopes: &slopes,
            profile,
        };
        let mut predictions = Vec::new();
        let mut skipped = Vec::new();
        for spec in &self.config.risk.conditions {
            match self.predict_condition(spec, &snapshot) {
                Ok(prediction) => predictions.push(prediction),
                Err(e) => {
                    tracing::warn!(condition = %spec.name, error = %e, "risk prediction skipped");
                    skipped.push(SkippedCondition {
                        condition: spec.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Model signal per analyte: the most confident probability among
        // conditions whose value features cover it.
        let mut model_signals: HashMap<&str, f64> = HashMap::new();
        for prediction in &predictions {
            if let Some(spec) = self.config.condition(&prediction.condition) {
                for analyte in &spec.value_features {
                    match model_signals.entry(analyte.as_str()) {
                        Entry::Vacant(slot) => {
                            slot.insert(prediction.probability);
                        }
                        Entry::Occupied(mut slot) => {
                            if model_confidence(prediction.probability)
                                > model_confidence(*slot.get())
                            {
                                slot.insert(prediction.probability);
                            }
                        }
                    }
                }
            }
        }

        // Final assessments with blended severity, in analyte order.
        let mut assessments = Vec::with_capacity(classified.len());
        for c in &classified {
            let unit = &self.table.get(&c.analyte)?.unit;
            let model_probability = model_signals.get(c.analyte.as_str()).copied();
            assessments.push(scorer::assess(
                &c.analyte,
                c.value,
                unit,
                &c.verdict,
                model_probability,
            ));
        }

        let aggregate_severity = match self.config.severity_policy {
            SeverityPolicy::Sum => assessments.iter().map(|a| a.severity).sum(),
            SeverityPolicy::Max => assessments.iter().map(|a| a.severity).fold(0.0, f64::max),
        };

        let narrative = build_narrative(&assessments, &trends, aggregate_severity);
        let score = ReportScore {
            report_id: report.report_id,
            subject_id: report.subject_id.clone(),
            taken_at: report.taken_at,
            assessments,
            aggregate_severity,
            narrative,
        };
        history.append(score.clone())?;

        let guidance = guidance_lines(&predictions, &score.assessments);
        tracing::info!(
            report_id = %report.report_id,
            subject = %report.subject_id,
            values = score.assessments.len(),
            abnormal = score.abnormal_count(),
            predictions = predictions.len(),
            skipped = skipped.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "report scored"
        );

        Ok(ReportOutcome {
            score,
            trends,
            predictions,
            skipped,
            guidance,
        })
    }
}
