//! The interpretation core: reference ranges, threshold rules, hybrid
//! severity blending, and the aggregation pass that ties them to trends and
//! risk models.
//!
//! Scoring is synchronous and pure over its inputs; the only mutation is the
//! final append of a finished score to the subject's history.

pub mod aggregator;
pub mod answers;
pub mod narrative;
pub mod reference;
pub mod rules;
pub mod scorer;
pub mod types;

pub use aggregator::DefaultScoringEngine;
pub use answers::answer_question;
pub use narrative::{build_narrative, guidance_lines, NarrativeTemplates};
pub use reference::ReferenceRangeTable;
pub use rules::{classify, RuleVerdict};
pub use scorer::{assess, blend_severity, model_confidence, StatusSignal};
pub use types::{EngineError, ScoringEngine};
