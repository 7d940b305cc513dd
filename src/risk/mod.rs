//! Per-condition risk modeling: feature assembly, bounded training,
//! versioned serving, and additive attribution.
//!
//! Scoring only ever touches the registry; everything training-related runs
//! beside it and swaps finished artifacts in atomically.

pub mod background;
pub mod dataset;
pub mod explain;
pub mod features;
pub mod metrics;
pub mod model;
pub mod registry;

pub use background::{spawn_retrain, RetrainHandle};
pub use dataset::CohortConfig;
pub use explain::{explain, predict_with_explanation};
pub use features::{FeatureSnapshot, FeatureVector};
pub use model::{train, ModelParams, RiskModel, TrainOptions};
pub use registry::RiskModelRegistry;
