//! Clariva turns parsed lab-report values into status assessments, trend
//! verdicts, and explainable per-condition risk scores.
//!
//! The crate is a pure library: no I/O beyond optional config and range
//! files, no async runtime. Scoring is synchronous and deterministic for a
//! fixed config and installed model versions; the only background work is
//! model retraining, which swaps finished artifacts into the registry
//! atomically.

pub mod config;
pub mod engine;
pub mod history;
pub mod models;
pub mod risk;
pub mod trend;

pub use engine::{DefaultScoringEngine, EngineError, ReferenceRangeTable, ScoringEngine};
pub use history::SubjectHistory;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for hosts that do not bring their own subscriber.
/// Honors `RUST_LOG`, falling back to the crate's default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::ENGINE_NAME, config::ENGINE_VERSION);
}
