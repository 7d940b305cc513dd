//! Data model: the types that cross the engine boundary in either direction.
//!
//! Everything here is serde-serializable so the host's storage and UI layers
//! can round-trip scores, histories, and trained artifacts without this crate
//! caring where they live.

pub mod analyte;
pub mod assessment;
pub mod enums;
pub mod range;
pub mod risk;
pub mod trend;

pub use analyte::*;
pub use assessment::*;
pub use enums::*;
pub use range::*;
pub use risk::*;
pub use trend::*;
