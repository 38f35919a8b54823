//! YAML schema types for event definitions.
//!
//! - `EventDefinition`: envelope (apiVersion, kind), metadata and config
//! - `AggregationCountConfig`: validated, immutable evaluation settings
//! - `ThresholdType`: MORE / LESS comparison direction

mod config;
mod definition;
mod metadata;

pub use config::*;
pub use definition::*;
pub use metadata::*;

#[cfg(test)]
mod tests;
