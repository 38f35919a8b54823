//! Threshold-aggregation alert evaluation.
//!
//! This crate provides:
//! - YAML event definitions (`AggregationCount` kind) with a filesystem loader
//! - Backend traits for counting, searching, scrolling and term aggregation
//! - The evaluation engine: plain stream counts and the grouped
//!   (grouping/distinction field) pipeline with bounded evidence collection
//! - An event processor that turns triggered checks into alert events
//! - An in-memory backend for fixtures and tests

pub mod aggregation;
pub mod audit_log;
pub mod backend;
pub mod checks;
pub mod description;
pub mod engine;
pub mod error;
pub mod keys;
pub mod loader;
pub mod memory;
pub mod processor;
pub mod schema;
pub mod threshold;

pub use backend::Backends;
pub use description::CheckResult;
pub use engine::{AggregationCount, SEARCH_LIMIT};
pub use error::{ConfigError, EvaluationError};
pub use processor::{AggregationCountProcessor, ProcessorError, ProcessorParameters};
pub use schema::{AggregationCountConfig, EventDefinition, ThresholdType};
