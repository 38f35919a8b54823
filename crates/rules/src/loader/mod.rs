//! Filesystem loader for event definition YAML files.
//!
//! Scans the definitions directory recursively and keeps every valid
//! `AggregationCount` definition in an in-memory map keyed by id.

mod core;
mod error;

#[cfg(test)]
mod tests;

pub use self::core::DefinitionLoader;
pub use self::error::{LoadResult, LoadStatus, Result, RuleError};
