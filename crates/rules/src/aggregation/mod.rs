//! Grouped evaluation pipeline.
//!
//! 1. [`terms`]: aggregation query and conversion into [`TermsResult`]
//! 2. [`matcher`]: primary threshold per composite key, bucketed by grouping key
//! 3. [`evidence`]: aggregate threshold per bucket and bounded evidence search

mod evidence;
mod matcher;
mod terms;

pub use evidence::*;
pub use matcher::*;
pub use terms::*;
