//! The two evaluation modes behind [`crate::engine::AggregationCount`].
//!
//! A definition without grouping or distinction fields is a plain count
//! over the stream ([`PlainCountCheck`]). Anything else goes through the
//! term aggregation pipeline ([`GroupedCheck`]).

mod fields;
mod no_fields;

pub use fields::GroupedCheck;
pub use no_fields::PlainCountCheck;

use aggcount_core::{EvidenceMessage, TimeRange};

use crate::description::CheckResult;
use crate::error::EvaluationError;

/// One evaluation mode.
#[async_trait::async_trait]
pub trait Check: Send + Sync {
    /// Evaluate the definition over `timerange`.
    async fn run(&self, timerange: &TimeRange) -> Result<CheckResult, EvaluationError>;

    /// Re-derive up to `limit` evidence messages for `timerange`.
    async fn fetch_evidence(
        &self,
        timerange: &TimeRange,
        limit: usize,
    ) -> Result<Vec<EvidenceMessage>, EvaluationError>;

    /// Short mode name for logs.
    fn mode(&self) -> &'static str;
}
