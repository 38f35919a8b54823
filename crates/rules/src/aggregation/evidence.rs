//! Bounded evidence collection for matched buckets.

use aggcount_core::{EvidenceMessage, TimeRange};
use tracing::debug;

use crate::backend::{stream_filter, Searcher, Sorting};
use crate::error::EvaluationError;
use crate::schema::AggregationCountConfig;
use crate::threshold::EvaluationStrategy;

use super::matcher::MatchedTerms;

/// Pulls representative messages for every composite key of every grouping
/// bucket that passes the aggregate threshold.
///
/// All buckets share one flat evidence list which never grows past `limit`.
pub struct EvidenceGatherer<'a> {
    searcher: &'a dyn Searcher,
    config: &'a AggregationCountConfig,
    timerange: &'a TimeRange,
    limit: usize,
}

impl<'a> EvidenceGatherer<'a> {
    pub fn new(
        searcher: &'a dyn Searcher,
        config: &'a AggregationCountConfig,
        timerange: &'a TimeRange,
        limit: usize,
    ) -> Self {
        Self {
            searcher,
            config,
            timerange,
            limit,
        }
    }

    pub async fn gather(
        &self,
        matched: &MatchedTerms,
        strategy: &EvaluationStrategy,
    ) -> Result<Vec<EvidenceMessage>, EvaluationError> {
        let filter = stream_filter(self.config.stream());
        let sorting = Sorting::newest_first();
        let mut evidence = Vec::with_capacity(self.limit.min(64));

        'groups: for (_, keys) in matched.passing_groups(strategy) {
            for key in keys {
                let remaining = self.limit.saturating_sub(evidence.len());
                if remaining == 0 {
                    break 'groups;
                }

                let query = key.evidence_query(self.config.search_query());
                debug!(query = %query, remaining, "evidence search");

                let messages = self
                    .searcher
                    .search(&query, &filter, self.timerange, remaining, 0, &sorting)
                    .await
                    .map_err(EvaluationError::backend("search"))?;

                evidence.extend(messages.into_iter().take(remaining).map(EvidenceMessage::from));
                debug!(collected = evidence.len(), "evidence collected so far");
            }
        }

        Ok(evidence)
    }
}
