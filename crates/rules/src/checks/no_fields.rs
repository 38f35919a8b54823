use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use aggcount_core::{EvidenceMessage, TimeRange};
use tracing::debug;

use crate::backend::{stream_query_filter, Counter, ScrollQuerier, Searcher, Sorting, MATCH_ALL};
use crate::description::{CheckResult, ResultBuilder};
use crate::error::EvaluationError;
use crate::schema::AggregationCountConfig;
use crate::threshold::ThresholdRule;

/// Largest batch requested from a scroll query.
const SCROLL_BATCH_LIMIT: usize = 500;

/// Total message count of the stream compared against the threshold.
pub struct PlainCountCheck {
    config: Arc<AggregationCountConfig>,
    counter: Arc<dyn Counter>,
    searcher: Arc<dyn Searcher>,
    scroller: Arc<dyn ScrollQuerier>,
    rule: ThresholdRule,
    search_limit: usize,
    results: ResultBuilder,
}

impl PlainCountCheck {
    pub fn new(
        config: Arc<AggregationCountConfig>,
        counter: Arc<dyn Counter>,
        searcher: Arc<dyn Searcher>,
        scroller: Arc<dyn ScrollQuerier>,
        search_limit: usize,
        results: ResultBuilder,
    ) -> Self {
        let rule = ThresholdRule::from_config(&config);
        Self {
            config,
            counter,
            searcher,
            scroller,
            rule,
            search_limit,
            results,
        }
    }
}

#[async_trait::async_trait]
impl super::Check for PlainCountCheck {
    async fn run(&self, timerange: &TimeRange) -> Result<CheckResult, EvaluationError> {
        let filter = stream_query_filter(self.config.stream(), self.config.search_query());

        let count = self
            .counter
            .count(MATCH_ALL, timerange, &filter)
            .await
            .map_err(EvaluationError::backend("count"))?;

        let triggered = self.rule.is_triggered(count);
        debug!(filter = %filter, count, triggered, "plain count evaluated");
        if !triggered {
            return Ok(self.results.build_empty());
        }

        let messages = self
            .searcher
            .search(
                MATCH_ALL,
                &filter,
                timerange,
                self.search_limit,
                0,
                &Sorting::newest_first(),
            )
            .await
            .map_err(EvaluationError::backend("search"))?;

        let evidence: Vec<EvidenceMessage> = messages.into_iter().map(EvidenceMessage::from).collect();
        if evidence.is_empty() {
            debug!(filter = %filter, count, "triggered without evidence");
            return Ok(self.results.build_empty());
        }
        Ok(self.results.build(count, evidence))
    }

    async fn fetch_evidence(
        &self,
        timerange: &TimeRange,
        limit: usize,
    ) -> Result<Vec<EvidenceMessage>, EvaluationError> {
        let mut evidence = Vec::new();
        if limit == 0 {
            return Ok(evidence);
        }

        let streams = BTreeSet::from([self.config.stream().to_string()]);
        let mut cursor = self
            .scroller
            .scroll(
                self.config.search_query(),
                &streams,
                &BTreeMap::new(),
                timerange,
                limit.min(SCROLL_BATCH_LIMIT),
            )
            .await
            .map_err(EvaluationError::backend("scroll"))?;

        while let Some(batch) = cursor
            .next_batch()
            .await
            .map_err(EvaluationError::backend("scroll"))?
        {
            let remaining = limit - evidence.len();
            evidence.extend(batch.into_iter().take(remaining).map(EvidenceMessage::from));
            if evidence.len() >= limit {
                break;
            }
        }

        Ok(evidence)
    }

    fn mode(&self) -> &'static str {
        "plain_count"
    }
}
