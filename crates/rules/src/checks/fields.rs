use std::sync::Arc;

use aggcount_core::{EvidenceMessage, TimeRange};
use serde_json::json;
use tracing::{debug, error};

use crate::aggregation::{collect_matches, fetch_terms, EvidenceGatherer, MatchedTerms, TermsResult};
use crate::audit_log::{DefinitionAudit, ExecutionPhase, LogLevel};
use crate::backend::{AggregationBackend, Searcher};
use crate::description::{CheckResult, ResultBuilder};
use crate::error::EvaluationError;
use crate::schema::AggregationCountConfig;
use crate::threshold::EvaluationStrategy;

/// Term aggregation over `grouping ++ distinction` fields, thresholded per
/// composite key and then per grouping bucket.
pub struct GroupedCheck {
    config: Arc<AggregationCountConfig>,
    searcher: Arc<dyn Searcher>,
    aggregator: Arc<dyn AggregationBackend>,
    strategy: EvaluationStrategy,
    search_limit: usize,
    results: ResultBuilder,
    audit: Option<DefinitionAudit>,
}

impl GroupedCheck {
    pub fn new(
        config: Arc<AggregationCountConfig>,
        searcher: Arc<dyn Searcher>,
        aggregator: Arc<dyn AggregationBackend>,
        search_limit: usize,
        results: ResultBuilder,
    ) -> Self {
        let strategy = EvaluationStrategy::for_config(&config);
        Self {
            config,
            searcher,
            aggregator,
            strategy,
            search_limit,
            results,
            audit: None,
        }
    }

    /// Record degraded aggregations in `audit` as well as in the log.
    pub fn with_audit(mut self, audit: DefinitionAudit) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Terms for the window. A failing aggregation is logged and treated as
    /// "no buckets", so the run reports nothing rather than failing.
    async fn terms(&self, timerange: &TimeRange, batch_size: usize) -> TermsResult {
        match fetch_terms(self.aggregator.as_ref(), &self.config, timerange, batch_size).await {
            Ok(terms) => terms,
            Err(e) => {
                error!(
                    stream = %self.config.stream(),
                    query = %self.config.search_query(),
                    timerange = %timerange,
                    error = %e,
                    "aggregation failed, evaluating as empty"
                );
                if let Some(audit) = &self.audit {
                    audit.log_with_details(
                        LogLevel::Error,
                        ExecutionPhase::Evaluation,
                        "aggregation failed, evaluated as not triggered",
                        json!({
                            "stream": self.config.stream(),
                            "query": self.config.search_query(),
                            "timerange": timerange.to_string(),
                            "error": e.to_string(),
                        }),
                    );
                }
                TermsResult::empty()
            }
        }
    }

    async fn matches_and_evidence(
        &self,
        timerange: &TimeRange,
        limit: usize,
    ) -> Result<(MatchedTerms, Vec<EvidenceMessage>), EvaluationError> {
        let terms = self.terms(timerange, limit).await;
        let matched = collect_matches(&terms, &self.strategy, self.config.grouping_fields());
        debug!(
            buckets = terms.len(),
            groups = matched.group_count(),
            "primary threshold applied"
        );

        let evidence = EvidenceGatherer::new(self.searcher.as_ref(), &self.config, timerange, limit)
            .gather(&matched, &self.strategy)
            .await?;
        Ok((matched, evidence))
    }
}

#[async_trait::async_trait]
impl super::Check for GroupedCheck {
    async fn run(&self, timerange: &TimeRange) -> Result<CheckResult, EvaluationError> {
        let (matched, evidence) = self.matches_and_evidence(timerange, self.search_limit).await?;
        if evidence.is_empty() {
            return Ok(self.results.build_empty());
        }

        let message_number = if self.strategy.counts_distinct_values() {
            evidence.len() as u64
        } else {
            matched.rule_count()
        };
        Ok(self.results.build(message_number, evidence))
    }

    async fn fetch_evidence(
        &self,
        timerange: &TimeRange,
        limit: usize,
    ) -> Result<Vec<EvidenceMessage>, EvaluationError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let (_, evidence) = self.matches_and_evidence(timerange, limit).await?;
        Ok(evidence)
    }

    fn mode(&self) -> &'static str {
        "grouped"
    }
}
