//! Evaluation façade for one aggregation-count definition.
//!
//! [`AggregationCount`] picks the evaluation mode once, at construction:
//!
//! - no grouping and no distinction fields: a plain stream count
//!   ([`PlainCountCheck`]),
//! - otherwise: the term aggregation pipeline ([`GroupedCheck`]).
//!
//! Both modes return a [`CheckResult`]; the empty result means the
//! definition did not trigger.

use std::sync::Arc;

use aggcount_core::{EvidenceMessage, TimeRange};
use tracing::{debug, info};

use crate::audit_log::DefinitionAudit;
use crate::backend::Backends;
use crate::checks::{Check, GroupedCheck, PlainCountCheck};
use crate::description::{CheckResult, ResultBuilder};
use crate::error::EvaluationError;
use crate::schema::AggregationCountConfig;

/// Evidence cap for a regular evaluation run.
pub const SEARCH_LIMIT: usize = 500;

pub struct AggregationCount {
    config: Arc<AggregationCountConfig>,
    check: Box<dyn Check>,
}

impl AggregationCount {
    pub fn new(config: AggregationCountConfig, backends: Backends) -> Self {
        Self::build(config, backends, None)
    }

    /// Like [`AggregationCount::new`], recording degraded backend failures
    /// in `audit`.
    pub fn with_audit(config: AggregationCountConfig, backends: Backends, audit: DefinitionAudit) -> Self {
        Self::build(config, backends, Some(audit))
    }

    fn build(config: AggregationCountConfig, backends: Backends, audit: Option<DefinitionAudit>) -> Self {
        let config = Arc::new(config);
        let results = ResultBuilder::new(&config);

        let check: Box<dyn Check> = if config.has_fields() {
            let check = GroupedCheck::new(
                config.clone(),
                backends.searcher,
                backends.aggregator,
                SEARCH_LIMIT,
                results,
            );
            match audit {
                Some(audit) => Box::new(check.with_audit(audit)),
                None => Box::new(check),
            }
        } else {
            Box::new(PlainCountCheck::new(
                config.clone(),
                backends.counter,
                backends.searcher,
                backends.scroller,
                SEARCH_LIMIT,
                results,
            ))
        };

        debug!(stream = %config.stream(), mode = check.mode(), "evaluation mode selected");
        Self { config, check }
    }

    pub fn config(&self) -> &AggregationCountConfig {
        &self.config
    }

    /// Evaluation mode name, `plain_count` or `grouped`.
    pub fn mode(&self) -> &'static str {
        self.check.mode()
    }

    /// Evaluate the definition over `timerange`.
    pub async fn run_check(&self, timerange: &TimeRange) -> Result<CheckResult, EvaluationError> {
        let result = self.check.run(timerange).await?;
        if result.is_triggered() {
            info!(
                stream = %self.config.stream(),
                timerange = %timerange,
                evidence = result.evidence.len(),
                "aggregation count triggered"
            );
        }
        Ok(result)
    }

    /// Re-collect at most `limit` evidence messages without producing a
    /// description.
    pub async fn fetch_evidence(
        &self,
        timerange: &TimeRange,
        limit: usize,
    ) -> Result<Vec<EvidenceMessage>, EvaluationError> {
        self.check.fetch_evidence(timerange, limit).await
    }
}

impl std::fmt::Debug for AggregationCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationCount")
            .field("config", &self.config)
            .field("mode", &self.check.mode())
            .finish()
    }
}
