//! Event processor: runs one definition over a time range and turns a
//! triggered check into an alert event.

mod event;
mod state;

pub use event::{message_origin_context, Event, EventWithContext, ProcessorParameters, DEFAULT_WINDOW_SECONDS};
pub use state::{DependencyCheck, InMemoryStateStore, ProcessorState, StateStore};

use std::sync::Arc;

use aggcount_core::{CoreError, EvidenceMessage, TimeRange};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit_log::{AuditLog, DefinitionAudit, ExecutionPhase, LogLevel};
use crate::backend::Backends;
use crate::description::CheckResult;
use crate::engine::AggregationCount;
use crate::error::EvaluationError;
use crate::schema::EventDefinition;

/// Failure of a processor run.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// Messages for the range are not searchable yet; retry later.
    #[error(
        "couldn't run aggregation count <{title}/{definition_id}> for timerange <{timerange}> \
         because required messages haven't been indexed yet"
    )]
    Precondition {
        title: String,
        definition_id: String,
        timerange: TimeRange,
    },

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("invalid processor parameters: {0}")]
    InvalidParameters(#[from] CoreError),
}

/// Collaborators shared by every processor.
#[derive(Clone)]
pub struct ProcessorServices {
    pub backends: Backends,
    pub dependency_check: Arc<dyn DependencyCheck>,
    pub state_store: Arc<dyn StateStore>,
    pub audit_log: AuditLog,
}

impl std::fmt::Debug for ProcessorServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorServices")
            .field("backends", &self.backends)
            .field("audit_log", &self.audit_log)
            .finish_non_exhaustive()
    }
}

/// Runs one event definition.
pub struct AggregationCountProcessor {
    definition: EventDefinition,
    engine: AggregationCount,
    dependency_check: Arc<dyn DependencyCheck>,
    state_store: Arc<dyn StateStore>,
    audit: DefinitionAudit,
}

impl AggregationCountProcessor {
    pub fn new(definition: EventDefinition, services: ProcessorServices) -> Self {
        let audit = DefinitionAudit::new(services.audit_log, definition.id());
        let engine = AggregationCount::with_audit(
            definition.config.clone(),
            services.backends,
            audit.clone(),
        );
        Self {
            definition,
            engine,
            dependency_check: services.dependency_check,
            state_store: services.state_store,
            audit,
        }
    }

    pub fn definition(&self) -> &EventDefinition {
        &self.definition
    }

    pub fn engine(&self) -> &AggregationCount {
        &self.engine
    }

    /// Evaluate the definition over the parameters' range.
    ///
    /// Emits at most one event. Processor state is recorded whenever the
    /// evaluation itself completes, triggered or not.
    pub async fn create_events(
        &self,
        parameters: &ProcessorParameters,
    ) -> Result<Vec<EventWithContext>, ProcessorError> {
        let timerange = *parameters.timerange();

        if !self
            .dependency_check
            .has_messages_indexed_up_to(timerange.to())
            .await
        {
            let err = ProcessorError::Precondition {
                title: self.definition.title().to_string(),
                definition_id: self.definition.id().to_string(),
                timerange,
            };
            warn!(definition_id = %self.definition.id(), error = %err, "precondition failed");
            self.audit
                .log(LogLevel::Warning, ExecutionPhase::DependencyCheck, err.to_string());
            return Err(err);
        }

        let result = match self.engine.run_check(&timerange).await {
            Ok(result) => result,
            Err(e) => {
                self.audit.log(
                    LogLevel::Error,
                    ExecutionPhase::Evaluation,
                    format!("evaluation failed: {e}"),
                );
                return Err(e.into());
            }
        };

        let events = match self.event_from_result(&timerange, result) {
            Some(event) => {
                info!(
                    definition_id = %self.definition.id(),
                    event_id = %event.event.id,
                    message = %event.event.message,
                    "created event"
                );
                self.audit.log_with_details(
                    LogLevel::Info,
                    ExecutionPhase::EventCreation,
                    event.event.message.clone(),
                    json!({ "event_id": event.event.id.to_string() }),
                );
                vec![event]
            }
            None => {
                debug!(definition_id = %self.definition.id(), timerange = %timerange, "not triggered");
                Vec::new()
            }
        };

        self.state_store
            .set_state(self.definition.id(), timerange.from(), timerange.to())
            .await;
        self.audit.log(
            LogLevel::Debug,
            ExecutionPhase::StateUpdate,
            format!("processed {timerange}"),
        );

        Ok(events)
    }

    fn event_from_result(&self, timerange: &TimeRange, result: CheckResult) -> Option<EventWithContext> {
        let first = result.evidence.into_iter().next()?;

        let event = Event {
            id: Uuid::new_v4(),
            definition_id: self.definition.id().to_string(),
            priority: self.definition.metadata.priority,
            timestamp: timerange.from(),
            processing_timestamp: Utc::now(),
            message: result.description,
            source_streams: vec![self.definition.config.stream().to_string()],
            timerange_start: timerange.from(),
            timerange_end: timerange.to(),
            origin_context: Some(message_origin_context(&first)),
        };

        Some(EventWithContext {
            event,
            context: Some(first.raw_message),
        })
    }

    /// Re-collect up to `limit` evidence messages for an emitted event.
    ///
    /// A non-positive limit returns nothing without touching the backend.
    pub async fn source_messages_for_event(
        &self,
        event: &Event,
        limit: i64,
    ) -> Result<Vec<EvidenceMessage>, ProcessorError> {
        if limit <= 0 {
            return Ok(Vec::new());
        }
        let timerange = event.timerange()?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        let evidence = self.engine.fetch_evidence(&timerange, limit).await?;
        self.audit.log(
            LogLevel::Debug,
            ExecutionPhase::EvidenceFetch,
            format!("{} source messages for event {}", evidence.len(), event.id),
        );
        Ok(evidence)
    }
}

impl std::fmt::Debug for AggregationCountProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationCountProcessor")
            .field("definition_id", &self.definition.id())
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
