use std::sync::Arc;

use aggcount_core::{Message, ResultMessage};
use chrono::{DateTime, Duration, TimeZone, Utc};

use super::*;
use crate::audit_log::LogQueryParams;
use crate::backend::{AggregationBackend, AggregationRequest, AggregationResponse, BackendError};
use crate::memory::MemoryBackend;
use crate::schema::{AggregationCountConfig, ThresholdType};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

fn params() -> ProcessorParameters {
    ProcessorParameters::with_timerange(base(), base() + Duration::hours(1)).unwrap()
}

fn messages() -> Vec<ResultMessage> {
    (0..3)
        .map(|i| {
            ResultMessage::new(
                format!("graylog_{i}"),
                Message::new(format!("m{i}"), base() + Duration::minutes(i + 1))
                    .in_stream("auth")
                    .with_field("user", if i == 2 { "bob" } else { "alice" }),
            )
        })
        .collect()
}

struct Harness {
    processor: AggregationCountProcessor,
    state: Arc<InMemoryStateStore>,
    audit: AuditLog,
}

fn harness(config: AggregationCountConfig, backend: MemoryBackend) -> Harness {
    let backend = Arc::new(backend);
    let state = Arc::new(InMemoryStateStore::new());
    let audit = AuditLog::new();
    let services = ProcessorServices {
        backends: Backends::from_single(backend.clone()),
        dependency_check: backend,
        state_store: state.clone(),
        audit_log: audit.clone(),
    };
    let mut definition = EventDefinition::new("ssh-brute", "SSH brute force", config);
    definition.metadata.priority = 3;
    Harness {
        processor: AggregationCountProcessor::new(definition, services),
        state,
        audit,
    }
}

fn plain(kind: ThresholdType, threshold: u64) -> AggregationCountConfig {
    AggregationCountConfig::builder("auth")
        .threshold(kind, threshold)
        .build()
        .unwrap()
}

#[tokio::test]
async fn triggered_check_emits_one_event() {
    let h = harness(plain(ThresholdType::More, 2), MemoryBackend::new(messages()));

    let events = h.processor.create_events(&params()).await.unwrap();
    assert_eq!(events.len(), 1);

    let event = &events[0].event;
    assert_eq!(event.definition_id, "ssh-brute");
    assert_eq!(event.priority, 3);
    assert_eq!(event.timestamp, base());
    assert_eq!(event.timerange_start, base());
    assert_eq!(event.timerange_end, base() + Duration::hours(1));
    assert_eq!(event.source_streams, vec!["auth"]);
    assert!(event.message.starts_with("Stream had 3 messages"));
    // Evidence is newest first, so the origin is the last message
    assert_eq!(
        event.origin_context.as_deref(),
        Some("urn:graylog:message:es:graylog_2:m2")
    );
    assert_eq!(events[0].context.as_ref().unwrap()["user"], "bob");

    let state = h.state.get_state("ssh-brute").await.unwrap();
    assert_eq!(state.min_processed_timestamp, base());
    assert_eq!(state.max_processed_timestamp, base() + Duration::hours(1));
}

#[tokio::test]
async fn untriggered_check_still_records_state() {
    let h = harness(plain(ThresholdType::More, 3), MemoryBackend::new(messages()));

    let events = h.processor.create_events(&params()).await.unwrap();
    assert!(events.is_empty());
    assert!(h.state.get_state("ssh-brute").await.is_some());
}

#[tokio::test]
async fn unindexed_range_is_a_precondition_failure() {
    let backend = MemoryBackend::new(messages()).with_indexed_until(base() + Duration::minutes(30));
    let h = harness(plain(ThresholdType::More, 0), backend);

    let err = h.processor.create_events(&params()).await.unwrap_err();
    assert!(matches!(err, ProcessorError::Precondition { .. }));
    assert!(err.to_string().contains("<SSH brute force/ssh-brute>"));
    assert!(h.state.get_state("ssh-brute").await.is_none());

    let entries = h.audit.query("ssh-brute", &LogQueryParams::default());
    assert_eq!(entries[0].phase, ExecutionPhase::DependencyCheck);
}

#[tokio::test]
async fn source_messages_respect_limit() {
    let h = harness(plain(ThresholdType::More, 0), MemoryBackend::new(messages()));
    let events = h.processor.create_events(&params()).await.unwrap();
    let event = &events[0].event;

    assert!(h
        .processor
        .source_messages_for_event(event, 0)
        .await
        .unwrap()
        .is_empty());
    assert!(h
        .processor
        .source_messages_for_event(event, -5)
        .await
        .unwrap()
        .is_empty());

    let two = h.processor.source_messages_for_event(event, 2).await.unwrap();
    let ids: Vec<&str> = two.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m0", "m1"]);
}

#[tokio::test]
async fn grouped_source_messages_rerun_the_pipeline() {
    let config = AggregationCountConfig::builder("auth")
        .grouping_fields(["user"])
        .threshold(ThresholdType::More, 1)
        .build()
        .unwrap();
    let h = harness(config, MemoryBackend::new(messages()));

    let events = h.processor.create_events(&params()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].event.message.starts_with("Stream had 2 messages"));

    let evidence = h
        .processor
        .source_messages_for_event(&events[0].event, 10)
        .await
        .unwrap();
    let mut ids: Vec<&str> = evidence.iter().map(|m| m.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["m0", "m1"]);
}

struct FailingAggregator;

#[async_trait::async_trait]
impl AggregationBackend for FailingAggregator {
    async fn aggregate(&self, _request: &AggregationRequest) -> Result<AggregationResponse, BackendError> {
        Err(BackendError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn degraded_aggregation_is_audited() {
    let backend = Arc::new(MemoryBackend::new(messages()));
    let mut backends = Backends::from_single(backend.clone());
    backends.aggregator = Arc::new(FailingAggregator);

    let audit = AuditLog::new();
    let services = ProcessorServices {
        backends,
        dependency_check: backend,
        state_store: Arc::new(InMemoryStateStore::new()),
        audit_log: audit.clone(),
    };
    let config = AggregationCountConfig::builder("auth")
        .grouping_fields(["user"])
        .threshold(ThresholdType::More, 0)
        .build()
        .unwrap();
    let processor =
        AggregationCountProcessor::new(EventDefinition::new("d1", "Logins", config), services);

    let events = processor.create_events(&params()).await.unwrap();
    assert!(events.is_empty());

    let errors = audit.query(
        "d1",
        &LogQueryParams {
            level: Some(LogLevel::Error),
            ..Default::default()
        },
    );
    assert_eq!(errors.len(), 1);
    let details = errors[0].details.as_ref().unwrap();
    assert_eq!(details["stream"], "auth");
    assert!(details["error"].as_str().unwrap().contains("connection refused"));
}
