//! Processor bookkeeping: indexing dependency and processed-range state.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reports whether the message store has indexed everything up to a time.
#[async_trait::async_trait]
pub trait DependencyCheck: Send + Sync {
    async fn has_messages_indexed_up_to(&self, to: DateTime<Utc>) -> bool;
}

/// Processed range of one definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorState {
    pub definition_id: String,
    pub min_processed_timestamp: DateTime<Utc>,
    pub max_processed_timestamp: DateTime<Utc>,
}

/// Persists which ranges each definition has processed.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    /// Widen the recorded range of `definition_id` to include `[from, to]`.
    async fn set_state(&self, definition_id: &str, from: DateTime<Utc>, to: DateTime<Utc>);

    async fn get_state(&self, definition_id: &str) -> Option<ProcessorState>;
}

#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    states: RwLock<HashMap<String, ProcessorState>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StateStore for InMemoryStateStore {
    async fn set_state(&self, definition_id: &str, from: DateTime<Utc>, to: DateTime<Utc>) {
        let mut states = self.states.write().unwrap_or_else(|e| e.into_inner());
        states
            .entry(definition_id.to_string())
            .and_modify(|s| {
                s.min_processed_timestamp = s.min_processed_timestamp.min(from);
                s.max_processed_timestamp = s.max_processed_timestamp.max(to);
            })
            .or_insert_with(|| ProcessorState {
                definition_id: definition_id.to_string(),
                min_processed_timestamp: from,
                max_processed_timestamp: to,
            });
    }

    async fn get_state(&self, definition_id: &str) -> Option<ProcessorState> {
        self.states
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(definition_id)
            .cloned()
    }
}
