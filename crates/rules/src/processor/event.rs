//! Events emitted by the processor and the parameters of one run.

use aggcount_core::{CoreError, EvidenceMessage, TimeRange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default evaluation window when no explicit range is given.
pub const DEFAULT_WINDOW_SECONDS: u32 = 3600;

/// An alert produced by one triggered evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub definition_id: String,
    pub priority: u8,
    /// Event time; the start of the evaluated range.
    pub timestamp: DateTime<Utc>,
    pub processing_timestamp: DateTime<Utc>,
    pub message: String,
    pub source_streams: Vec<String>,
    pub timerange_start: DateTime<Utc>,
    pub timerange_end: DateTime<Utc>,
    /// Pointer to the message that caused the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_context: Option<String>,
}

impl Event {
    /// The evaluated range, if the stored bounds still form a valid one.
    pub fn timerange(&self) -> Result<TimeRange, CoreError> {
        TimeRange::new(self.timerange_start, self.timerange_end)
    }
}

/// `urn:graylog:message:es:<index>:<id>` for a stored message.
pub fn message_origin_context(message: &EvidenceMessage) -> String {
    format!(
        "urn:graylog:message:es:{}:{}",
        message.source_index, message.id
    )
}

/// An event plus the raw message it was created from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventWithContext {
    pub event: Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/// Parameters of one processor run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessorParameters {
    timerange: TimeRange,
}

impl ProcessorParameters {
    /// The last hour, ending now.
    pub fn default_range() -> Result<Self, CoreError> {
        Ok(Self {
            timerange: TimeRange::last_seconds(DEFAULT_WINDOW_SECONDS)?,
        })
    }

    pub fn new(timerange: TimeRange) -> Self {
        Self { timerange }
    }

    /// Explicit range; `to` must be after `from`.
    pub fn with_timerange(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, CoreError> {
        Ok(Self {
            timerange: TimeRange::new(from, to)?,
        })
    }

    pub fn timerange(&self) -> &TimeRange {
        &self.timerange
    }
}
