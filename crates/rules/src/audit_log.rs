//! In-memory structured audit log for definition evaluation runs.
//!
//! Entries are kept per event definition, capped at a configurable maximum
//! (default 500) with FIFO eviction. Failures that the engine degrades to
//! "not triggered" are recorded here so they remain visible after the run.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity level for audit log entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Numeric severity for comparison (higher = more severe).
    pub fn as_severity(&self) -> u8 {
        match self {
            LogLevel::Debug => 0,
            LogLevel::Info => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
        }
    }
}

/// Step of a processor run that produced the entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    DependencyCheck,
    Evaluation,
    EventCreation,
    EvidenceFetch,
    StateUpdate,
    Complete,
}

/// A single audit log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub definition_id: String,
    pub level: LogLevel,
    pub phase: ExecutionPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Filters for [`AuditLog::query`].
#[derive(Debug, Default, Deserialize)]
pub struct LogQueryParams {
    /// Minimum level (inclusive).
    pub level: Option<LogLevel>,
    pub phase: Option<ExecutionPhase>,
    /// Maximum number of entries to return, default 100.
    pub limit: Option<u32>,
    /// Only entries at or after this RFC 3339 timestamp.
    pub since: Option<String>,
}

/// Per-definition audit log with FIFO eviction.
#[derive(Clone)]
pub struct AuditLog {
    entries: Arc<RwLock<HashMap<String, VecDeque<LogEntry>>>>,
    max_entries_per_definition: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_max_entries(500)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_entries_per_definition: max,
        }
    }

    pub fn log(
        &self,
        definition_id: &str,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
    ) {
        self.log_with_details(definition_id, level, phase, message, None, None);
    }

    pub fn log_with_details(
        &self,
        definition_id: &str,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
        duration_ms: Option<u64>,
    ) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            definition_id: definition_id.to_string(),
            level,
            phase,
            message: message.into(),
            details,
            duration_ms,
        };

        let mut guard = self.write();
        let deque = guard.entry(definition_id.to_string()).or_default();
        deque.push_back(entry);
        while deque.len() > self.max_entries_per_definition {
            deque.pop_front();
        }
    }

    /// Entries for one definition, newest first.
    pub fn query(&self, definition_id: &str, params: &LogQueryParams) -> Vec<LogEntry> {
        let guard = self.read();
        let Some(deque) = guard.get(definition_id) else {
            return Vec::new();
        };

        let min_severity = params.level.map(|l| l.as_severity()).unwrap_or(0);
        let since: Option<DateTime<Utc>> = params
            .since
            .as_ref()
            .and_then(|s| s.parse::<DateTime<Utc>>().ok());
        let limit = params.limit.unwrap_or(100) as usize;

        deque
            .iter()
            .rev()
            .filter(|e| e.level.as_severity() >= min_severity)
            .filter(|e| params.phase.map_or(true, |p| e.phase == p))
            .filter(|e| since.map_or(true, |s| e.timestamp >= s))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn clear(&self, definition_id: &str) {
        self.write().remove(definition_id);
    }

    // A panic while holding the lock leaves the entries intact, so a
    // poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, VecDeque<LogEntry>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, VecDeque<LogEntry>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("max_entries_per_definition", &self.max_entries_per_definition)
            .finish_non_exhaustive()
    }
}

/// An [`AuditLog`] bound to one definition id.
#[derive(Debug, Clone)]
pub struct DefinitionAudit {
    log: AuditLog,
    definition_id: String,
}

impl DefinitionAudit {
    pub fn new(log: AuditLog, definition_id: impl Into<String>) -> Self {
        Self {
            log,
            definition_id: definition_id.into(),
        }
    }

    pub fn definition_id(&self) -> &str {
        &self.definition_id
    }

    pub fn log(&self, level: LogLevel, phase: ExecutionPhase, message: impl Into<String>) {
        self.log.log(&self.definition_id, level, phase, message);
    }

    pub fn log_with_details(
        &self,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
        details: serde_json::Value,
    ) {
        self.log
            .log_with_details(&self.definition_id, level, phase, message, Some(details), None);
    }
}
