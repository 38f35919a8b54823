use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use aggcount_core::{CoreError, ResultMessage, TimeRange};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::debug;

use crate::backend::{
    AggregationBackend, AggregationRequest, AggregationResponse, AggregationRow, BackendError,
    Counter, Direction, ScrollCursor, ScrollQuerier, Searcher, Sorting,
};
use crate::processor::DependencyCheck;

use super::query::{substitute_parameters, QueryExpr};

/// Search backend over an in-memory list of messages.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    messages: Vec<ResultMessage>,
    indexed_until: Option<DateTime<Utc>>,
}

impl MemoryBackend {
    pub fn new(messages: Vec<ResultMessage>) -> Self {
        Self {
            messages,
            indexed_until: None,
        }
    }

    /// Report messages as indexed only up to `until`. Without this every
    /// time is considered indexed.
    pub fn with_indexed_until(mut self, until: DateTime<Utc>) -> Self {
        self.indexed_until = Some(until);
        self
    }

    /// Parse a JSON-lines dump, one message object per line. Blank lines
    /// are ignored.
    pub fn from_json_lines(contents: &str) -> Result<Self, CoreError> {
        let messages = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                ResultMessage::from_json_line(line).map_err(|e| {
                    CoreError::InvalidMessage(format!("line {}: {}", n + 1, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(messages))
    }

    pub fn from_json_lines_file(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path)?;
        let backend = Self::from_json_lines(&contents)?;
        debug!(path = %path.display(), messages = backend.len(), "loaded message fixtures");
        Ok(backend)
    }

    pub fn push(&mut self, message: ResultMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ResultMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in `timerange` matching both the query and the filter, in
    /// insertion order.
    fn select(
        &self,
        query: &str,
        filter: &str,
        timerange: &TimeRange,
    ) -> Result<Vec<&ResultMessage>, BackendError> {
        let query = QueryExpr::parse(query)?;
        let filter = QueryExpr::parse(filter)?;
        Ok(self
            .messages
            .iter()
            .filter(|m| timerange.contains(m.message.timestamp))
            .filter(|m| query.matches(&m.message) && filter.matches(&m.message))
            .collect())
    }

    fn select_in_streams(
        &self,
        query: &str,
        streams: &BTreeSet<String>,
        timerange: &TimeRange,
    ) -> Result<Vec<&ResultMessage>, BackendError> {
        let selected = self.select(query, "", timerange)?;
        Ok(selected
            .into_iter()
            .filter(|m| streams.is_empty() || m.message.streams.iter().any(|s| streams.contains(s)))
            .collect())
    }
}

#[async_trait::async_trait]
impl Counter for MemoryBackend {
    async fn count(&self, query: &str, timerange: &TimeRange, filter: &str) -> Result<u64, BackendError> {
        Ok(self.select(query, filter, timerange)?.len() as u64)
    }
}

#[async_trait::async_trait]
impl Searcher for MemoryBackend {
    async fn search(
        &self,
        query: &str,
        filter: &str,
        timerange: &TimeRange,
        limit: usize,
        offset: usize,
        sorting: &Sorting,
    ) -> Result<Vec<ResultMessage>, BackendError> {
        let mut selected = self.select(query, filter, timerange)?;

        // Stable sort, so equal keys keep insertion order.
        if sorting.field == "timestamp" {
            selected.sort_by_key(|m| m.message.timestamp);
        } else {
            selected.sort_by_key(|m| m.message.term(&sorting.field));
        }
        if sorting.direction == Direction::Desc {
            selected.reverse();
        }

        Ok(selected.into_iter().skip(offset).take(limit).cloned().collect())
    }
}

/// Cursor over precomputed batches.
#[derive(Debug)]
pub struct MemoryScrollCursor {
    batches: VecDeque<Vec<ResultMessage>>,
}

#[async_trait::async_trait]
impl ScrollCursor for MemoryScrollCursor {
    async fn next_batch(&mut self) -> Result<Option<Vec<ResultMessage>>, BackendError> {
        Ok(self.batches.pop_front())
    }
}

#[async_trait::async_trait]
impl ScrollQuerier for MemoryBackend {
    async fn scroll(
        &self,
        query: &str,
        streams: &BTreeSet<String>,
        parameters: &BTreeMap<String, String>,
        timerange: &TimeRange,
        batch_size: usize,
    ) -> Result<Box<dyn ScrollCursor>, BackendError> {
        let query = substitute_parameters(query, parameters);
        let selected = self.select_in_streams(&query, streams, timerange)?;

        let batches = selected
            .chunks(batch_size.max(1))
            .map(|chunk| chunk.iter().map(|m| (*m).clone()).collect())
            .collect();
        Ok(Box::new(MemoryScrollCursor { batches }))
    }
}

#[async_trait::async_trait]
impl AggregationBackend for MemoryBackend {
    async fn aggregate(&self, request: &AggregationRequest) -> Result<AggregationResponse, BackendError> {
        let selected = self.select_in_streams(&request.query, &request.streams, &request.timerange)?;

        let mut buckets: IndexMap<Vec<String>, u64> = IndexMap::new();
        let mut total = 0u64;
        for m in &selected {
            // Messages missing any group-by field fall in no bucket.
            let key: Option<Vec<String>> = request
                .group_by
                .iter()
                .map(|field| m.message.term(field))
                .collect();
            if let Some(key) = key {
                *buckets.entry(key).or_insert(0) += 1;
                total += 1;
            }
        }

        // Largest buckets first; ties keep discovery order.
        let mut rows: Vec<AggregationRow> = buckets
            .into_iter()
            .map(|(key, count)| AggregationRow {
                key,
                value: count as f64,
            })
            .collect();
        rows.sort_by(|a, b| b.value.total_cmp(&a.value));
        rows.truncate(request.batch_size);

        Ok(AggregationResponse {
            rows,
            total_aggregated_messages: total,
        })
    }
}

#[async_trait::async_trait]
impl DependencyCheck for MemoryBackend {
    async fn has_messages_indexed_up_to(&self, to: DateTime<Utc>) -> bool {
        self.indexed_until.map_or(true, |until| until >= to)
    }
}
