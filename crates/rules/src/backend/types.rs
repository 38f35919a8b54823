//! Backend traits, request/response types and the backend error enum.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use aggcount_core::{ResultMessage, TimeRange};

/// Errors surfaced by a search backend.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum BackendError {
    #[error("search backend unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("malformed query '{query}': {reason}")]
    MalformedQuery { query: String, reason: String },
}

/// Sort direction for message searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Sort specification for message searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sorting {
    pub field: String,
    pub direction: Direction,
}

impl Sorting {
    /// Most recent messages first.
    pub fn newest_first() -> Self {
        Self {
            field: "timestamp".to_string(),
            direction: Direction::Desc,
        }
    }
}

/// Aggregation function applied to each bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationFunction {
    Count,
}

/// One series computed per bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSeries {
    pub id: String,
    pub function: AggregationFunction,
    /// Field the function applies to; `None` counts messages.
    pub field: Option<String>,
}

impl AggregationSeries {
    pub fn count() -> Self {
        Self {
            id: "aggregation_count".to_string(),
            function: AggregationFunction::Count,
            field: None,
        }
    }
}

/// A term aggregation over one or more group-by fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRequest {
    pub group_by: Vec<String>,
    pub series: Vec<AggregationSeries>,
    pub streams: BTreeSet<String>,
    pub query: String,
    pub timerange: TimeRange,
    /// Maximum number of buckets to return.
    pub batch_size: usize,
}

/// One bucket of an aggregation response: group-by values and series value.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRow {
    pub key: Vec<String>,
    pub value: f64,
}

/// Raw aggregation response. Rows may repeat a key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationResponse {
    pub rows: Vec<AggregationRow>,
    pub total_aggregated_messages: u64,
}

/// Counts messages matching a query and filter over a time range.
#[async_trait::async_trait]
pub trait Counter: Send + Sync {
    async fn count(&self, query: &str, timerange: &TimeRange, filter: &str) -> Result<u64, BackendError>;
}

/// Sorted, paged message search.
#[async_trait::async_trait]
pub trait Searcher: Send + Sync {
    async fn search(
        &self,
        query: &str,
        filter: &str,
        timerange: &TimeRange,
        limit: usize,
        offset: usize,
        sorting: &Sorting,
    ) -> Result<Vec<ResultMessage>, BackendError>;
}

/// Pull-based cursor over the batches of a scroll query.
///
/// The consumer stops scrolling by dropping the cursor.
#[async_trait::async_trait]
pub trait ScrollCursor: Send {
    /// Next batch, or `None` once the result set is exhausted.
    async fn next_batch(&mut self) -> Result<Option<Vec<ResultMessage>>, BackendError>;
}

/// Opens scroll queries over one or more streams.
#[async_trait::async_trait]
pub trait ScrollQuerier: Send + Sync {
    async fn scroll(
        &self,
        query: &str,
        streams: &BTreeSet<String>,
        parameters: &BTreeMap<String, String>,
        timerange: &TimeRange,
        batch_size: usize,
    ) -> Result<Box<dyn ScrollCursor>, BackendError>;
}

/// Executes term aggregations.
#[async_trait::async_trait]
pub trait AggregationBackend: Send + Sync {
    async fn aggregate(&self, request: &AggregationRequest) -> Result<AggregationResponse, BackendError>;
}

/// The set of collaborators one engine instance talks to.
#[derive(Clone)]
pub struct Backends {
    pub counter: Arc<dyn Counter>,
    pub searcher: Arc<dyn Searcher>,
    pub scroller: Arc<dyn ScrollQuerier>,
    pub aggregator: Arc<dyn AggregationBackend>,
}

impl Backends {
    /// Use one implementation for every role.
    pub fn from_single<B>(backend: Arc<B>) -> Self
    where
        B: Counter + Searcher + ScrollQuerier + AggregationBackend + 'static,
    {
        Self {
            counter: backend.clone(),
            searcher: backend.clone(),
            scroller: backend.clone(),
            aggregator: backend,
        }
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
