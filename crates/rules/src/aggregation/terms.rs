//! Aggregation request building and raw-response conversion.

use std::collections::BTreeSet;

use aggcount_core::TimeRange;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::backend::{
    AggregationBackend, AggregationRequest, AggregationResponse, AggregationRow, AggregationSeries,
};
use crate::error::EvaluationError;
use crate::keys::CompositeKey;
use crate::schema::AggregationCountConfig;

/// Per-bucket counts of one aggregation, in backend order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermsResult {
    terms: IndexMap<CompositeKey, u64>,
    total: u64,
}

impl TermsResult {
    /// No buckets; what a failed aggregation degrades to.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CompositeKey, u64)> {
        self.terms.iter().map(|(k, v)| (k, *v))
    }

    pub fn get(&self, key: &CompositeKey) -> Option<u64> {
        self.terms.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Total number of messages the backend aggregated over.
    pub fn total(&self) -> u64 {
        self.total
    }
}

/// A key reported more than once by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCollision {
    pub key: CompositeKey,
    pub first: u64,
    pub duplicate: u64,
}

/// Build the COUNT aggregation for `grouping ++ distinction` fields.
pub fn build_request(
    config: &AggregationCountConfig,
    timerange: &TimeRange,
    batch_size: usize,
) -> AggregationRequest {
    AggregationRequest {
        group_by: config.group_by(),
        series: vec![AggregationSeries::count()],
        streams: BTreeSet::from([config.stream().to_string()]),
        query: config.search_query().to_string(),
        timerange: *timerange,
        batch_size,
    }
}

/// Run the aggregation and convert it into a [`TermsResult`].
///
/// Backend failures are returned to the caller, which decides whether to
/// degrade to an empty result.
pub async fn fetch_terms(
    aggregator: &dyn AggregationBackend,
    config: &AggregationCountConfig,
    timerange: &TimeRange,
    batch_size: usize,
) -> Result<TermsResult, EvaluationError> {
    let request = build_request(config, timerange, batch_size);
    let response = aggregator
        .aggregate(&request)
        .await
        .map_err(EvaluationError::backend("aggregation"))?;

    debug!(
        stream = %config.stream(),
        rows = response.rows.len(),
        total = response.total_aggregated_messages,
        "aggregation returned"
    );

    Ok(convert_response(&request.group_by, response))
}

/// Convert raw rows into composite-key counts.
///
/// A duplicate-free merge is tried first. If the backend repeated a key,
/// every collision is logged and the mapping is rebuilt last-write-wins,
/// keeping the position where the key was first seen.
pub fn convert_response(group_by: &[String], response: AggregationResponse) -> TermsResult {
    let rows: Vec<(CompositeKey, u64)> = response
        .rows
        .into_iter()
        .map(|row| convert_row(group_by, row))
        .collect();

    let terms = match merge_strict(&rows) {
        Ok(terms) => terms,
        Err(collisions) => {
            for c in &collisions {
                warn!(
                    key = %c.key,
                    first = c.first,
                    duplicate = c.duplicate,
                    "duplicate aggregation bucket key, keeping last value"
                );
            }
            merge_last_write_wins(rows)
        }
    };

    TermsResult {
        terms,
        total: response.total_aggregated_messages,
    }
}

fn convert_row(group_by: &[String], row: AggregationRow) -> (CompositeKey, u64) {
    if row.key.len() != group_by.len() {
        warn!(
            expected = group_by.len(),
            got = row.key.len(),
            key = ?row.key,
            "aggregation key length does not match group-by fields"
        );
    }
    (CompositeKey::from_values(group_by, row.key), count_value(row.value))
}

/// Series values arrive as floats; counts are truncated and clamped at zero.
fn count_value(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

fn merge_strict(rows: &[(CompositeKey, u64)]) -> Result<IndexMap<CompositeKey, u64>, Vec<KeyCollision>> {
    let mut terms = IndexMap::with_capacity(rows.len());
    let mut collisions = Vec::new();
    for (key, count) in rows {
        if let Some(first) = terms.get(key) {
            collisions.push(KeyCollision {
                key: key.clone(),
                first: *first,
                duplicate: *count,
            });
        } else {
            terms.insert(key.clone(), *count);
        }
    }
    if collisions.is_empty() {
        Ok(terms)
    } else {
        Err(collisions)
    }
}

fn merge_last_write_wins(rows: Vec<(CompositeKey, u64)>) -> IndexMap<CompositeKey, u64> {
    let mut terms = IndexMap::with_capacity(rows.len());
    for (key, count) in rows {
        terms.insert(key, count);
    }
    terms
}
