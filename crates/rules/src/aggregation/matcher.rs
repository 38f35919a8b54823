//! Primary threshold per composite key, bucketed by grouping key.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::keys::{CompositeKey, GroupingKey};
use crate::threshold::EvaluationStrategy;

use super::terms::TermsResult;

/// Composite keys that passed the primary threshold, grouped by grouping key.
///
/// Group order and key order inside a group follow discovery order in
/// the terms result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchedTerms {
    groups: IndexMap<GroupingKey, Vec<CompositeKey>>,
    rule_count: Option<u64>,
}

impl MatchedTerms {
    /// Count of the first composite key that passed the primary threshold,
    /// or 0 when none did.
    pub fn rule_count(&self) -> u64 {
        self.rule_count.unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> impl Iterator<Item = (&GroupingKey, &[CompositeKey])> {
        self.groups.iter().map(|(g, keys)| (g, keys.as_slice()))
    }

    /// Groups whose cardinality passes the aggregate threshold.
    pub fn passing_groups<'a>(
        &'a self,
        strategy: &'a EvaluationStrategy,
    ) -> impl Iterator<Item = (&'a GroupingKey, &'a [CompositeKey])> + 'a {
        self.groups().filter(move |(group, keys)| {
            let passes = strategy.group_passes(keys.len());
            debug!(group = %group, aggregates = keys.len(), passes, "grouping bucket evaluated");
            passes
        })
    }
}

/// Apply the primary threshold to every bucket and group the survivors.
pub fn collect_matches(
    terms: &TermsResult,
    strategy: &EvaluationStrategy,
    grouping_fields: &BTreeSet<String>,
) -> MatchedTerms {
    let mut matched = MatchedTerms::default();

    for (key, count) in terms.iter() {
        if !strategy.key_passes(count) {
            continue;
        }
        matched
            .groups
            .entry(key.grouping_key(grouping_fields))
            .or_default()
            .push(key.clone());
        if matched.rule_count.is_none() {
            matched.rule_count = Some(count);
        }
    }

    matched
}
