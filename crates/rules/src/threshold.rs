//! Threshold predicates and the two-stage evaluation strategy.
//!
//! A [`ThresholdRule`] compares one count against a bound. The grouped
//! pipeline applies two of them: a *primary* test on each composite key's
//! raw count, and an *aggregate* test on how many keys ended up in each
//! grouping bucket. [`EvaluationStrategy`] says which of the two carries
//! the configured rule.

use crate::schema::{AggregationCountConfig, ThresholdType};

/// `(kind, bound)` predicate over a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdRule {
    pub threshold_type: ThresholdType,
    pub bound: u64,
}

impl ThresholdRule {
    pub fn new(threshold_type: ThresholdType, bound: u64) -> Self {
        Self {
            threshold_type,
            bound,
        }
    }

    /// The rule a configuration declares.
    pub fn from_config(config: &AggregationCountConfig) -> Self {
        Self::new(config.threshold_type(), config.threshold())
    }

    /// `MORE` fires on `count > bound`, `LESS` on `count < bound`.
    /// A count equal to the bound never fires.
    pub fn is_triggered(&self, count: u64) -> bool {
        match self.threshold_type {
            ThresholdType::More => count > self.bound,
            ThresholdType::Less => count < self.bound,
        }
    }
}

/// How the grouped pipeline composes its two threshold stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationStrategy {
    /// No distinction fields: each composite key's count is tested against
    /// the configured rule, and every grouping bucket that received at least
    /// one surviving key passes.
    PrimaryThenAggregate { primary: ThresholdRule },
    /// Distinction fields present: every observed (non-zero) composite key qualifies,
    /// and the configured rule is applied to the number of distinct keys per
    /// grouping bucket.
    AggregateOnly { aggregate: ThresholdRule },
}

impl EvaluationStrategy {
    pub fn for_config(config: &AggregationCountConfig) -> Self {
        let rule = ThresholdRule::from_config(config);
        if config.distinction_fields().is_empty() {
            EvaluationStrategy::PrimaryThenAggregate { primary: rule }
        } else {
            EvaluationStrategy::AggregateOnly { aggregate: rule }
        }
    }

    /// Primary test on a single composite key's count.
    pub fn key_passes(&self, count: u64) -> bool {
        match self {
            EvaluationStrategy::PrimaryThenAggregate { primary } => primary.is_triggered(count),
            EvaluationStrategy::AggregateOnly { .. } => count > 0,
        }
    }

    /// Aggregate test on the number of keys collected for one grouping bucket.
    pub fn group_passes(&self, cardinality: usize) -> bool {
        match self {
            EvaluationStrategy::PrimaryThenAggregate { .. } => cardinality > 0,
            EvaluationStrategy::AggregateOnly { aggregate } => {
                aggregate.is_triggered(cardinality as u64)
            }
        }
    }

    /// Whether the final message number is the evidence size (distinct
    /// counting) rather than the first passing key's raw count.
    pub fn counts_distinct_values(&self) -> bool {
        matches!(self, EvaluationStrategy::AggregateOnly { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn more_and_less_are_strict() {
        let cases = vec![
            (ThresholdType::More, 9, 10, true),
            (ThresholdType::More, 9, 9, false),
            (ThresholdType::More, 9, 0, false),
            (ThresholdType::Less, 2, 1, true),
            (ThresholdType::Less, 2, 2, false),
            (ThresholdType::Less, 2, 3, false),
            (ThresholdType::Less, 0, 0, false),
        ];

        for (kind, bound, count, expected) in cases {
            assert_eq!(
                ThresholdRule::new(kind, bound).is_triggered(count),
                expected,
                "{:?} {} vs count {}",
                kind,
                bound,
                count
            );
        }
    }

    #[test]
    fn equal_count_never_triggers() {
        for bound in [0, 1, 7, 500] {
            assert!(!ThresholdRule::new(ThresholdType::More, bound).is_triggered(bound));
            assert!(!ThresholdRule::new(ThresholdType::Less, bound).is_triggered(bound));
        }
    }

    #[test]
    fn grouping_only_uses_configured_rule_per_key() {
        let config = AggregationCountConfig::builder("s")
            .grouping_fields(["user"])
            .threshold(ThresholdType::More, 2)
            .build()
            .unwrap();
        let strategy = EvaluationStrategy::for_config(&config);

        assert!(matches!(strategy, EvaluationStrategy::PrimaryThenAggregate { .. }));
        assert!(strategy.key_passes(3));
        assert!(!strategy.key_passes(2));
        assert!(strategy.group_passes(1));
        assert!(!strategy.group_passes(0));
        assert!(!strategy.counts_distinct_values());
    }

    #[test]
    fn distinct_fields_move_rule_to_aggregate_stage() {
        let config = AggregationCountConfig::builder("s")
            .grouping_fields(["user"])
            .distinction_fields(["ip_src"])
            .threshold(ThresholdType::Less, 2)
            .build()
            .unwrap();
        let strategy = EvaluationStrategy::for_config(&config);

        assert!(matches!(strategy, EvaluationStrategy::AggregateOnly { .. }));
        assert!(strategy.key_passes(1));
        assert!(strategy.key_passes(1_000));
        assert!(!strategy.key_passes(0));
        assert!(strategy.group_passes(1));
        assert!(!strategy.group_passes(2));
        assert!(!strategy.group_passes(3));
        assert!(strategy.counts_distinct_values());
    }
}
