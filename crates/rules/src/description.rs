//! Trigger descriptions and check results.

use aggcount_core::EvidenceMessage;
use serde::Serialize;

use crate::schema::AggregationCountConfig;

/// Outcome of one check: a description and the evidence backing it.
///
/// The empty result (no description, no evidence) means "not triggered".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckResult {
    pub description: String,
    pub evidence: Vec<EvidenceMessage>,
}

impl CheckResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_triggered(&self) -> bool {
        !self.evidence.is_empty()
    }
}

/// Renders trigger descriptions from a template compiled once per
/// configuration. Only the message number varies between builds.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBuilder {
    prefix: String,
    suffix: String,
}

impl ResultBuilder {
    pub fn new(config: &AggregationCountConfig) -> Self {
        let prefix = "Stream had ".to_string();

        let mut suffix = format!(
            " messages in the last {} milliseconds with trigger condition {} than {} messages",
            config.search_within_ms(),
            config.threshold_type().description_word(),
            config.threshold()
        );

        let grouping = config.grouping_fields();
        let distinction = config.distinction_fields();

        if !grouping.is_empty() {
            suffix.push_str(" with the same value of the fields ");
            suffix.push_str(&join_fields(grouping.iter()));
        }
        if !grouping.is_empty() && !distinction.is_empty() {
            suffix.push_str(", and");
        }
        if !distinction.is_empty() {
            suffix.push_str(" with distinct values of the fields ");
            suffix.push_str(&join_fields(distinction.iter()));
        }

        suffix.push_str(&format!(
            ". (Executes every: {} milliseconds)",
            config.execute_every_ms()
        ));

        Self { prefix, suffix }
    }

    pub fn build(&self, message_number: u64, evidence: Vec<EvidenceMessage>) -> CheckResult {
        CheckResult {
            description: self.describe(message_number),
            evidence,
        }
    }

    pub fn build_empty(&self) -> CheckResult {
        CheckResult::empty()
    }

    pub fn describe(&self, message_number: u64) -> String {
        format!("{}{}{}", self.prefix, message_number, self.suffix)
    }
}

fn join_fields<'a>(fields: impl Iterator<Item = &'a String>) -> String {
    fields.map(|f| f.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ThresholdType;

    fn config(kind: ThresholdType, threshold: u64, grouping: &[&str], distinction: &[&str]) -> AggregationCountConfig {
        AggregationCountConfig::builder("main stream")
            .grouping_fields(grouping.iter().copied())
            .distinction_fields(distinction.iter().copied())
            .threshold(kind, threshold)
            .build()
            .unwrap()
    }

    #[test]
    fn no_fields_description() {
        let builder = ResultBuilder::new(&config(ThresholdType::More, 9, &[], &[]));
        assert_eq!(
            builder.describe(10),
            "Stream had 10 messages in the last 0 milliseconds with trigger condition more than 9 messages. (Executes every: 0 milliseconds)"
        );
    }

    #[test]
    fn grouping_fields_are_listed_lexically() {
        let builder = ResultBuilder::new(&config(ThresholdType::More, 2, &["user", "ip_src"], &[]));
        assert_eq!(
            builder.describe(3),
            "Stream had 3 messages in the last 0 milliseconds with trigger condition more than 2 messages with the same value of the fields ip_src, user. (Executes every: 0 milliseconds)"
        );
    }

    #[test]
    fn both_field_sets_are_joined_with_and() {
        let builder = ResultBuilder::new(&config(ThresholdType::Less, 2, &["user", "ip_src"], &["user"]));
        assert_eq!(
            builder.describe(1),
            "Stream had 1 messages in the last 0 milliseconds with trigger condition less than 2 messages with the same value of the fields ip_src, user, and with distinct values of the fields user. (Executes every: 0 milliseconds)"
        );
    }

    #[test]
    fn distinction_only_description() {
        let builder = ResultBuilder::new(&config(ThresholdType::More, 4, &[], &["ip_src"]));
        assert!(builder
            .describe(5)
            .ends_with("more than 4 messages with distinct values of the fields ip_src. (Executes every: 0 milliseconds)"));
    }

    #[test]
    fn window_and_interval_are_rendered() {
        let config = AggregationCountConfig::builder("s")
            .threshold(ThresholdType::More, 0)
            .search_within_ms(120000)
            .execute_every_ms(60000)
            .build()
            .unwrap();
        let text = ResultBuilder::new(&config).describe(1234);
        assert!(text.starts_with("Stream had 1234 messages in the last 120000 milliseconds"));
        assert!(text.ends_with("(Executes every: 60000 milliseconds)"));
    }

    #[test]
    fn empty_result_is_not_triggered() {
        let builder = ResultBuilder::new(&config(ThresholdType::More, 1, &[], &[]));
        let empty = builder.build_empty();
        assert_eq!(empty.description, "");
        assert!(empty.evidence.is_empty());
        assert!(!empty.is_triggered());
    }
}
