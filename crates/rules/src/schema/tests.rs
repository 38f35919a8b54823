//! Tests for schema types.

use super::*;
use crate::error::ConfigError;

const SSH_DEFINITION_YAML: &str = r#"
apiVersion: v1
kind: AggregationCount
metadata:
  id: ssh-bruteforce
  name: SSH brute force
  description: Many failed logins from one source
  tags: [security, ssh]
  priority: 3
config:
  stream: "000000000000000000000001"
  search_query: "action:login_failed"
  grouping_fields: [user, ip_src]
  threshold_type: MORE
  threshold: 5
  search_within_ms: 300000
  execute_every_ms: 60000
"#;

#[test]
fn parse_full_definition() {
    let def = EventDefinition::from_yaml_str(SSH_DEFINITION_YAML).unwrap();

    assert_eq!(def.id(), "ssh-bruteforce");
    assert_eq!(def.title(), "SSH brute force");
    assert_eq!(def.metadata.priority, 3);
    assert!(def.metadata.enabled);

    let config = &def.config;
    assert_eq!(config.stream(), "000000000000000000000001");
    assert_eq!(config.search_query(), "action:login_failed");
    assert_eq!(config.threshold_type(), ThresholdType::More);
    assert_eq!(config.threshold(), 5);
    assert_eq!(config.search_within_ms(), 300000);
    assert_eq!(config.execute_every_ms(), 60000);
    // Lexical order regardless of document order
    let grouping: Vec<&str> = config.grouping_fields().iter().map(|s| s.as_str()).collect();
    assert_eq!(grouping, vec!["ip_src", "user"]);
    assert!(config.distinction_fields().is_empty());
    assert!(config.has_fields());
}

#[test]
fn query_defaults_to_wildcard() {
    let yaml = r#"
stream: s1
threshold_type: LESS
threshold: 1
"#;
    let config: AggregationCountConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.search_query(), "*");
    assert_eq!(config.threshold_type(), ThresholdType::Less);
    assert!(!config.has_fields());
}

#[test]
fn blank_query_becomes_wildcard() {
    let config = AggregationCountConfig::builder("s1")
        .search_query("   ")
        .build()
        .unwrap();
    assert_eq!(config.search_query(), "*");
}

#[test]
fn empty_stream_is_rejected() {
    let err = AggregationCountConfig::builder("  ").build().unwrap_err();
    assert_eq!(err, ConfigError::EmptyStream);

    let yaml = "stream: ''\nthreshold_type: MORE\nthreshold: 1\n";
    assert!(serde_yaml::from_str::<AggregationCountConfig>(yaml).is_err());
}

#[test]
fn unknown_threshold_type_is_rejected() {
    let yaml = "stream: s1\nthreshold_type: EQUAL\nthreshold: 1\n";
    let err = serde_yaml::from_str::<AggregationCountConfig>(yaml).unwrap_err();
    assert!(err.to_string().contains("unknown threshold type"));
}

#[test]
fn threshold_type_parsing_is_case_insensitive() {
    assert_eq!("more".parse::<ThresholdType>().unwrap(), ThresholdType::More);
    assert_eq!(" Less ".parse::<ThresholdType>().unwrap(), ThresholdType::Less);
    assert!("".parse::<ThresholdType>().is_err());
}

#[test]
fn empty_field_name_is_rejected() {
    let err = AggregationCountConfig::builder("s1")
        .grouping_fields(["user", " "])
        .build()
        .unwrap_err();
    assert_eq!(err, ConfigError::EmptyFieldName("grouping_fields"));
}

#[test]
fn group_by_concatenates_grouping_then_distinction() {
    let config = AggregationCountConfig::builder("s1")
        .grouping_fields(["user", "ip_src"])
        .distinction_fields(["user"])
        .build()
        .unwrap();
    assert_eq!(config.group_by(), vec!["ip_src", "user", "user"]);
}

#[test]
fn unknown_config_fields_are_rejected() {
    let yaml = "stream: s1\nthreshold_type: MORE\nthreshold: 1\nwindow: 5m\n";
    assert!(serde_yaml::from_str::<AggregationCountConfig>(yaml).is_err());
}

#[test]
fn wrong_kind_fails_validation() {
    let yaml = SSH_DEFINITION_YAML.replace("kind: AggregationCount", "kind: CorrelationCount");
    let err = EventDefinition::from_yaml_str(&yaml).unwrap_err();
    assert!(err.to_string().contains("unsupported definition kind"));
}

#[test]
fn config_serializes_back_to_document() {
    let config = AggregationCountConfig::builder("s1")
        .grouping_fields(["b", "a"])
        .threshold(ThresholdType::Less, 4)
        .build()
        .unwrap();
    let yaml = serde_yaml::to_string(&config).unwrap();
    assert!(yaml.contains("threshold_type: LESS"));

    let parsed: AggregationCountConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed, config);
}
