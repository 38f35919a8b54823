//! Event definition document: envelope, metadata and aggregation-count config.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::{AggregationCountConfig, CommonMetadata};

/// The only definition kind this engine evaluates.
pub const AGGREGATION_COUNT_KIND: &str = "AggregationCount";

/// Top-level event definition parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EventDefinition {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub config: AggregationCountConfig,
}

impl EventDefinition {
    /// Wrap a configuration in a minimal enabled definition.
    pub fn new(id: impl Into<String>, name: impl Into<String>, config: AggregationCountConfig) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: AGGREGATION_COUNT_KIND.to_string(),
            metadata: CommonMetadata {
                id: id.into(),
                name: name.into(),
                description: None,
                tags: None,
                enabled: true,
                priority: 2,
            },
            config,
        }
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, crate::loader::RuleError> {
        let definition: EventDefinition = serde_yaml::from_str(yaml)?;
        definition
            .validate()
            .map_err(|e| crate::loader::RuleError::Validation(e.to_string()))?;
        Ok(definition)
    }

    /// Envelope checks; the config itself is validated while deserializing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kind != AGGREGATION_COUNT_KIND {
            return Err(ConfigError::UnsupportedKind(self.kind.clone()));
        }
        if self.metadata.id.trim().is_empty() {
            return Err(ConfigError::EmptyId);
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn title(&self) -> &str {
        &self.metadata.name
    }
}
