//! Aggregation-count configuration: stream, query, field sets and threshold.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Direction of the threshold comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdType {
    /// Trigger when the count is strictly above the bound.
    More,
    /// Trigger when the count is strictly below the bound.
    Less,
}

impl ThresholdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdType::More => "MORE",
            ThresholdType::Less => "LESS",
        }
    }

    /// Lowercase word used in trigger descriptions ("more than …").
    pub fn description_word(&self) -> &'static str {
        match self {
            ThresholdType::More => "more",
            ThresholdType::Less => "less",
        }
    }
}

impl fmt::Display for ThresholdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThresholdType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MORE" => Ok(ThresholdType::More),
            "LESS" => Ok(ThresholdType::Less),
            _ => Err(ConfigError::UnknownThresholdType(s.to_string())),
        }
    }
}

/// Serialized shape of [`AggregationCountConfig`].
///
/// Deserialization goes through this struct so that every configuration
/// that reaches the engine has already been validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    pub stream: String,
    #[serde(default = "default_query")]
    pub search_query: String,
    #[serde(default)]
    pub grouping_fields: Vec<String>,
    #[serde(default)]
    pub distinction_fields: Vec<String>,
    pub threshold_type: String,
    pub threshold: u64,
    #[serde(default)]
    pub search_within_ms: u64,
    #[serde(default)]
    pub execute_every_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

fn default_query() -> String {
    "*".to_string()
}

/// Immutable, validated settings of one aggregation-count definition.
///
/// Field sets are kept in lexical order; that order fixes the layout of
/// composite bucket keys and the rendering of trigger descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigDocument", into = "ConfigDocument")]
pub struct AggregationCountConfig {
    stream: String,
    search_query: String,
    grouping_fields: BTreeSet<String>,
    distinction_fields: BTreeSet<String>,
    threshold_type: ThresholdType,
    threshold: u64,
    search_within_ms: u64,
    execute_every_ms: u64,
    comment: Option<String>,
}

impl AggregationCountConfig {
    /// Start building a configuration for `stream`.
    pub fn builder(stream: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder {
            doc: ConfigDocument {
                stream: stream.into(),
                search_query: default_query(),
                grouping_fields: Vec::new(),
                distinction_fields: Vec::new(),
                threshold_type: ThresholdType::More.as_str().to_string(),
                threshold: 0,
                search_within_ms: 0,
                execute_every_ms: 0,
                comment: None,
            },
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn grouping_fields(&self) -> &BTreeSet<String> {
        &self.grouping_fields
    }

    pub fn distinction_fields(&self) -> &BTreeSet<String> {
        &self.distinction_fields
    }

    pub fn threshold_type(&self) -> ThresholdType {
        self.threshold_type
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn search_within_ms(&self) -> u64 {
        self.search_within_ms
    }

    pub fn execute_every_ms(&self) -> u64 {
        self.execute_every_ms
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Whether any grouping or distinction field is configured.
    pub fn has_fields(&self) -> bool {
        !(self.grouping_fields.is_empty() && self.distinction_fields.is_empty())
    }

    /// Aggregation group-by list: grouping fields followed by distinction fields.
    pub fn group_by(&self) -> Vec<String> {
        self.grouping_fields
            .iter()
            .chain(self.distinction_fields.iter())
            .cloned()
            .collect()
    }
}

impl TryFrom<ConfigDocument> for AggregationCountConfig {
    type Error = ConfigError;

    fn try_from(doc: ConfigDocument) -> Result<Self, Self::Error> {
        let stream = doc.stream.trim().to_string();
        if stream.is_empty() {
            return Err(ConfigError::EmptyStream);
        }

        let search_query = match doc.search_query.trim() {
            "" => default_query(),
            q => q.to_string(),
        };

        Ok(Self {
            stream,
            search_query,
            grouping_fields: field_set(doc.grouping_fields, "grouping_fields")?,
            distinction_fields: field_set(doc.distinction_fields, "distinction_fields")?,
            threshold_type: doc.threshold_type.parse()?,
            threshold: doc.threshold,
            search_within_ms: doc.search_within_ms,
            execute_every_ms: doc.execute_every_ms,
            comment: doc.comment,
        })
    }
}

impl From<AggregationCountConfig> for ConfigDocument {
    fn from(config: AggregationCountConfig) -> Self {
        Self {
            stream: config.stream,
            search_query: config.search_query,
            grouping_fields: config.grouping_fields.into_iter().collect(),
            distinction_fields: config.distinction_fields.into_iter().collect(),
            threshold_type: config.threshold_type.as_str().to_string(),
            threshold: config.threshold,
            search_within_ms: config.search_within_ms,
            execute_every_ms: config.execute_every_ms,
            comment: config.comment,
        }
    }
}

fn field_set(fields: Vec<String>, path: &'static str) -> Result<BTreeSet<String>, ConfigError> {
    fields
        .into_iter()
        .map(|f| {
            let f = f.trim().to_string();
            if f.is_empty() {
                Err(ConfigError::EmptyFieldName(path))
            } else {
                Ok(f)
            }
        })
        .collect()
}

/// Builder for [`AggregationCountConfig`], validated on [`ConfigBuilder::build`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    doc: ConfigDocument,
}

impl ConfigBuilder {
    pub fn search_query(mut self, query: impl Into<String>) -> Self {
        self.doc.search_query = query.into();
        self
    }

    pub fn grouping_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.doc.grouping_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn distinction_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.doc.distinction_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn threshold(mut self, threshold_type: ThresholdType, threshold: u64) -> Self {
        self.doc.threshold_type = threshold_type.as_str().to_string();
        self.doc.threshold = threshold;
        self
    }

    pub fn search_within_ms(mut self, ms: u64) -> Self {
        self.doc.search_within_ms = ms;
        self
    }

    pub fn execute_every_ms(mut self, ms: u64) -> Self {
        self.doc.execute_every_ms = ms;
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.doc.comment = Some(comment.into());
        self
    }

    pub fn build(self) -> Result<AggregationCountConfig, ConfigError> {
        AggregationCountConfig::try_from(self.doc)
    }
}
