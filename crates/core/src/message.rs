use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Default index name for messages that do not carry one.
pub const DEFAULT_INDEX: &str = "messages_0";

/// A stored log message: identity, timestamp, stream membership and a flat
/// map of named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub streams: Vec<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Message {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            streams: Vec::new(),
            fields: Map::new(),
        }
    }

    /// Builder-style helper to add the message to a stream.
    pub fn in_stream(mut self, stream: impl Into<String>) -> Self {
        self.streams.push(stream.into());
        self
    }

    /// Builder-style helper to set a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Field value rendered the way the search backend buckets it.
    ///
    /// Strings are returned verbatim, numbers and booleans in their JSON
    /// form. `null`, arrays and objects have no term value.
    pub fn term(&self, name: &str) -> Option<String> {
        match name {
            "_id" | "id" => return Some(self.id.clone()),
            "timestamp" => return Some(self.timestamp.to_rfc3339()),
            _ => {}
        }
        match self.fields.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Full message as a JSON object, including the reserved fields.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A message as returned by a search: the index it lives in plus its body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(flatten)]
    pub message: Message,
}

fn default_index() -> String {
    DEFAULT_INDEX.to_string()
}

impl ResultMessage {
    pub fn new(index: impl Into<String>, message: Message) -> Self {
        Self {
            index: index.into(),
            message,
        }
    }

    /// Parse one line of a JSON-lines message dump.
    pub fn from_json_line(line: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(line)?;
        if !value.is_object() {
            return Err(CoreError::InvalidMessage(format!(
                "expected a JSON object, got: {}",
                line
            )));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Representative message attached to a trigger as evidence.
///
/// Opaque handle into the message store; the engine never interprets the
/// raw message beyond what it needs to build queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceMessage {
    pub source_index: String,
    pub id: String,
    pub raw_message: Value,
}

impl From<ResultMessage> for EvidenceMessage {
    fn from(result: ResultMessage) -> Self {
        Self {
            id: result.message.id.clone(),
            raw_message: result.message.to_json(),
            source_index: result.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_line_with_flattened_fields() {
        let line = r#"{"index":"graylog_3","_id":"m1","timestamp":"2024-03-01T10:00:00Z","streams":["s1"],"user":"alice","port":22}"#;
        let parsed = ResultMessage::from_json_line(line).unwrap();

        assert_eq!(parsed.index, "graylog_3");
        assert_eq!(parsed.message.id, "m1");
        assert_eq!(parsed.message.streams, vec!["s1"]);
        assert_eq!(parsed.message.term("user").as_deref(), Some("alice"));
        assert_eq!(parsed.message.term("port").as_deref(), Some("22"));
        assert_eq!(parsed.message.term("missing"), None);
    }

    #[test]
    fn missing_index_uses_default() {
        let line = r#"{"id":"m2","timestamp":"2024-03-01T10:00:00Z"}"#;
        let parsed = ResultMessage::from_json_line(line).unwrap();
        assert_eq!(parsed.index, DEFAULT_INDEX);
        assert!(parsed.message.streams.is_empty());
    }

    #[test]
    fn rejects_non_object_lines() {
        assert!(ResultMessage::from_json_line("[1,2]").is_err());
        assert!(ResultMessage::from_json_line("not json").is_err());
    }

    #[test]
    fn evidence_keeps_index_and_id() {
        let ts = "2024-03-01T10:00:00Z".parse().unwrap();
        let msg = Message::new("m9", ts).with_field("user", "bob");
        let evidence = EvidenceMessage::from(ResultMessage::new("idx", msg));

        assert_eq!(evidence.source_index, "idx");
        assert_eq!(evidence.id, "m9");
        assert_eq!(evidence.raw_message["user"], "bob");
        assert_eq!(evidence.raw_message["_id"], "m9");
    }
}
