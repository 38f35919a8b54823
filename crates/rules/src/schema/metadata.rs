//! Metadata block shared by every event definition document.

use serde::{Deserialize, Serialize};

/// Identity and bookkeeping for an event definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CommonMetadata {
    pub id: String,
    /// Human-readable title, used in log lines and precondition errors.
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

pub(crate) fn default_true() -> bool {
    true
}

fn default_priority() -> u8 {
    2
}
