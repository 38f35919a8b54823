//! Composite bucket keys and their grouping sub-keys.
//!
//! Keys are kept as ordered `(field, value)` pairs. The separator-joined
//! string form only exists for display and log lines, so a value that
//! happens to contain the separator cannot shift field boundaries.

use std::collections::BTreeSet;
use std::fmt;

/// Separator used when rendering a composite key as a single string.
pub const KEY_SEPARATOR: &str = " - ";

/// Prefix of a rendered grouping key.
pub const GROUPING_KEY_PREFIX: &str = "Agregates:";

/// One aggregation bucket: the values of the group-by fields, in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    entries: Vec<(String, String)>,
}

impl CompositeKey {
    /// Pair `fields` with `values` position by position.
    ///
    /// Extra fields or extra values are dropped; callers that care about a
    /// length mismatch check before building the key.
    pub fn from_values(fields: &[String], values: Vec<String>) -> Self {
        Self {
            entries: fields.iter().cloned().zip(values).collect(),
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values joined by [`KEY_SEPARATOR`].
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(_, v)| v.as_str())
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }

    /// Sub-key made of the positions whose field is a grouping field.
    ///
    /// With no grouping fields every composite key maps to the same empty
    /// grouping key.
    pub fn grouping_key(&self, grouping_fields: &BTreeSet<String>) -> GroupingKey {
        GroupingKey {
            values: self
                .entries
                .iter()
                .filter(|(field, _)| grouping_fields.contains(field))
                .map(|(_, value)| value.clone())
                .collect(),
        }
    }

    /// Search query selecting the messages of this bucket:
    /// `<base> AND <f1>: "<v1>" AND <f2>: "<v2>" …`.
    pub fn evidence_query(&self, base_query: &str) -> String {
        let mut query = base_query.to_string();
        for (field, value) in &self.entries {
            query.push_str(" AND ");
            query.push_str(field);
            query.push_str(": \"");
            query.push_str(&escape_value(value));
            query.push('"');
        }
        query
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Escape a value for use inside a double-quoted query term.
pub(crate) fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Values of the grouping-field positions of a composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupingKey {
    values: Vec<String>,
}

impl GroupingKey {
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", GROUPING_KEY_PREFIX, self.values.join(KEY_SEPARATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn key(names: &[&str], values: &[&str]) -> CompositeKey {
        CompositeKey::from_values(&fields(names), values.iter().map(|s| s.to_string()).collect())
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn renders_with_separator() {
        let k = key(&["ip_src", "user"], &["10.0.0.1", "alice"]);
        assert_eq!(k.render(), "10.0.0.1 - alice");
        assert_eq!(k.to_string(), "10.0.0.1 - alice");
    }

    #[test]
    fn grouping_key_keeps_only_grouping_positions() {
        let k = key(&["ip_src", "user", "port"], &["10.0.0.1", "alice", "22"]);
        let g = k.grouping_key(&set(&["ip_src", "port"]));
        assert_eq!(g.values(), &["10.0.0.1".to_string(), "22".to_string()]);
        assert_eq!(g.to_string(), "Agregates:10.0.0.1 - 22");
    }

    #[test]
    fn no_grouping_fields_collapse_to_one_group() {
        let a = key(&["user"], &["alice"]).grouping_key(&BTreeSet::new());
        let b = key(&["user"], &["bob"]).grouping_key(&BTreeSet::new());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Agregates:");
    }

    #[test]
    fn field_in_both_sets_counts_for_grouping() {
        // group-by = grouping ++ distinction = [ip_src, user, user]
        let k = key(&["ip_src", "user", "user"], &["user", "ip1"]);
        assert_eq!(k.len(), 2);
        let g = k.grouping_key(&set(&["ip_src", "user"]));
        assert_eq!(g.values(), &["user".to_string(), "ip1".to_string()]);
    }

    #[test]
    fn separator_inside_value_does_not_shift_fields() {
        let k = key(&["app", "user"], &["a - b", "carol"]);
        let g = k.grouping_key(&set(&["user"]));
        assert_eq!(g.values(), &["carol".to_string()]);
        assert_eq!(
            k.evidence_query("*"),
            r#"* AND app: "a - b" AND user: "carol""#
        );
    }

    #[test]
    fn evidence_query_escapes_backslashes_and_quotes() {
        let k = key(&["path", "user"], &[r"C:\temp", r#"say "hi""#]);
        assert_eq!(
            k.evidence_query("action:login"),
            r#"action:login AND path: "C:\\temp" AND user: "say \"hi\"""#
        );
    }

    #[test]
    fn evidence_query_for_empty_key_is_base_query() {
        let k = key(&[], &[]);
        assert!(k.is_empty());
        assert_eq!(k.evidence_query("*"), "*");
    }
}
