use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Absolute time window an evaluation runs over.
///
/// Both bounds are inclusive, matching the `gte`/`lte` range filter the
/// search backend applies. `from` is always strictly before `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimeRangeDocument", into = "TimeRangeDocument")]
pub struct TimeRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

/// Serialized shape of [`TimeRange`]; deserialized ranges are validated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeRangeDocument {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TryFrom<TimeRangeDocument> for TimeRange {
    type Error = CoreError;

    fn try_from(doc: TimeRangeDocument) -> Result<Self, Self::Error> {
        Self::new(doc.from, doc.to)
    }
}

impl From<TimeRange> for TimeRangeDocument {
    fn from(range: TimeRange) -> Self {
        Self {
            from: range.from,
            to: range.to,
        }
    }
}

impl TimeRange {
    /// Build an absolute range, rejecting empty or inverted windows.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, CoreError> {
        if to <= from {
            return Err(CoreError::InvalidTimeRange(format!(
                "to ({}) must be after from ({})",
                to, from
            )));
        }
        Ok(Self { from, to })
    }

    /// The window of `seconds` ending at `now`.
    pub fn relative_to(now: DateTime<Utc>, seconds: u32) -> Result<Self, CoreError> {
        if seconds == 0 {
            return Err(CoreError::InvalidTimeRange(
                "relative range must span at least one second".to_string(),
            ));
        }
        Self::new(now - Duration::seconds(i64::from(seconds)), now)
    }

    /// The window of `seconds` ending now.
    pub fn last_seconds(seconds: u32) -> Result<Self, CoreError> {
        Self::relative_to(Utc::now(), seconds)
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.from && ts <= self.to
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.from.to_rfc3339(), self.to.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn rejects_inverted_and_empty_ranges() {
        assert!(TimeRange::new(at(2), at(1)).is_err());
        assert!(TimeRange::new(at(1), at(1)).is_err());
        assert!(TimeRange::new(at(1), at(2)).is_ok());
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = TimeRange::new(at(1), at(3)).unwrap();
        assert!(range.contains(at(1)));
        assert!(range.contains(at(2)));
        assert!(range.contains(at(3)));
        assert!(!range.contains(at(4)));
    }

    #[test]
    fn relative_range_ends_at_now() {
        let range = TimeRange::relative_to(at(5), 3600).unwrap();
        assert_eq!(range.from(), at(4));
        assert_eq!(range.to(), at(5));
        assert!(TimeRange::relative_to(at(5), 0).is_err());
    }

    #[test]
    fn deserialized_ranges_are_validated() {
        let range: TimeRange = serde_json::from_str(
            r#"{"from":"2024-03-01T01:00:00Z","to":"2024-03-01T02:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(range, TimeRange::new(at(1), at(2)).unwrap());
        assert_eq!(
            serde_json::from_value::<TimeRange>(serde_json::to_value(range).unwrap()).unwrap(),
            range
        );

        let inverted = serde_json::from_str::<TimeRange>(
            r#"{"from":"2024-03-01T02:00:00Z","to":"2024-03-01T01:00:00Z"}"#,
        );
        let err = inverted.unwrap_err().to_string();
        assert!(err.contains("must be after"), "{err}");
    }
}
