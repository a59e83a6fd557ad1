//! Interval records, the single persisted data type.

use serde::{Deserialize, Serialize};

/// One start/stop pair. `end` stays `None` while the interval is still running.
///
/// Timestamps are epoch milliseconds. The field names match the persisted
/// layout (`Start` / `End`), and `End` is omitted entirely while running.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntervalRecord {
    #[serde(rename = "Start")]
    pub start: i64,
    #[serde(rename = "End", default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

impl IntervalRecord {
    pub fn started_at(start: i64) -> Self {
        Self { start, end: None }
    }

    pub fn is_running(&self) -> bool {
        self.end.is_none()
    }

    /// `end - start` for a completed record, `None` while running.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end.map(|end| end.saturating_sub(self.start))
    }

    /// Copy of this record closed at `end`. An already closed record keeps its end.
    pub fn finished_at(&self, end: i64) -> Self {
        Self {
            start: self.start,
            end: Some(self.end.unwrap_or(end)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_record_omits_end_field() {
        let json = serde_json::to_string(&IntervalRecord::started_at(1000)).unwrap();
        assert_eq!(json, r#"{"Start":1000}"#);
    }

    #[test]
    fn completed_record_uses_capitalised_fields() {
        let record: IntervalRecord = serde_json::from_str(r#"{"Start":1000,"End":5000}"#).unwrap();
        assert_eq!(record.start, 1000);
        assert_eq!(record.end, Some(5000));
        assert_eq!(record.duration_ms(), Some(4000));
        assert!(!record.is_running());
    }

    #[test]
    fn extreme_timestamps_saturate() {
        let record = IntervalRecord {
            start: i64::MIN,
            end: Some(i64::MAX),
        };
        assert_eq!(record.duration_ms(), Some(i64::MAX));
    }

    #[test]
    fn finishing_keeps_an_existing_end() {
        let closed = IntervalRecord { start: 0, end: Some(10) };
        assert_eq!(closed.finished_at(99).end, Some(10));

        let open = IntervalRecord::started_at(5);
        assert_eq!(open.finished_at(99), IntervalRecord { start: 5, end: Some(99) });
    }
}
