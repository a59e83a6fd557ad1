use crate::models::IntervalRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerStatus {
    #[default]
    Stopped,
    Running {
        /// Start of the open record; elapsed time is measured from here.
        anchor_ms: i64,
    },
}

impl TimerStatus {
    /// Status implied by the persisted list: running iff the last record is open.
    pub fn from_records(records: &[IntervalRecord]) -> Self {
        match records.last() {
            Some(last) if last.is_running() => TimerStatus::Running {
                anchor_ms: last.start,
            },
            _ => TimerStatus::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TimerStatus::Running { .. })
    }

    pub fn anchor_ms(&self) -> Option<i64> {
        match self {
            TimerStatus::Running { anchor_ms } => Some(*anchor_ms),
            TimerStatus::Stopped => None,
        }
    }

    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        match self {
            TimerStatus::Running { anchor_ms } => now_ms.saturating_sub(*anchor_ms).max(0),
            TimerStatus::Stopped => 0,
        }
    }
}
