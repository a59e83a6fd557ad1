use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use tokio::sync::watch;

use crate::{
    clock::Clock,
    models::IntervalRecord,
    store::{total_duration, StoreObserver},
    timer::TimerStatus,
};

use super::{LiveReading, Screen};

/// The ticking counter: elapsed time of the open record plus the grand total.
pub struct LiveDisplay {
    status: watch::Receiver<TimerStatus>,
    clock: Arc<dyn Clock>,
    screen: Arc<dyn Screen>,
    /// Total of completed records as of the last store notification.
    completed_ms: AtomicI64,
}

impl LiveDisplay {
    pub fn new(
        status: watch::Receiver<TimerStatus>,
        clock: Arc<dyn Clock>,
        screen: Arc<dyn Screen>,
        records: &[IntervalRecord],
    ) -> Self {
        Self {
            status,
            clock,
            screen,
            completed_ms: AtomicI64::new(total_duration(records)),
        }
    }

    pub fn reading(&self) -> LiveReading {
        let status = *self.status.borrow();
        let current_ms = status.elapsed_ms(self.clock.now_ms());
        LiveReading {
            running: status.is_running(),
            current_ms,
            total_ms: current_ms.saturating_add(self.completed_ms.load(Ordering::SeqCst)),
        }
    }

    pub fn render(&self) {
        self.screen.show_live(&self.reading());
    }
}

impl StoreObserver for LiveDisplay {
    fn store_changed(&self, records: &[IntervalRecord]) {
        self.completed_ms
            .store(total_duration(records), Ordering::SeqCst);
        self.render();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, view::MemoryScreen};

    #[test]
    fn total_follows_store_notifications() {
        let (tx, rx) = watch::channel(TimerStatus::Running { anchor_ms: 1000 });
        let clock = Arc::new(ManualClock::new(1500));
        let screen = Arc::new(MemoryScreen::new());
        let records = [IntervalRecord { start: 0, end: Some(200) }];
        let display = LiveDisplay::new(rx, clock.clone(), screen.clone(), &records);

        assert_eq!(
            display.reading(),
            LiveReading {
                running: true,
                current_ms: 500,
                total_ms: 700
            }
        );

        display.store_changed(&[]);
        assert_eq!(screen.last_live().unwrap().total_ms, 500);

        display.store_changed(&[IntervalRecord {
            start: i64::MIN,
            end: Some(i64::MAX),
        }]);
        assert_eq!(screen.last_live().unwrap().total_ms, i64::MAX);

        tx.send_replace(TimerStatus::Stopped);
        clock.advance(10_000);
        display.render();
        assert_eq!(screen.last_live().unwrap(), LiveReading::default());
    }
}
