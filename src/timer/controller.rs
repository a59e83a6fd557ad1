use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio::{
    runtime::Handle,
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    clock::Clock,
    models::IntervalRecord,
    store::RecordStore,
    view::{LiveDisplay, LiveReading, Screen},
};

use super::TimerStatus;

/// Start/stop state machine over the store's last record.
///
/// The status is published through a watch channel so the live display and
/// the ticker can read it without going through the controller.
#[derive(Clone)]
pub struct TimerController {
    store: Arc<RecordStore>,
    status: Arc<watch::Sender<TimerStatus>>,
    clock: Arc<dyn Clock>,
    display: Arc<LiveDisplay>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl TimerController {
    pub fn new(
        store: Arc<RecordStore>,
        clock: Arc<dyn Clock>,
        screen: Arc<dyn Screen>,
        tick_interval: Duration,
    ) -> Self {
        let records = store.get_all();
        let initial = TimerStatus::from_records(&records);
        if let Some(anchor_ms) = initial.anchor_ms() {
            info!("Found an open record; timer is running since {anchor_ms}");
        }

        let (status_tx, status_rx) = watch::channel(initial);
        let display = Arc::new(LiveDisplay::new(status_rx, clock.clone(), screen, &records));
        store.on_change(display.clone());
        display.render();

        Self {
            store,
            status: Arc::new(status_tx),
            clock,
            display,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval,
        }
    }

    pub fn status(&self) -> TimerStatus {
        *self.status.borrow()
    }

    pub fn snapshot(&self) -> LiveReading {
        self.display.reading()
    }

    /// Redraws the live counter once.
    pub fn refresh(&self) {
        self.display.render();
    }

    pub fn is_ticking(&self) -> bool {
        lock(&self.ticker)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn toggle(&self) -> Result<TimerStatus> {
        if self.status().is_running() {
            self.stop()
        } else {
            self.start()
        }
    }

    /// Opens a new record at `now`. Does nothing if a record is already open.
    pub fn start(&self) -> Result<TimerStatus> {
        if self.status().is_running() {
            debug!("Start requested while already running");
            self.resume();
            return Ok(self.status());
        }

        // Another process may have opened a record since we last looked.
        if let Some(open) = self.store.last().filter(IntervalRecord::is_running) {
            warn!(
                "An open record started at {} already exists; adopting it",
                open.start
            );
            self.status.send_replace(TimerStatus::Running {
                anchor_ms: open.start,
            });
            self.spawn_ticker();
            self.display.render();
            return Ok(self.status());
        }

        let now = self.clock.now_ms();
        self.status
            .send_replace(TimerStatus::Running { anchor_ms: now });

        if let Err(err) = self.store.append(IntervalRecord::started_at(now)) {
            self.status.send_replace(TimerStatus::Stopped);
            self.display.render();
            return Err(err).context("failed to record timer start");
        }

        self.spawn_ticker();
        info!("Timer started at {now}");
        Ok(self.status())
    }

    /// Closes the open record at `now`. When already stopped this only re-renders.
    ///
    /// The status flips to `Stopped` before the store is written, so the
    /// redraw triggered by the write never counts the closed interval twice.
    pub fn stop(&self) -> Result<TimerStatus> {
        if !self.status().is_running() {
            self.display.render();
            return Ok(TimerStatus::Stopped);
        }

        let now = self.clock.now_ms();
        let previous = self.status.send_replace(TimerStatus::Stopped);
        self.cancel_ticker();

        match self.store.last() {
            Some(last) if last.is_running() => {
                let end = now.max(last.start);
                if let Err(err) = self.store.replace_last(last.finished_at(end)) {
                    self.status.send_replace(previous);
                    self.spawn_ticker();
                    self.display.render();
                    return Err(err).context("failed to record timer stop");
                }
                info!(
                    "Timer stopped at {end} after {} ms",
                    end.saturating_sub(last.start)
                );
            }
            Some(_) | None => {
                warn!("Stopping timer, but the store has no open record to close");
            }
        }

        self.display.render();
        Ok(TimerStatus::Stopped)
    }

    /// Forces the stopped state without touching the store.
    pub fn reset(&self) {
        self.cancel_ticker();
        if self.status.send_replace(TimerStatus::Stopped).is_running() {
            info!("Timer reset");
        }
        self.display.render();
    }

    /// Starts ticking for a running status that was restored from the store.
    pub fn resume(&self) {
        if self.status().is_running() && !self.is_ticking() {
            self.spawn_ticker();
        }
    }

    /// Stops the ticker but leaves the record open, so the timer keeps
    /// running across restarts.
    pub fn release(&self) {
        self.cancel_ticker();
    }

    fn spawn_ticker(&self) {
        let mut ticker_guard = lock(&self.ticker);
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No async runtime available; live counter will not tick");
                return;
            }
        };

        let display = self.display.clone();
        let mut status_rx = self.status.subscribe();
        let period = self.tick_interval;

        let handle = runtime.spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if !status_rx.borrow().is_running() {
                            break;
                        }
                        display.render();
                    }
                    changed = status_rx.changed() => {
                        // Sender gone means every controller was dropped.
                        if changed.is_err() || !status_rx.borrow_and_update().is_running() {
                            break;
                        }
                    }
                }
            }

            debug!("Ticker exited");
        });

        *ticker_guard = Some(handle);
    }

    fn cancel_ticker(&self) {
        if let Some(handle) = lock(&self.ticker).take() {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
