//! Scheduler loop implementation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::FutureExt;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::clock::{Clock, SystemClock};
use super::config::ScheduleConfig;
use super::error::SchedulerError;
use super::traits::{SchedulePersister, ScheduledWorkflow};
use super::types::{ScheduleState, SharedScheduleState};
use crate::metrics::SCHEDULER_FIRINGS;

/// Parses an `HH:MM` run time.
pub fn parse_run_time(value: &str) -> Result<NaiveTime, SchedulerError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| SchedulerError::InvalidRunTime(value.to_string()))
}

/// Next daily fire time strictly after `now`. A day that already fired is
/// skipped.
pub fn next_fire_after(
    now: NaiveDateTime,
    run_time: NaiveTime,
    last_fired: Option<NaiveDate>,
) -> NaiveDateTime {
    let today = now.date();
    let candidate = today.and_time(run_time);
    if candidate > now && last_fired != Some(today) {
        candidate
    } else {
        today.succ_opt().unwrap_or(today).and_time(run_time)
    }
}

struct LoopHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

struct FiringResult {
    success: bool,
    attempts: u32,
    interrupted: bool,
}

/// Everything the background loop needs, detached from the [`Scheduler`].
#[derive(Clone)]
struct ScheduleLoop {
    workflow: Arc<dyn ScheduledWorkflow>,
    clock: Arc<dyn Clock>,
    state: SharedScheduleState,
    check_interval: Duration,
    run_time: NaiveTime,
}

impl ScheduleLoop {
    async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Scheduler loop started");
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Scheduler loop received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.check_interval) => {}
            }
            if !self.tick(&mut shutdown_rx).await {
                break;
            }
        }
        info!("Scheduler loop stopped");
    }

    /// One check. Returns false when the loop should exit.
    async fn tick(&self, shutdown_rx: &mut broadcast::Receiver<()>) -> bool {
        let now = self.clock.now();
        let snapshot = self.state.snapshot();

        if let Some(next) = snapshot.next_run {
            let day = next.date();
            if now >= next && snapshot.last_fired_date != Some(day) {
                self.state.update(|s| s.last_fired_date = Some(day));
                let result = self.fire(&snapshot, shutdown_rx).await;
                self.record(now, &result);
                if result.interrupted {
                    return false;
                }
            }
        }

        let now = self.clock.now();
        let run_time = self.run_time;
        self.state.update(|s| {
            if s.active {
                s.next_run = Some(next_fire_after(now, run_time, s.last_fired_date));
            }
        });
        debug!("Scheduler tick at {}", now);
        true
    }

    async fn fire(
        &self,
        snapshot: &ScheduleState,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> FiringResult {
        let max_attempts = snapshot.retry_attempts.max(1);
        let delay = Duration::from_millis(snapshot.retry_delay_ms);
        let mut attempt = 0;

        loop {
            attempt += 1;
            info!(
                "Running scheduled workflow (attempt {}/{})",
                attempt, max_attempts
            );
            // A panicking workflow counts as a failed attempt; the loop keeps going.
            let success = match AssertUnwindSafe(self.workflow.run_workflow())
                .catch_unwind()
                .await
            {
                Ok(success) => success,
                Err(_) => {
                    error!(
                        "Scheduled workflow panicked (attempt {}/{})",
                        attempt, max_attempts
                    );
                    false
                }
            };
            if success || attempt >= max_attempts {
                return FiringResult {
                    success,
                    attempts: attempt,
                    interrupted: false,
                };
            }

            warn!(
                "Scheduled workflow failed, retrying in {:?} (attempt {}/{})",
                delay, attempt, max_attempts
            );
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Scheduler stopped while waiting to retry");
                    return FiringResult {
                        success: false,
                        attempts: attempt,
                        interrupted: true,
                    };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn record(&self, fired_at: NaiveDateTime, result: &FiringResult) {
        let label = match (result.success, result.attempts > 1) {
            (true, false) => "success",
            (true, true) => "retry_success",
            (false, false) => "failure",
            (false, true) => "retry_failure",
        };
        SCHEDULER_FIRINGS.with_label_values(&[label]).inc();

        if result.success {
            info!(
                "Scheduled workflow completed successfully after {} attempt(s)",
                result.attempts
            );
        } else {
            warn!(
                "Scheduled workflow failed after {} attempt(s); next attempt on the next scheduled day",
                result.attempts
            );
        }

        self.state.update(|s| {
            s.last_run = Some(fired_at);
            s.last_success = Some(result.success);
            s.last_attempts = result.attempts;
        });
    }
}

/// Fires a [`ScheduledWorkflow`] once a day.
pub struct Scheduler {
    workflow: Arc<dyn ScheduledWorkflow>,
    clock: Arc<dyn Clock>,
    persister: Option<Arc<dyn SchedulePersister>>,
    state: SharedScheduleState,
    check_interval: Duration,
    stop_timeout: Duration,
    handle: Mutex<Option<LoopHandle>>,
}

impl Scheduler {
    /// Creates a stopped scheduler publishing into `state`.
    pub fn new(
        config: &ScheduleConfig,
        workflow: Arc<dyn ScheduledWorkflow>,
        state: SharedScheduleState,
    ) -> Result<Self, SchedulerError> {
        let run_time = parse_run_time(&config.run_time)?;
        let check_interval = config.check_interval();

        state.update(|s| {
            s.run_time = run_time.format("%H:%M").to_string();
            s.check_interval_ms = check_interval.as_millis() as u64;
            s.active = false;
            s.next_run = None;
            match &config.retry {
                Some(retry) => {
                    s.retry_attempts = retry.max_attempts.max(1);
                    s.retry_delay_ms = retry.delay_secs * 1000;
                }
                None => {
                    s.retry_attempts = 1;
                    s.retry_delay_ms = 0;
                }
            }
        });

        Ok(Self {
            workflow,
            clock: Arc::new(SystemClock),
            persister: None,
            state,
            check_interval,
            stop_timeout: config.stop_timeout(),
            handle: Mutex::new(None),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_persister(mut self, persister: Arc<dyn SchedulePersister>) -> Self {
        self.persister = Some(persister);
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self.state
            .update(|s| s.check_interval_ms = interval.as_millis() as u64);
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn state(&self) -> ScheduleState {
        self.state.snapshot()
    }

    pub fn shared_state(&self) -> SharedScheduleState {
        self.state.clone()
    }

    pub fn is_active(&self) -> bool {
        self.state.snapshot().active
    }

    pub fn next_run_time(&self) -> Option<NaiveDateTime> {
        self.state.snapshot().next_run
    }

    /// Time left before the next firing, zero when it is already due.
    pub fn time_until_next_run(&self) -> Option<Duration> {
        let next = self.next_run_time()?;
        Some((next - self.clock.now()).to_std().unwrap_or(Duration::ZERO))
    }

    /// Enables the per-firing retry loop. Takes effect from the next firing.
    pub fn set_retry_policy(&self, max_attempts: u32, delay: Duration) {
        let max_attempts = max_attempts.max(1);
        self.state.update(|s| {
            s.retry_attempts = max_attempts;
            s.retry_delay_ms = delay.as_millis() as u64;
        });
        info!(
            "Scheduler retry policy set to {} attempt(s) with {:?} delay",
            max_attempts, delay
        );
    }

    /// Spawns the background loop.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return Err(SchedulerError::AlreadyActive);
        }

        let run_time = parse_run_time(&self.state.snapshot().run_time)?;
        let now = self.clock.now();
        let next = self.state.update(|s| {
            let next = next_fire_after(now, run_time, s.last_fired_date);
            s.active = true;
            s.next_run = Some(next);
            next
        });

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let schedule_loop = ScheduleLoop {
            workflow: Arc::clone(&self.workflow),
            clock: Arc::clone(&self.clock),
            state: self.state.clone(),
            check_interval: self.check_interval,
            run_time,
        };
        let task = tokio::spawn(schedule_loop.run(shutdown_rx));
        *handle = Some(LoopHandle { shutdown_tx, task });

        info!("Scheduler started; next run at {}", next);
        Ok(())
    }

    /// Signals the loop and waits up to the stop timeout for it to exit.
    /// A firing in progress is not interrupted.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let handle = self.handle.lock().await.take();
        let Some(handle) = handle else {
            return Err(SchedulerError::NotActive);
        };

        self.state.update(|s| {
            s.active = false;
            s.next_run = None;
        });
        let _ = handle.shutdown_tx.send(());

        match tokio::time::timeout(self.stop_timeout, handle.task).await {
            Ok(Ok(())) => info!("Scheduler stopped"),
            Ok(Err(e)) => warn!("Scheduler loop ended abnormally: {}", e),
            Err(_) => warn!(
                "Scheduler loop did not exit within {:?}; the current run will finish on its own",
                self.stop_timeout
            ),
        }
        Ok(())
    }

    /// Changes the daily run time: stop, update, persist, then restart if
    /// the scheduler was active.
    pub async fn reschedule(&self, run_time: &str) -> Result<(), SchedulerError> {
        let parsed = parse_run_time(run_time)?;
        let normalized = parsed.format("%H:%M").to_string();

        let was_active = self.handle.lock().await.is_some();
        if was_active {
            self.stop().await?;
        }

        self.state.update(|s| s.run_time = normalized.clone());
        let persisted = match &self.persister {
            Some(persister) => persister.persist_run_time(&normalized),
            None => Ok(()),
        };
        if let Err(e) = &persisted {
            warn!("Run time changed to {} but was not saved: {}", normalized, e);
        }

        if was_active {
            self.start().await?;
        }

        info!("Schedule changed to daily at {}", normalized);
        persisted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn eight() -> NaiveTime {
        NaiveTime::from_hms_opt(8, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_run_time() {
        assert_eq!(parse_run_time("08:00").unwrap(), eight());
        assert_eq!(
            parse_run_time(" 23:59 ").unwrap(),
            NaiveTime::from_hms_opt(23, 59, 0).unwrap()
        );
        assert!(matches!(
            parse_run_time("25:00"),
            Err(SchedulerError::InvalidRunTime(_))
        ));
        assert!(parse_run_time("8am").is_err());
        assert!(parse_run_time("").is_err());
    }

    #[test]
    fn test_next_fire_later_today() {
        assert_eq!(next_fire_after(at(3, 7, 30), eight(), None), at(3, 8, 0));
    }

    #[test]
    fn test_next_fire_after_run_time_is_tomorrow() {
        assert_eq!(next_fire_after(at(3, 9, 0), eight(), None), at(4, 8, 0));
        assert_eq!(next_fire_after(at(3, 8, 0), eight(), None), at(4, 8, 0));
    }

    #[test]
    fn test_next_fire_skips_day_already_fired() {
        let fired = NaiveDate::from_ymd_opt(2025, 8, 3);
        assert_eq!(next_fire_after(at(3, 7, 0), eight(), fired), at(4, 8, 0));
    }

    #[test]
    fn test_next_fire_crosses_month_end() {
        let now = NaiveDate::from_ymd_opt(2025, 8, 31)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(
            next_fire_after(now, eight(), None),
            NaiveDate::from_ymd_opt(2025, 9, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );
    }
}
