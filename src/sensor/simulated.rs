use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::settings::SimulatorSettings;

use super::{StepSensor, StepStream};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const WATCH_BUFFER: usize = 64;

/// In-process pedometer used by the console app and the tests.
///
/// Steps only advance when [`SimulatedPedometer::walk`] is called, either
/// directly or from the walker task started by
/// [`SimulatedPedometer::spawn_walker`].
#[derive(Clone)]
pub struct SimulatedPedometer {
    inner: Arc<Mutex<PedometerState>>,
}

struct PedometerState {
    available: bool,
    permission_granted: bool,
    probe_error: Option<String>,
    permission_error: Option<String>,
    step_count_error: Option<String>,
    steps_today: u64,
    watchers: Vec<Watcher>,
    permission_requests: usize,
    step_count_queries: usize,
    watches_opened: usize,
}

struct Watcher {
    sender: mpsc::Sender<u64>,
    steps_at_open: u64,
}

impl SimulatedPedometer {
    pub fn new() -> Self {
        Self::from_settings(&SimulatorSettings::default())
    }

    pub fn from_settings(settings: &SimulatorSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PedometerState {
                available: settings.available,
                permission_granted: settings.permission_granted,
                probe_error: None,
                permission_error: None,
                step_count_error: None,
                steps_today: settings.steps_today,
                watchers: Vec::new(),
                permission_requests: 0,
                step_count_queries: 0,
                watches_opened: 0,
            })),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.state().available = available;
    }

    pub fn set_permission_granted(&self, granted: bool) {
        self.state().permission_granted = granted;
    }

    /// Make the next availability probes fail with `message`.
    pub fn fail_probe(&self, message: impl Into<String>) {
        self.state().probe_error = Some(message.into());
    }

    /// Make the next permission requests fail with `message`.
    pub fn fail_permission(&self, message: impl Into<String>) {
        self.state().permission_error = Some(message.into());
    }

    /// Make the next step count queries fail with `message`.
    pub fn fail_step_count(&self, message: impl Into<String>) {
        self.state().step_count_error = Some(message.into());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.probe_error = None;
        state.permission_error = None;
        state.step_count_error = None;
    }

    /// End every open watch from the sensor side, as if the OS dropped them.
    pub fn close_watches(&self) {
        self.state().watchers.clear();
    }

    /// Record `steps` new steps and push the running totals to every open watch.
    pub fn walk(&self, steps: u64) {
        let mut state = self.state();
        state.steps_today = state.steps_today.saturating_add(steps);
        let total = state.steps_today;

        state.watchers.retain(|watcher| {
            let reading = total.saturating_sub(watcher.steps_at_open);
            match watcher.sender.try_send(reading) {
                Ok(()) => true,
                // Readings are cumulative, so the next one supersedes a dropped one.
                Err(mpsc::error::TrySendError::Full(_)) => true,
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

    pub fn steps_today(&self) -> u64 {
        self.state().steps_today
    }

    /// Number of watches whose receiver is still alive.
    pub fn active_watchers(&self) -> usize {
        let mut state = self.state();
        state.watchers.retain(|watcher| !watcher.sender.is_closed());
        state.watchers.len()
    }

    pub fn permission_requests(&self) -> usize {
        self.state().permission_requests
    }

    pub fn step_count_queries(&self) -> usize {
        self.state().step_count_queries
    }

    pub fn watches_opened(&self) -> usize {
        self.state().watches_opened
    }

    /// Walk a random number of steps (1..=`max_steps_per_tick`) every `interval`
    /// until `cancel_token` fires.
    pub fn spawn_walker(
        &self,
        interval: Duration,
        max_steps_per_tick: u64,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        let pedometer = self.clone();
        let max_steps = max_steps_per_tick.max(1);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        pedometer.walk(next_stride(max_steps));
                    }
                    _ = cancel_token.cancelled() => {
                        log_info!("simulated walker stopping at {} steps", pedometer.steps_today());
                        break;
                    }
                }
            }
        })
    }

    fn state(&self) -> MutexGuard<'_, PedometerState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SimulatedPedometer {
    fn default() -> Self {
        Self::new()
    }
}

impl StepSensor for SimulatedPedometer {
    async fn is_available(&self) -> Result<bool> {
        let state = self.state();
        if let Some(message) = &state.probe_error {
            return Err(anyhow!("pedometer probe failed: {message}"));
        }
        Ok(state.available)
    }

    async fn request_permission(&self) -> Result<bool> {
        let mut state = self.state();
        state.permission_requests += 1;
        if let Some(message) = &state.permission_error {
            return Err(anyhow!("permission request failed: {message}"));
        }
        Ok(state.permission_granted)
    }

    async fn get_step_count(&self, start: DateTime<Local>, end: DateTime<Local>) -> Result<u64> {
        if end < start {
            return Err(anyhow!("step count window ends before it starts"));
        }
        let mut state = self.state();
        state.step_count_queries += 1;
        if let Some(message) = &state.step_count_error {
            return Err(anyhow!("step count query failed: {message}"));
        }
        // The simulator has no history, every step it knows about happened today.
        Ok(state.steps_today)
    }

    fn watch_step_count(&self) -> Result<StepStream> {
        let mut state = self.state();
        if !state.available {
            log_warn!("watch requested on an unavailable simulated pedometer");
            return Err(anyhow!("pedometer is not available"));
        }

        let (sender, receiver) = mpsc::channel(WATCH_BUFFER);
        let steps_at_open = state.steps_today;
        state.watchers.push(Watcher {
            sender,
            steps_at_open,
        });
        state.watches_opened += 1;
        Ok(receiver)
    }
}

fn next_stride(max_steps: u64) -> u64 {
    rand::thread_rng().gen_range(1..=max_steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn watch_reports_running_total_since_open() {
        let pedometer = SimulatedPedometer::new();
        pedometer.walk(40);

        let mut stream = pedometer.watch_step_count().unwrap();
        pedometer.walk(10);
        pedometer.walk(5);

        assert_eq!(stream.recv().await, Some(10));
        assert_eq!(stream.recv().await, Some(15));
        assert_eq!(pedometer.steps_today(), 55);
    }

    #[tokio::test]
    async fn dropped_stream_is_released() {
        let pedometer = SimulatedPedometer::new();
        let stream = pedometer.watch_step_count().unwrap();
        assert_eq!(pedometer.active_watchers(), 1);

        drop(stream);
        assert_eq!(pedometer.active_watchers(), 0);
    }

    #[tokio::test]
    async fn closed_watches_end_their_streams() {
        let pedometer = SimulatedPedometer::new();
        let mut stream = pedometer.watch_step_count().unwrap();

        pedometer.close_watches();
        pedometer.walk(3);

        assert_eq!(stream.recv().await, None);
        assert_eq!(pedometer.active_watchers(), 0);
    }

    #[tokio::test]
    async fn step_count_error_until_cleared() {
        let pedometer = SimulatedPedometer::new();
        pedometer.walk(12);
        pedometer.fail_step_count("history store locked");

        let (start, end) = crate::tracker::window::today_window(Local::now());
        let err = pedometer.get_step_count(start, end).await.unwrap_err();
        assert!(err.to_string().contains("history store locked"));

        pedometer.clear_failures();
        assert_eq!(pedometer.get_step_count(start, end).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn probe_error_surfaces() {
        let pedometer = SimulatedPedometer::new();
        pedometer.fail_probe("sensor service crashed");

        let err = pedometer.is_available().await.unwrap_err();
        assert!(err.to_string().contains("sensor service crashed"));
    }

    #[tokio::test]
    async fn counts_permission_requests() {
        let pedometer = SimulatedPedometer::new();
        pedometer.set_permission_granted(false);

        assert!(!pedometer.request_permission().await.unwrap());
        assert_eq!(pedometer.permission_requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn walker_advances_until_cancelled() {
        let pedometer = SimulatedPedometer::new();
        let token = CancellationToken::new();
        let walker = pedometer.spawn_walker(Duration::from_millis(100), 3, token.clone());

        tokio::time::sleep(Duration::from_millis(450)).await;
        token.cancel();
        walker.await.unwrap();

        let walked = pedometer.steps_today();
        assert!(walked >= 1, "walker never stepped");
        assert!(walked <= 5 * 3, "walker stepped too often: {walked}");
    }
}
