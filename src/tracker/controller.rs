use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use log::{debug, error, info, warn};
use tokio::{
    sync::{broadcast, watch, Mutex},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::sensor::StepSensor;

use super::{
    events::{publish, GoalAlert, TrackerEvent},
    goal::parse_goal,
    lifecycle::{AppLifecycle, LifecycleTransition},
    state::{SensorAvailability, StepSnapshot, StepState, TrackerPhase, UnavailableReason},
    subscription::StepSubscription,
    window::today_window,
    TrackerConfig,
};

const EVENT_BUFFER: usize = 64;

/// Owns the step state and the single sensor watch, and reacts to lifecycle
/// changes. Cloning is cheap; clones share everything.
pub struct StepTracker<S: StepSensor> {
    sensor: Arc<S>,
    config: TrackerConfig,
    state: Arc<Mutex<StepState>>,
    subscription: Arc<Mutex<Option<StepSubscription>>>,
    lifecycle: Arc<Mutex<AppLifecycle>>,
    listener: Arc<Mutex<Option<JoinHandle<()>>>>,
    events: broadcast::Sender<TrackerEvent>,
}

impl<S: StepSensor> Clone for StepTracker<S> {
    fn clone(&self) -> Self {
        Self {
            sensor: Arc::clone(&self.sensor),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            subscription: Arc::clone(&self.subscription),
            lifecycle: Arc::clone(&self.lifecycle),
            listener: Arc::clone(&self.listener),
            events: self.events.clone(),
        }
    }
}

impl<S: StepSensor> StepTracker<S> {
    pub fn new(sensor: S, config: TrackerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        Self {
            sensor: Arc::new(sensor),
            state: Arc::new(Mutex::new(StepState::new(config.default_goal))),
            config,
            subscription: Arc::new(Mutex::new(None)),
            lifecycle: Arc::new(Mutex::new(AppLifecycle::default())),
            listener: Arc::new(Mutex::new(None)),
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> StepSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn phase(&self) -> TrackerPhase {
        self.state.lock().await.phase()
    }

    /// Register the lifecycle listener, then probe the sensor and ask for
    /// permission. Sensor failures settle the availability as Unavailable and
    /// are not returned; the only error is calling this twice.
    pub async fn initialize(&self, lifecycle: watch::Receiver<AppLifecycle>) -> Result<()> {
        {
            let mut listener = self.listener.lock().await;
            if listener.is_some() {
                bail!("step tracker already initialized");
            }
            let current = *lifecycle.borrow();
            *self.lifecycle.lock().await = current;
            *listener = Some(self.spawn_lifecycle_listener(lifecycle));
        }

        let available = match self.sensor.is_available().await {
            Ok(available) => available,
            Err(err) => {
                error!("Pedometer availability probe failed: {err:?}");
                self.mark_unavailable(UnavailableReason::ProbeFailed).await;
                return Ok(());
            }
        };

        if !available {
            info!("Pedometer not supported on this device");
            self.mark_unavailable(UnavailableReason::NotSupported).await;
            return Ok(());
        }

        match self.sensor.request_permission().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Permission denied");
                self.mark_unavailable(UnavailableReason::PermissionDenied)
                    .await;
                return Ok(());
            }
            Err(err) => {
                error!("Error requesting permissions: {err:?}");
                self.mark_unavailable(UnavailableReason::PermissionFailed)
                    .await;
                return Ok(());
            }
        }

        let snapshot = {
            let mut state = self.state.lock().await;
            state.mark_available();
            state.snapshot()
        };
        publish(&self.events, snapshot, None);
        info!("Pedometer available and permitted");

        let foreground = self.lifecycle.lock().await.is_foreground();
        if foreground || !self.config.pause_in_background {
            if let Err(err) = self.activate().await {
                error!("Initial step subscription failed: {err:?}");
            }
            // The listener may have handled a move to the background before the
            // watch above existed.
            self.pause_if_backgrounded().await?;
        } else {
            info!("Starting in the background; step watch deferred until foreground");
        }

        Ok(())
    }

    /// Open a fresh watch, replacing any existing one. The baseline is fetched
    /// for today up to now and the live count restarts at zero. Does nothing
    /// unless the sensor is available.
    pub async fn activate(&self) -> Result<()> {
        let mut slot = self.subscription.lock().await;

        let availability = self.state.lock().await.availability;
        if availability != SensorAvailability::Available {
            debug!("Ignoring activation while pedometer is {availability:?}");
            return Ok(());
        }

        if let Some(previous) = slot.take() {
            let previous_id = previous.id();
            if let Err(err) = previous.cancel().await {
                warn!("Previous step watch {previous_id} ended badly: {err:?}");
            }
            self.state.lock().await.end_subscription(previous_id);
            debug!("Replaced step watch {previous_id}");
        }

        let (start, now) = today_window(Local::now());
        let baseline = self
            .sensor
            .get_step_count(start, now)
            .await
            .context("failed to fetch today's step count")?;
        let stream = self
            .sensor
            .watch_step_count()
            .context("failed to open the live step watch")?;

        let id = Uuid::new_v4();
        let (snapshot, alert) = {
            let mut state = self.state.lock().await;
            state.begin_subscription(id, baseline);
            let alert = state.evaluate_goal();
            (state.snapshot(), alert)
        };

        info!("Step watch {id} active, {baseline} steps since {start}");
        publish(&self.events, snapshot, alert);

        *slot = Some(StepSubscription::spawn(
            id,
            stream,
            Arc::clone(&self.state),
            self.events.clone(),
        ));
        Ok(())
    }

    /// Release the current watch, if any.
    pub async fn deactivate(&self) -> Result<()> {
        let mut slot = self.subscription.lock().await;
        let Some(subscription) = slot.take() else {
            return Ok(());
        };

        let id = subscription.id();
        let joined = subscription.cancel().await;

        let snapshot = {
            let mut state = self.state.lock().await;
            state.end_subscription(id);
            state.snapshot()
        };
        drop(slot);

        info!("Step watch {id} released");
        publish(&self.events, snapshot, None);
        joined
    }

    pub async fn on_lifecycle_change(&self, next: AppLifecycle) -> Result<()> {
        let previous = {
            let mut current = self.lifecycle.lock().await;
            std::mem::replace(&mut *current, next)
        };

        match LifecycleTransition::between(previous, next) {
            LifecycleTransition::EnteredForeground => {
                debug!("Lifecycle {previous} -> {next}: activating");
                self.activate().await
            }
            LifecycleTransition::LeftForeground if self.config.pause_in_background => {
                debug!("Lifecycle {previous} -> {next}: pausing");
                self.deactivate().await
            }
            _ => Ok(()),
        }
    }

    /// Apply goal text from the input field and return the goal it parsed to.
    pub async fn set_goal(&self, text: &str) -> i64 {
        let goal = parse_goal(text);
        let (snapshot, alert) = {
            let mut state = self.state.lock().await;
            state.set_goal(goal);
            let alert = state.evaluate_goal();
            (state.snapshot(), alert)
        };
        publish(&self.events, snapshot, alert);
        goal
    }

    /// Raise the goal alert if the goal is met and it is not already showing.
    pub async fn evaluate_goal(&self) -> Option<GoalAlert> {
        let (snapshot, alert) = {
            let mut state = self.state.lock().await;
            let alert = state.evaluate_goal();
            (state.snapshot(), alert)
        };
        if alert.is_some() {
            publish(&self.events, snapshot, alert.clone());
        }
        alert
    }

    /// The goal alert's button. Restores the default goal and clears the live
    /// count; returns false when no alert was showing.
    pub async fn acknowledge_goal(&self) -> bool {
        let (snapshot, alert) = {
            let mut state = self.state.lock().await;
            if !state.acknowledge_goal(self.config.default_goal) {
                return false;
            }
            let alert = state.evaluate_goal();
            (state.snapshot(), alert)
        };
        info!("Goal acknowledged, goal reset to {}", snapshot.goal);
        publish(&self.events, snapshot, alert);
        true
    }

    /// Stop listening to lifecycle changes and release the watch.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(listener) = self.listener.lock().await.take() {
            listener.abort();
        }
        self.deactivate().await
    }

    /// Release the watch when the app is not in the foreground and pausing is on.
    async fn pause_if_backgrounded(&self) -> Result<()> {
        let current = *self.lifecycle.lock().await;
        if current.is_foreground() || !self.config.pause_in_background {
            return Ok(());
        }
        debug!("Lifecycle is {current} after activation: pausing");
        self.deactivate().await
    }

    async fn mark_unavailable(&self, reason: UnavailableReason) {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.mark_unavailable(reason);
            state.snapshot()
        };
        warn!("Pedometer unavailable ({})", reason.as_str());
        publish(&self.events, snapshot, None);
    }

    fn spawn_lifecycle_listener(&self, mut lifecycle: watch::Receiver<AppLifecycle>) -> JoinHandle<()> {
        let tracker = self.clone();

        tokio::spawn(async move {
            while lifecycle.changed().await.is_ok() {
                let next = *lifecycle.borrow_and_update();
                if let Err(err) = tracker.on_lifecycle_change(next).await {
                    error!("Lifecycle change to {next} failed: {err:?}");
                }
            }
            debug!("Lifecycle signal closed");
        })
    }
}
