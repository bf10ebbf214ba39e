use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::sensor::StepStream;

use super::events::{publish, TrackerEvent};
use super::state::StepState;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// A live step watch and the task forwarding its readings into the state.
///
/// `cancel` stops delivery and waits for the task. Dropping the handle also
/// cancels, so a subscription never outlives its owner.
pub struct StepSubscription {
    id: Uuid,
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl StepSubscription {
    pub fn spawn(
        id: Uuid,
        stream: StepStream,
        state: Arc<Mutex<StepState>>,
        events: broadcast::Sender<TrackerEvent>,
    ) -> Self {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(forward_steps(
            id,
            stream,
            state,
            events,
            cancel_token.clone(),
        ));

        Self {
            id,
            handle: Some(handle),
            cancel_token,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn cancel(mut self) -> Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("step watch task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Drop for StepSubscription {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn forward_steps(
    id: Uuid,
    mut stream: StepStream,
    state: Arc<Mutex<StepState>>,
    events: broadcast::Sender<TrackerEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("step watch {id} released");
                break;
            }
            reading = stream.recv() => {
                let Some(steps) = reading else {
                    log_warn!("step watch {id} closed by the sensor");
                    let mut guard = state.lock().await;
                    if guard.end_subscription(id) {
                        publish(&events, guard.snapshot(), None);
                    }
                    break;
                };

                let mut guard = state.lock().await;
                if !guard.apply_reading(id, steps) {
                    log_warn!("dropping reading from superseded step watch {id}");
                    break;
                }
                let alert = guard.evaluate_goal();
                publish(&events, guard.snapshot(), alert);
            }
        }
    }
}
