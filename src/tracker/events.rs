use serde::Serialize;
use tokio::sync::broadcast;

use super::state::StepSnapshot;

/// Payload for the goal-reached dialog. It has a single button; pressing it
/// maps to `StepTracker::acknowledge_goal`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GoalAlert {
    pub title: &'static str,
    pub message: &'static str,
    pub button: &'static str,
}

impl Default for GoalAlert {
    fn default() -> Self {
        Self {
            title: "Congratulations!",
            message: "You reached your goal!",
            button: "Okay",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum TrackerEvent {
    StateChanged(StepSnapshot),
    GoalReached(GoalAlert),
}

pub(crate) fn publish(
    events: &broadcast::Sender<TrackerEvent>,
    snapshot: StepSnapshot,
    alert: Option<GoalAlert>,
) {
    // Nobody listening is fine; the snapshot can always be pulled.
    let _ = events.send(TrackerEvent::StateChanged(snapshot));
    if let Some(alert) = alert {
        let _ = events.send(TrackerEvent::GoalReached(alert));
    }
}
