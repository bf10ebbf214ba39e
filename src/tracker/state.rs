use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::GoalAlert;

pub const UNAVAILABLE_MESSAGE: &str = "Pedometer is not available on this device.";
pub const GOAL_REACHED_MESSAGE: &str = "Congratulations! You reached your goal!";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SensorAvailability {
    #[default]
    Checking,
    Available,
    Unavailable,
}

/// Why the pedometer was ruled out. Only logged; the user sees one message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum UnavailableReason {
    NotSupported,
    ProbeFailed,
    PermissionDenied,
    PermissionFailed,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableReason::NotSupported => "NotSupported",
            UnavailableReason::ProbeFailed => "ProbeFailed",
            UnavailableReason::PermissionDenied => "PermissionDenied",
            UnavailableReason::PermissionFailed => "PermissionFailed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackerPhase {
    Checking,
    AvailableSubscribed,
    AvailableUnsubscribed,
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct StepState {
    pub availability: SensorAvailability,
    pub unavailable_reason: Option<UnavailableReason>,
    /// Steps between local midnight and the start of the current watch.
    pub baseline_steps: u64,
    /// Running total reported by the current watch.
    pub live_steps: u64,
    pub goal: i64,
    /// Set between raising the goal alert and its acknowledgement.
    pub goal_alert_pending: bool,
    pub subscription_id: Option<Uuid>,
}

impl StepState {
    pub fn new(goal: i64) -> Self {
        Self {
            availability: SensorAvailability::Checking,
            unavailable_reason: None,
            baseline_steps: 0,
            live_steps: 0,
            goal,
            goal_alert_pending: false,
            subscription_id: None,
        }
    }

    pub fn remaining(&self) -> i64 {
        let live = i64::try_from(self.live_steps).unwrap_or(i64::MAX);
        self.goal.saturating_sub(live)
    }

    pub fn phase(&self) -> TrackerPhase {
        match self.availability {
            SensorAvailability::Checking => TrackerPhase::Checking,
            SensorAvailability::Unavailable => TrackerPhase::Unavailable,
            SensorAvailability::Available if self.subscription_id.is_some() => {
                TrackerPhase::AvailableSubscribed
            }
            SensorAvailability::Available => TrackerPhase::AvailableUnsubscribed,
        }
    }

    /// Checking → Available. Returns false when the availability was already settled.
    pub fn mark_available(&mut self) -> bool {
        if self.availability != SensorAvailability::Checking {
            return false;
        }
        self.availability = SensorAvailability::Available;
        true
    }

    pub fn mark_unavailable(&mut self, reason: UnavailableReason) {
        self.availability = SensorAvailability::Unavailable;
        self.unavailable_reason = Some(reason);
        self.subscription_id = None;
    }

    pub fn begin_subscription(&mut self, id: Uuid, baseline_steps: u64) {
        self.subscription_id = Some(id);
        self.baseline_steps = baseline_steps;
        self.live_steps = 0;
    }

    /// Forget subscription `id`. A no-op if a newer subscription has replaced it.
    pub fn end_subscription(&mut self, id: Uuid) -> bool {
        if self.subscription_id != Some(id) {
            return false;
        }
        self.subscription_id = None;
        true
    }

    /// Replace the live count with a reading from subscription `id`. Readings
    /// from any other subscription are dropped.
    pub fn apply_reading(&mut self, id: Uuid, steps: u64) -> bool {
        if self.subscription_id != Some(id) {
            return false;
        }
        self.live_steps = steps;
        true
    }

    pub fn set_goal(&mut self, goal: i64) {
        self.goal = goal;
    }

    /// Latch and return the goal alert when the goal is met and no alert is
    /// already showing.
    pub fn evaluate_goal(&mut self) -> Option<GoalAlert> {
        if self.goal_alert_pending || self.remaining() > 0 {
            return None;
        }
        self.goal_alert_pending = true;
        Some(GoalAlert::default())
    }

    /// Dismiss the goal alert, restoring `reset_goal` and clearing the live count.
    pub fn acknowledge_goal(&mut self, reset_goal: i64) -> bool {
        if !self.goal_alert_pending {
            return false;
        }
        self.goal_alert_pending = false;
        self.goal = reset_goal;
        self.live_steps = 0;
        true
    }

    pub fn remaining_message(&self) -> String {
        let remaining = self.remaining();
        if remaining > 0 {
            format!("You need to walk {remaining} more steps to reach your goal!")
        } else {
            GOAL_REACHED_MESSAGE.to_string()
        }
    }

    pub fn snapshot(&self) -> StepSnapshot {
        StepSnapshot {
            availability: self.availability,
            phase: self.phase(),
            baseline_steps: self.baseline_steps,
            live_steps: self.live_steps,
            goal: self.goal,
            remaining: self.remaining(),
            goal_alert_pending: self.goal_alert_pending,
            message: self.remaining_message(),
        }
    }
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StepSnapshot {
    pub availability: SensorAvailability,
    pub phase: TrackerPhase,
    pub baseline_steps: u64,
    pub live_steps: u64,
    pub goal: i64,
    pub remaining: i64,
    pub goal_alert_pending: bool,
    pub message: String,
}

impl StepSnapshot {
    /// The error banner, shown once availability is settled and negative.
    pub fn unavailable_message(&self) -> Option<&'static str> {
        (self.availability == SensorAvailability::Unavailable).then_some(UNAVAILABLE_MESSAGE)
    }
}
