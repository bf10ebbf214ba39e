use serde::{Deserialize, Serialize};

/// Goal used at startup and restored after the user acknowledges a reached goal.
pub const DEFAULT_GOAL: i64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Initial goal, and the goal restored on acknowledgement.
    pub default_goal: i64,

    /// Release the sensor watch when the app leaves the foreground. A fresh
    /// watch (and baseline) is opened on return either way.
    pub pause_in_background: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_goal: DEFAULT_GOAL,
            pause_in_background: true,
        }
    }
}
