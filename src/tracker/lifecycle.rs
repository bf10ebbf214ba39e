use std::{fmt, str::FromStr};

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};

/// Application lifecycle as reported by the host platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AppLifecycle {
    #[default]
    Active,
    Inactive,
    Background,
}

impl AppLifecycle {
    pub fn is_foreground(self) -> bool {
        matches!(self, AppLifecycle::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppLifecycle::Active => "active",
            AppLifecycle::Inactive => "inactive",
            AppLifecycle::Background => "background",
        }
    }
}

impl fmt::Display for AppLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppLifecycle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "foreground" | "fg" => Ok(AppLifecycle::Active),
            "inactive" => Ok(AppLifecycle::Inactive),
            "background" | "bg" => Ok(AppLifecycle::Background),
            other => Err(anyhow!("unknown lifecycle state: {other}")),
        }
    }
}

/// What a lifecycle change means for the sensor watch. Inactive and
/// background collapse into a single "not foreground" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTransition {
    EnteredForeground,
    LeftForeground,
    Unchanged,
}

impl LifecycleTransition {
    pub fn between(previous: AppLifecycle, next: AppLifecycle) -> Self {
        match (previous.is_foreground(), next.is_foreground()) {
            (false, true) => LifecycleTransition::EnteredForeground,
            (true, false) => LifecycleTransition::LeftForeground,
            _ => LifecycleTransition::Unchanged,
        }
    }
}
