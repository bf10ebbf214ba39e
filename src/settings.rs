use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::tracker::TrackerConfig;

/// Knobs for the in-process pedometer the console app runs against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulatorSettings {
    pub available: bool,
    pub permission_granted: bool,
    pub steps_today: u64,
    pub walk_interval_ms: u64,
    pub max_steps_per_tick: u64,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            available: true,
            permission_granted: true,
            steps_today: 0,
            walk_interval_ms: 1_000,
            max_steps_per_tick: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UserSettings {
    tracker: TrackerConfig,
    simulator: SimulatorSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    /// Load settings from `path`. A missing file gives the defaults; a file that
    /// does not parse is logged and also gives the defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unreadable settings in {}: {err}",
                    path.display()
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn tracker(&self) -> TrackerConfig {
        self.read().tracker.clone()
    }

    pub fn simulator(&self) -> SimulatorSettings {
        self.read().simulator.clone()
    }

    /// Re-read the file. Unlike [`SettingsStore::new`], a bad file is an error
    /// and the current settings are kept.
    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", self.path.display()))?;
        let mut guard = self
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = data;
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, UserSettings> {
        self.data
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
