pub mod config;
pub mod controller;
pub mod events;
pub mod goal;
pub mod lifecycle;
pub mod state;
pub mod subscription;
pub mod window;

pub use config::{TrackerConfig, DEFAULT_GOAL};
pub use controller::StepTracker;
pub use events::{GoalAlert, TrackerEvent};
pub use lifecycle::AppLifecycle;
pub use state::{SensorAvailability, StepSnapshot, TrackerPhase};
