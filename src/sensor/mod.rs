pub mod simulated;

use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Local};
use tokio::sync::mpsc;

pub use simulated::SimulatedPedometer;

/// Live step readings. Each value is the running total since the watch was
/// opened, not a delta. Dropping the receiver releases the watch.
pub type StepStream = mpsc::Receiver<u64>;

/// Platform pedometer boundary.
///
/// Implementations wrap whatever the host OS provides; the tracker only ever
/// talks to the sensor through this trait.
pub trait StepSensor: Send + Sync + 'static {
    /// Whether the device has a usable step counter.
    fn is_available(&self) -> impl Future<Output = Result<bool>> + Send;

    /// Ask the user for motion permission. `Ok(false)` means denied.
    fn request_permission(&self) -> impl Future<Output = Result<bool>> + Send;

    /// Steps recorded in `[start, end)`.
    fn get_step_count(
        &self,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Open a live watch. Readings start from zero at the moment of the call.
    fn watch_step_count(&self) -> Result<StepStream>;
}
