pub mod console;
pub mod sensor;
pub mod settings;
pub mod tracker;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use tokio::io::BufReader;
use tokio::sync::watch;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use console::{spawn_event_printer, Console};
use sensor::SimulatedPedometer;
use settings::SettingsStore;
use tracker::{AppLifecycle, StepTracker};

const DEFAULT_SETTINGS_FILE: &str = "stepapp-settings.json";
const DEBUG_WALK_INTERVAL_MS: u64 = 200;

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("StepApp starting up...");

    let result = tokio::runtime::Runtime::new()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| runtime.block_on(run_app()));

    if let Err(err) = result {
        log::error!("StepApp exited with an error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_app() -> Result<()> {
    let settings_path = std::env::var("STEPAPP_SETTINGS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let settings = SettingsStore::new(settings_path)?;
    log::info!("Settings from {}", settings.path().display());

    let debug_mode = std::env::var("STEPAPP_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let simulator = settings.simulator();
    let pedometer = SimulatedPedometer::from_settings(&simulator);
    let tracker = StepTracker::new(pedometer.clone(), settings.tracker());

    let printer = spawn_event_printer(tracker.subscribe_events());

    let walk_interval = if debug_mode {
        Duration::from_millis(DEBUG_WALK_INTERVAL_MS)
    } else {
        Duration::from_millis(simulator.walk_interval_ms.max(1))
    };
    let walker_token = CancellationToken::new();
    let walker = pedometer.spawn_walker(
        walk_interval,
        simulator.max_steps_per_tick,
        walker_token.clone(),
    );

    let (lifecycle_tx, lifecycle_rx) = watch::channel(AppLifecycle::Active);
    tracker.initialize(lifecycle_rx).await?;

    let console = Console::new(tracker.clone(), pedometer, lifecycle_tx);
    let outcome = console.run(BufReader::new(tokio::io::stdin())).await;

    walker_token.cancel();
    if let Err(err) = walker.await {
        log::warn!("Simulated walker ended badly: {err}");
    }
    tracker.shutdown().await?;
    printer.abort();

    log::info!("StepApp shut down");
    outcome
}
