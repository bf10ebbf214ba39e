//! Line-based stand-in for the phone screen.
//!
//! Each input line is either a command or, like the goal text field, raw goal
//! text. State changes and goal alerts are printed as they arrive.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::sensor::SimulatedPedometer;
use crate::tracker::{AppLifecycle, GoalAlert, StepSnapshot, StepTracker, TrackerEvent};

const HELP: &str = "\
commands:
  <number>          set the goal (any other text counts as goal text)
  goal <text>       set the goal from text
  walk <steps>      take steps on the simulated pedometer
  ok                dismiss the goal alert
  active | inactive | background
                    change the app lifecycle state
  status            print the current screen
  quit              exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Goal(String),
    Walk(u64),
    Acknowledge,
    Lifecycle(AppLifecycle),
    Status,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> ConsoleCommand {
    let trimmed = line.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default().to_ascii_lowercase();
    let rest = parts.next().map(str::trim).unwrap_or_default();

    match head.as_str() {
        "" | "status" => ConsoleCommand::Status,
        "quit" | "exit" => ConsoleCommand::Quit,
        "help" | "?" => ConsoleCommand::Help,
        "ok" | "okay" => ConsoleCommand::Acknowledge,
        "goal" => ConsoleCommand::Goal(rest.to_string()),
        "walk" => match rest.parse::<u64>() {
            Ok(steps) => ConsoleCommand::Walk(steps),
            Err(_) if rest.is_empty() => ConsoleCommand::Walk(1),
            Err(_) => ConsoleCommand::Help,
        },
        _ => match head.parse::<AppLifecycle>() {
            Ok(state) if rest.is_empty() => ConsoleCommand::Lifecycle(state),
            _ => ConsoleCommand::Goal(trimmed.to_string()),
        },
    }
}

pub fn render_snapshot(snapshot: &StepSnapshot) -> String {
    let mut lines = vec!["== StepApp ==".to_string()];
    if let Some(banner) = snapshot.unavailable_message() {
        lines.push(banner.to_string());
    }
    lines.push(format!("Steps taken today: {}", snapshot.baseline_steps));
    lines.push(format!(
        "Walk! And watch this go up: {}",
        snapshot.live_steps
    ));
    lines.push(format!("Set Your Goal: {}", snapshot.goal));
    lines.push(snapshot.message.clone());
    lines.join("\n")
}

pub fn render_alert(alert: &GoalAlert) -> String {
    format!(
        "*** {} ***\n{}\n[{}] (type 'ok')",
        alert.title, alert.message, alert.button
    )
}

/// Print every tracker event until the tracker goes away.
pub fn spawn_event_printer(mut events: broadcast::Receiver<TrackerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(TrackerEvent::StateChanged(snapshot)) => {
                    println!("{}\n", render_snapshot(&snapshot));
                }
                Ok(TrackerEvent::GoalReached(alert)) => {
                    println!("{}\n", render_alert(&alert));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("console skipped {skipped} tracker events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

pub struct Console {
    tracker: StepTracker<SimulatedPedometer>,
    pedometer: SimulatedPedometer,
    lifecycle: watch::Sender<AppLifecycle>,
}

impl Console {
    pub fn new(
        tracker: StepTracker<SimulatedPedometer>,
        pedometer: SimulatedPedometer,
        lifecycle: watch::Sender<AppLifecycle>,
    ) -> Self {
        Self {
            tracker,
            pedometer,
            lifecycle,
        }
    }

    /// Read commands from `input` until it ends or `quit` is entered.
    pub async fn run<R>(&self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        println!("{HELP}\n");
        let mut lines = input.lines();

        while let Some(line) = lines
            .next_line()
            .await
            .context("failed to read console input")?
        {
            if !self.handle(parse_command(&line)).await {
                break;
            }
        }
        Ok(())
    }

    /// Returns false when the console should stop.
    pub async fn handle(&self, command: ConsoleCommand) -> bool {
        match command {
            ConsoleCommand::Goal(text) => {
                let goal = self.tracker.set_goal(&text).await;
                log::debug!("goal text {text:?} parsed to {goal}");
            }
            ConsoleCommand::Walk(steps) => self.pedometer.walk(steps),
            ConsoleCommand::Acknowledge => {
                if !self.tracker.acknowledge_goal().await {
                    println!("No alert to dismiss.");
                }
            }
            ConsoleCommand::Lifecycle(state) => {
                self.lifecycle.send_replace(state);
            }
            ConsoleCommand::Status => {
                println!("{}\n", render_snapshot(&self.tracker.snapshot().await));
            }
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{SensorAvailability, TrackerConfig, TrackerPhase};

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("walk 12"), ConsoleCommand::Walk(12));
        assert_eq!(parse_command("walk"), ConsoleCommand::Walk(1));
        assert_eq!(parse_command("walk far"), ConsoleCommand::Help);
        assert_eq!(parse_command(" OK "), ConsoleCommand::Acknowledge);
        assert_eq!(
            parse_command("background"),
            ConsoleCommand::Lifecycle(AppLifecycle::Background)
        );
        assert_eq!(parse_command(""), ConsoleCommand::Status);
        assert_eq!(parse_command("quit"), ConsoleCommand::Quit);
    }

    #[test]
    fn anything_else_is_goal_text() {
        assert_eq!(parse_command("8000"), ConsoleCommand::Goal("8000".into()));
        assert_eq!(
            parse_command("goal ten thousand"),
            ConsoleCommand::Goal("ten thousand".into())
        );
        assert_eq!(
            parse_command("active please"),
            ConsoleCommand::Goal("active please".into())
        );
    }

    #[test]
    fn renders_unavailable_banner() {
        let snapshot = StepSnapshot {
            availability: SensorAvailability::Unavailable,
            phase: TrackerPhase::Unavailable,
            baseline_steps: 0,
            live_steps: 0,
            goal: 5_000,
            remaining: 5_000,
            goal_alert_pending: false,
            message: "You need to walk 5000 more steps to reach your goal!".into(),
        };

        let screen = render_snapshot(&snapshot);
        assert!(screen.contains("Pedometer is not available on this device."));
        assert!(screen.contains("Steps taken today: 0"));
    }

    #[tokio::test]
    async fn scripted_session() {
        let pedometer = SimulatedPedometer::new();
        let tracker = StepTracker::new(pedometer.clone(), TrackerConfig::default());
        let (lifecycle, lifecycle_rx) = watch::channel(AppLifecycle::Active);
        tracker.initialize(lifecycle_rx).await.unwrap();

        let console = Console::new(tracker.clone(), pedometer.clone(), lifecycle);
        let script: &[u8] = b"goal abc\nok\n30\nquit\nwalk 5\n";
        console.run(script).await.unwrap();

        let snapshot = tracker.snapshot().await;
        assert_eq!(snapshot.goal, 30);
        assert!(!snapshot.goal_alert_pending);
        // Input after `quit` is never read.
        assert_eq!(pedometer.steps_today(), 0);
    }
}
