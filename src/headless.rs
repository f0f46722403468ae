use crate::core::Schedule;
use crate::player::{spawn_player, DriverStats, PlayerConfig, PlayerError, PlayerHandle, TimelinePlayer};
use crate::sink::ConsoleState;
use anyhow::{Context, Result};
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

type PlayerTask = JoinHandle<Result<TimelinePlayer<ConsoleState>, PlayerError>>;

/// Options for a headless capture run
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub capture_window: Duration,
    pub output: PathBuf,
    pub player: PlayerConfig,
    /// Point in the capture at which the demo is reset and replayed
    pub restart_at: Option<Duration>,
    /// Pause between that reset and the new epoch
    pub restart_delay: Duration,
}

/// Summary of a finished capture
#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub output: PathBuf,
    pub bytes: u64,
    pub epochs: u64,
    pub dispatched: u64,
    pub messages: usize,
    pub alerts: usize,
    pub journal_rows: usize,
}

/// Play the demo with no window for the capture window, then export the
/// console journal as CSV. Ctrl+C stops playback and exports what was
/// captured so far.
///
/// The driver is shut down on every path before this returns.
pub async fn run(options: HeadlessOptions) -> Result<CaptureReport> {
    run_until(options, signal::ctrl_c()).await
}

async fn run_until<F>(options: HeadlessOptions, interrupt: F) -> Result<CaptureReport>
where
    F: Future<Output = io::Result<()>>,
{
    let schedule = Schedule::demo().context("Failed to load demo schedule")?;
    let player = TimelinePlayer::new(schedule, ConsoleState::new(), options.player.clone())
        .context("Invalid player configuration")?;

    let (handle, mut task) = spawn_player(player);
    info!(
        "Headless capture for {}ms into {}",
        options.capture_window.as_millis(),
        options.output.display()
    );

    let started = Instant::now();
    let deadline = started + options.capture_window;
    let mut progress = interval(PROGRESS_INTERVAL);
    progress.set_missed_tick_behavior(MissedTickBehavior::Delay);
    progress.tick().await;

    start_capture(&handle, &mut task).await?;

    let mut restart_pending = options.restart_at.is_some();
    let restart = sleep_until(started + options.restart_at.unwrap_or(options.capture_window));
    tokio::pin!(restart);
    tokio::pin!(interrupt);

    let finished_early = loop {
        tokio::select! {
            _ = sleep_until(deadline) => break None,
            result = &mut task => break Some(result),
            Ok(()) = &mut interrupt => {
                info!("Interrupted after {}ms, stopping playback", started.elapsed().as_millis());
                if let Err(e) = handle.stop().await {
                    warn!("Failed to stop player: {}", e);
                }
                break None;
            }
            _ = &mut restart, if restart_pending => {
                restart_pending = false;
                info!("Resetting demo, next epoch in {}ms", options.restart_delay.as_millis());
                if let Err(e) = handle.reset_and_restart(options.restart_delay).await {
                    warn!("Failed to restart player: {}", e);
                }
            }
            _ = progress.tick() => log_progress(handle.stats(), started.elapsed()),
        }
    };

    let result = match finished_early {
        Some(result) => result,
        None => {
            if let Err(e) = handle.shutdown().await {
                warn!("Player driver already stopped: {}", e);
            }
            task.await
        }
    };
    let player = result
        .context("Player driver panicked")?
        .context("Playback failed")?;

    let console = player.sink();
    let bytes = console
        .export_journal(&options.output)
        .context("Failed to export journal")?;

    let report = CaptureReport {
        output: options.output,
        bytes,
        epochs: player.epoch(),
        dispatched: player.dispatched(),
        messages: console.messages().len(),
        alerts: console.alert_count(),
        journal_rows: console.journal_len(),
    };
    info!(
        "Capture finished: {} epochs, {} dispatches, {} messages and {} alerts on screen, {} journal rows",
        report.epochs, report.dispatched, report.messages, report.alerts, report.journal_rows
    );
    Ok(report)
}

/// Start the first epoch. If the driver refuses, it is shut down and its own
/// error, when it has one, is returned.
async fn start_capture(handle: &PlayerHandle, task: &mut PlayerTask) -> Result<()> {
    let Err(e) = handle.start(Duration::ZERO).await else {
        return Ok(());
    };
    if handle.shutdown().await.is_err() {
        debug!("Player driver already stopped");
    }
    match task.await {
        Ok(Err(driver_error)) => Err(driver_error).context("Failed to start player"),
        _ => Err(e).context("Failed to start player"),
    }
}

fn log_progress(stats: &DriverStats, elapsed: Duration) {
    info!(
        "Capture progress: {}s elapsed, epoch {} {}, {} dispatches",
        elapsed.as_secs(),
        stats.epoch.load(Ordering::SeqCst),
        if stats.running.load(Ordering::SeqCst) { "running" } else { "idle" },
        stats.dispatched.load(Ordering::SeqCst)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_output(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("roamen-{}-{}.csv", name, std::process::id()))
    }

    fn options() -> HeadlessOptions {
        HeadlessOptions {
            capture_window: Duration::from_millis(57_000),
            output: temp_output("default"),
            player: PlayerConfig::default(),
            restart_at: None,
            restart_delay: Duration::from_millis(500),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_writes_journal() {
        let output = temp_output("capture");
        let report = run(HeadlessOptions {
            capture_window: Duration::from_millis(10_000),
            output: output.clone(),
            ..options()
        })
        .await
        .unwrap();

        // Intro, three messages, one standard alert
        assert_eq!(report.epochs, 1);
        assert_eq!(report.messages, 3);
        assert_eq!(report.alerts, 1);
        assert_eq!(report.journal_rows, 5);
        assert!(report.bytes > 0);

        let contents = fs::read_to_string(&output).unwrap();
        assert!(contents.starts_with("timestamp,event,detail"));
        assert_eq!(contents.lines().count(), 6);
        let _ = fs::remove_file(&output);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_covers_restart() {
        let output = temp_output("restart");
        let report = run(HeadlessOptions {
            capture_window: Duration::from_millis(57_500),
            output: output.clone(),
            ..options()
        })
        .await
        .unwrap();

        // Restart at 57s clears the console; nothing else is due before 58s
        assert_eq!(report.epochs, 2);
        assert_eq!(report.messages, 0);
        assert_eq!(report.alerts, 0);
        let _ = fs::remove_file(&output);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unwritable_output_fails() {
        let output = std::env::temp_dir()
            .join("roamen-missing-dir")
            .join("nested")
            .join("journal.csv");
        let result = run(HeadlessOptions {
            capture_window: Duration::from_millis(100),
            output,
            ..options()
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_restart_replays_from_intro() {
        let output = temp_output("manual-restart");
        let report = run(HeadlessOptions {
            capture_window: Duration::from_millis(8_000),
            output: output.clone(),
            restart_at: Some(Duration::from_millis(6_000)),
            ..options()
        })
        .await
        .unwrap();

        // Intro and two messages, the reset, then the replayed intro at 7.5s
        assert_eq!(report.epochs, 2);
        assert_eq!(report.messages, 0);
        assert_eq!(report.journal_rows, 5);

        let contents = fs::read_to_string(&output).unwrap();
        let events: Vec<&str> = contents
            .lines()
            .skip(1)
            .map(|line| line.split(',').nth(1).unwrap())
            .collect();
        assert_eq!(events, vec!["banner", "message", "message", "clear", "banner"]);
        let _ = fs::remove_file(&output);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_stops_and_exports() {
        let output = temp_output("interrupt");
        let interrupt = async {
            tokio::time::sleep(Duration::from_millis(6_000)).await;
            Ok(())
        };
        let report = run_until(
            HeadlessOptions {
                output: output.clone(),
                ..options()
            },
            interrupt,
        )
        .await
        .unwrap();

        assert_eq!(report.epochs, 1);
        assert_eq!(report.messages, 2);
        assert_eq!(report.journal_rows, 3);
        assert!(fs::metadata(&output).is_ok());
        let _ = fs::remove_file(&output);
    }

    #[tokio::test]
    async fn test_start_failure_is_returned() {
        let schedule = Schedule::demo().unwrap();
        let player = TimelinePlayer::new(schedule, ConsoleState::new(), PlayerConfig::default()).unwrap();
        let (handle, mut task) = spawn_player(player);
        handle.shutdown().await.unwrap();
        while !task.is_finished() {
            tokio::task::yield_now().await;
        }

        let err = start_capture(&handle, &mut task).await.unwrap_err();
        assert!(err.to_string().contains("Failed to start player"), "{}", err);
        assert!(matches!(err.downcast_ref::<PlayerError>(), Some(PlayerError::DriverClosed)));
    }
}
