use crate::player::{PlayerError, TimelinePlayer};
use crate::sink::PresentationSink;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Control commands accepted by a running driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Start a new epoch after `delay` (no-op while running)
    Start { delay: Duration },
    /// Cancel every pending timer
    Stop,
    /// Stop, reset the console, and start again after `delay`
    ResetAndRestart { delay: Duration },
    /// Stop and hand the player back through the join handle
    Shutdown,
}

/// Counters published by the driver after every step
#[derive(Debug, Default)]
pub struct DriverStats {
    pub epoch: AtomicU64,
    pub dispatched: AtomicU64,
    pub running: AtomicBool,
}

impl DriverStats {
    fn update<S: PresentationSink>(&self, player: &TimelinePlayer<S>) {
        self.epoch.store(player.epoch(), Ordering::SeqCst);
        self.dispatched.store(player.dispatched(), Ordering::SeqCst);
        self.running.store(player.is_running(), Ordering::SeqCst);
    }
}

/// Cloneable control surface for a player owned by a driver task
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::Sender<PlayerCommand>,
    stats: Arc<DriverStats>,
}

impl PlayerHandle {
    pub async fn send(&self, command: PlayerCommand) -> Result<(), PlayerError> {
        self.tx.send(command).await.map_err(|_| PlayerError::DriverClosed)
    }

    pub async fn start(&self, delay: Duration) -> Result<(), PlayerError> {
        self.send(PlayerCommand::Start { delay }).await
    }

    pub async fn stop(&self) -> Result<(), PlayerError> {
        self.send(PlayerCommand::Stop).await
    }

    pub async fn reset_and_restart(&self, delay: Duration) -> Result<(), PlayerError> {
        self.send(PlayerCommand::ResetAndRestart { delay }).await
    }

    pub async fn shutdown(&self) -> Result<(), PlayerError> {
        self.send(PlayerCommand::Shutdown).await
    }

    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }
}

/// Move a player onto its own task.
///
/// The task is the player's only execution context: it sleeps until the next
/// deadline, ticks, and applies commands in between, so dispatches never
/// overlap. A sink error stops the player and ends the task with that error.
pub fn spawn_player<S>(
    player: TimelinePlayer<S>,
) -> (PlayerHandle, JoinHandle<Result<TimelinePlayer<S>, PlayerError>>)
where
    S: PresentationSink + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    let stats = Arc::new(DriverStats::default());
    stats.update(&player);

    let handle = PlayerHandle {
        tx,
        stats: stats.clone(),
    };
    let task = tokio::spawn(run_player(player, rx, stats));
    (handle, task)
}

async fn run_player<S: PresentationSink>(
    mut player: TimelinePlayer<S>,
    mut rx: mpsc::Receiver<PlayerCommand>,
    stats: Arc<DriverStats>,
) -> Result<TimelinePlayer<S>, PlayerError> {
    loop {
        let deadline = player.next_deadline();

        tokio::select! {
            biased;

            command = rx.recv() => {
                let command = match command {
                    Some(PlayerCommand::Shutdown) | None => break,
                    Some(command) => command,
                };
                debug!("Player command: {:?}", command);
                if let Err(e) = apply(&mut player, command) {
                    error!("Player command failed: {}", e);
                    player.stop();
                    stats.update(&player);
                    return Err(e);
                }
            }

            _ = sleep_until_deadline(deadline) => {
                if let Err(e) = player.tick(Instant::now().into_std()) {
                    error!("Dispatch failed, stopping player: {}", e);
                    player.stop();
                    stats.update(&player);
                    return Err(e);
                }
            }
        }

        stats.update(&player);
    }

    player.stop();
    stats.update(&player);
    info!(
        "Player driver shut down after {} epochs ({} dispatches)",
        player.epoch(),
        player.dispatched()
    );
    Ok(player)
}

fn apply<S: PresentationSink>(
    player: &mut TimelinePlayer<S>,
    command: PlayerCommand,
) -> Result<(), PlayerError> {
    let now = Instant::now().into_std();
    match command {
        PlayerCommand::Start { delay } => {
            player.start(now + delay);
        }
        PlayerCommand::Stop => {
            player.stop();
        }
        PlayerCommand::ResetAndRestart { delay } => {
            player.reset_and_restart(now + delay)?;
        }
        PlayerCommand::Shutdown => {
            player.stop();
        }
    }
    Ok(())
}

async fn sleep_until_deadline(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Schedule, ScheduleEntry};
    use crate::player::PlayerConfig;
    use crate::sink::{RecordingSink, SinkCall};
    use tokio::time::sleep;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn greeting_player() -> TimelinePlayer<RecordingSink> {
        let schedule = Schedule::new(vec![
            ScheduleEntry::intro(0, "Welcome"),
            ScheduleEntry::sent(1000, "hi"),
            ScheduleEntry::received(1000, "hello", "Node", 7),
        ])
        .unwrap();
        TimelinePlayer::new(schedule, RecordingSink::new(), PlayerConfig::default()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_dispatches_on_schedule() {
        let (handle, task) = spawn_player(greeting_player());
        handle.start(Duration::ZERO).await.unwrap();

        sleep(ms(1500)).await;
        handle.shutdown().await.unwrap();

        let player = task.await.unwrap().unwrap();
        assert_eq!(player.sink().message_texts(), vec!["hi", "hello"]);
        assert!(!player.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_stop_at_500() {
        let (handle, task) = spawn_player(greeting_player());
        handle.start(Duration::ZERO).await.unwrap();

        sleep(ms(500)).await;
        handle.stop().await.unwrap();
        sleep(ms(2000)).await;
        handle.shutdown().await.unwrap();

        let player = task.await.unwrap().unwrap();
        assert!(player.sink().message_texts().is_empty());
        assert_eq!(player.sink().calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_loops_until_shutdown() {
        let schedule = Schedule::new(vec![ScheduleEntry::sent(0, "a"), ScheduleEntry::outro(100, "Bye")]).unwrap();
        let config = PlayerConfig {
            looping: true,
            loop_pause: ms(200),
        };
        let player = TimelinePlayer::new(schedule, RecordingSink::new(), config).unwrap();
        let (handle, task) = spawn_player(player);
        handle.start(Duration::ZERO).await.unwrap();

        // Epochs start at 0, 300, 600 and 900
        sleep(ms(1000)).await;
        assert_eq!(handle.stats().epoch.load(Ordering::SeqCst), 4);
        assert!(handle.stats().running.load(Ordering::SeqCst));

        handle.shutdown().await.unwrap();
        let player = task.await.unwrap().unwrap();
        assert_eq!(player.sink().message_texts(), vec!["a", "a", "a", "a"]);
        assert_eq!(player.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_reset_and_restart() {
        let (handle, task) = spawn_player(greeting_player());
        handle.start(Duration::ZERO).await.unwrap();
        sleep(ms(1200)).await;

        handle.reset_and_restart(ms(500)).await.unwrap();
        sleep(ms(2000)).await;
        handle.shutdown().await.unwrap();

        let player = task.await.unwrap().unwrap();
        assert_eq!(player.epoch(), 2);
        assert_eq!(player.sink().message_texts(), vec!["hi", "hello", "hi", "hello"]);
        assert!(player.sink().calls().contains(&SinkCall::ClearAll));
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_ends_on_sink_error() {
        let schedule = Schedule::new(vec![ScheduleEntry::sent(0, "a"), ScheduleEntry::sent(100, "b")]).unwrap();
        let player =
            TimelinePlayer::new(schedule, RecordingSink::failing_on(1), PlayerConfig::default()).unwrap();
        let (handle, task) = spawn_player(player);
        handle.start(Duration::ZERO).await.unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(PlayerError::Sink { index: Some(0), .. })));
        assert!(matches!(handle.stop().await, Err(PlayerError::DriverClosed)));
    }
}
