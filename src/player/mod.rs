pub mod driver;
pub mod engine;

pub use driver::{spawn_player, DriverStats, PlayerHandle};
pub use engine::TimelinePlayer;

use std::time::Duration;
use thiserror::Error;

/// Loop pause used by the demo: 2s outro hold plus 5s before restarting
pub const DEFAULT_LOOP_PAUSE: Duration = Duration::from_millis(7000);

/// Player state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Running,
}

/// Player configuration
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Restart from the first entry after the outro
    pub looping: bool,
    /// Delay between the outro firing and the next epoch starting
    pub loop_pause: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            looping: true,
            loop_pause: DEFAULT_LOOP_PAUSE,
        }
    }
}

/// Result of a `start` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new epoch was armed with this many entry timers
    Started { armed: usize },
    /// A run was already live; nothing was armed
    AlreadyRunning,
}

/// Identifier of an armed timer. Handles increase monotonically, so on equal
/// deadlines the earlier-armed timer fires first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(pub u64);

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Invalid player configuration: {0}")]
    InvalidConfig(String),

    #[error("Entry {index} would still be pending when the loop restarts")]
    OutlivesLoop { index: usize },

    #[error("Reset requires a stopped player ({pending} timers still pending)")]
    ResetWhilePending { pending: usize },

    #[error("Player driver has shut down")]
    DriverClosed,

    #[error("Sink failed while dispatching {}: {source}", describe_index(.index))]
    Sink {
        index: Option<usize>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

fn describe_index(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!("entry {}", i),
        None => "follow-up timer".to_string(),
    }
}
