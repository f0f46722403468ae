use crate::core::{Banner, EntryPayload, Schedule};
use crate::player::{PlayerConfig, PlayerError, PlayerState, StartOutcome, TimerHandle};
use crate::sink::{PresentationSink, SinkResult};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerAction {
    /// Dispatch the schedule entry at this index
    Entry(usize),
    /// End a voice transmission started by a Voice entry
    VoiceRelease,
    /// Reset and start the next epoch
    LoopRestart,
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    handle: TimerHandle,
    due: Instant,
    action: TimerAction,
}

/// Replays a fixed schedule against wall-clock time and loops it
///
/// Time only advances through `tick`, so the same player serves the
/// frame-driven console (one tick per frame) and the async driver (one tick
/// per deadline). Every timer the player arms, including voice releases and
/// the loop restart, lives in one registry that `stop` empties.
pub struct TimelinePlayer<S> {
    schedule: Schedule,
    sink: S,
    config: PlayerConfig,
    state: PlayerState,
    /// Sorted by (due, handle)
    pending: Vec<PendingTimer>,
    next_handle: u64,
    epoch: u64,
    dispatched: u64,
}

impl<S: PresentationSink> TimelinePlayer<S> {
    pub fn new(schedule: Schedule, sink: S, config: PlayerConfig) -> Result<Self, PlayerError> {
        if config.looping && config.loop_pause.is_zero() {
            return Err(PlayerError::InvalidConfig(
                "loop pause must be non-zero when looping".to_string(),
            ));
        }

        if config.looping && schedule.has_outro() {
            let outro_offset = schedule.entries().last().map(|e| e.offset).unwrap_or_default();
            let restart_at = outro_offset + config.loop_pause;
            // A voice release may be armed after the restart timer, so it
            // must fall strictly before the restart to be flushed by then.
            for (index, entry) in schedule.entries().iter().enumerate() {
                let outlives = match entry.payload {
                    EntryPayload::Voice { duration } => entry.offset + duration >= restart_at,
                    _ => entry.offset > restart_at,
                };
                if outlives {
                    return Err(PlayerError::OutlivesLoop { index });
                }
            }
        }

        Ok(Self {
            schedule,
            sink,
            config,
            state: PlayerState::Idle,
            pending: Vec::with_capacity(32),
            next_handle: 0,
            epoch: 0,
            dispatched: 0,
        })
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PlayerState::Running
    }

    /// Number of epochs started so far
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Total sink dispatches performed
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Handles of armed timers, in firing order
    #[cfg(test)]
    pub fn pending_handles(&self) -> Vec<TimerHandle> {
        self.pending.iter().map(|t| t.handle).collect()
    }

    /// When the next armed timer is due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.first().map(|t| t.due)
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn arm(&mut self, due: Instant, action: TimerAction) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        let pos = self.pending.partition_point(|t| (t.due, t.handle) <= (due, handle));
        self.pending.insert(pos, PendingTimer { handle, due, action });
        handle
    }

    /// Arm one timer per entry, relative to `origin`
    ///
    /// A no-op while already running: at most one run's timers are live.
    pub fn start(&mut self, origin: Instant) -> StartOutcome {
        if self.state == PlayerState::Running {
            debug!("Start ignored, epoch {} is already running", self.epoch);
            return StartOutcome::AlreadyRunning;
        }

        self.epoch += 1;
        for index in 0..self.schedule.len() {
            let due = origin + self.schedule.entries()[index].offset;
            self.arm(due, TimerAction::Entry(index));
        }
        self.state = PlayerState::Running;

        info!(
            "Started epoch {} ({} entries over {}ms)",
            self.epoch,
            self.schedule.len(),
            self.schedule.span().as_millis()
        );
        StartOutcome::Started { armed: self.schedule.len() }
    }

    /// Cancel every pending timer, including the loop restart.
    ///
    /// Already-fired entries stay applied. Returns the number cancelled.
    pub fn stop(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        if self.state == PlayerState::Running {
            info!("Stopped epoch {} ({} timers cancelled)", self.epoch, cancelled);
        }
        self.state = PlayerState::Idle;
        cancelled
    }

    /// Clear the console back to its default view.
    ///
    /// Requires a stopped player: pending timers are not cancelled here.
    pub fn reset(&mut self) -> Result<(), PlayerError> {
        if !self.pending.is_empty() {
            return Err(PlayerError::ResetWhilePending {
                pending: self.pending.len(),
            });
        }
        self.state = PlayerState::Idle;
        self.sink
            .clear_all()
            .map_err(|source| PlayerError::Sink { index: None, source })
    }

    /// Stop, reset, then start a new epoch at `origin`
    pub fn reset_and_restart(&mut self, origin: Instant) -> Result<StartOutcome, PlayerError> {
        self.stop();
        self.reset()?;
        Ok(self.start(origin))
    }

    /// Fire every timer due at or before `now`, in (due, handle) order.
    ///
    /// Returns the number of timers fired. A sink error stops the tick and is
    /// returned as is; the remaining timers stay armed for the caller to stop
    /// or resume.
    pub fn tick(&mut self, now: Instant) -> Result<usize, PlayerError> {
        let mut fired = 0;
        while self.pending.first().map_or(false, |t| t.due <= now) {
            let timer = self.pending.remove(0);
            fired += 1;
            self.fire(timer)?;
        }

        if self.state == PlayerState::Running && self.pending.is_empty() {
            self.state = PlayerState::Idle;
            info!("Epoch {} finished", self.epoch);
        }

        Ok(fired)
    }

    fn fire(&mut self, timer: PendingTimer) -> Result<(), PlayerError> {
        match timer.action {
            TimerAction::Entry(index) => self.dispatch(index, timer.due),
            TimerAction::VoiceRelease => {
                self.sink
                    .set_voice_transmitting(false)
                    .map_err(|source| PlayerError::Sink { index: None, source })?;
                self.dispatched += 1;
                Ok(())
            }
            TimerAction::LoopRestart => {
                info!("Demo complete, restarting (epoch {})", self.epoch + 1);
                self.reset()?;
                self.start(timer.due);
                Ok(())
            }
        }
    }

    /// Route one entry to its sink operation; follow-up timers are armed
    /// relative to the entry's own due time.
    fn dispatch(&mut self, index: usize, due: Instant) -> Result<(), PlayerError> {
        let entry = &self.schedule.entries()[index];
        debug!("Dispatching entry {} ({:?}) at +{}ms", index, entry.kind(), entry.offset.as_millis());

        let sink = &mut self.sink;
        let (result, follow_up): (SinkResult<()>, Option<(Duration, TimerAction)>) = match &entry.payload {
            EntryPayload::Intro { text } => (sink.announce(Banner::Intro, text), None),
            EntryPayload::Message { text, sender, direction, origin } => {
                (sink.render_message(text, *direction, sender, *origin), None)
            }
            EntryPayload::Alert { severity, text, source, origin } => {
                (sink.render_alert(*severity, text, source, *origin), None)
            }
            EntryPayload::SwitchView { view } => (sink.switch_view(*view), None),
            EntryPayload::Voice { duration } => (
                sink.set_voice_transmitting(true),
                Some((*duration, TimerAction::VoiceRelease)),
            ),
            EntryPayload::CloseModal => (sink.close_modal(), None),
            EntryPayload::Outro { text } => {
                let restart = self
                    .config
                    .looping
                    .then_some((self.config.loop_pause, TimerAction::LoopRestart));
                (sink.announce(Banner::Outro, text), restart)
            }
        };

        result.map_err(|source| PlayerError::Sink {
            index: Some(index),
            source,
        })?;
        self.dispatched += 1;

        if let Some((delay, action)) = follow_up {
            self.arm(due + delay, action);
        }
        Ok(())
    }
}
