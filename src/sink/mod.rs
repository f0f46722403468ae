pub mod console;
#[cfg(test)]
pub mod recording;
pub mod tones;

pub use console::ConsoleState;
#[cfg(test)]
pub use recording::{RecordingSink, SinkCall};

use crate::core::{Banner, Direction, NodeId, Severity, ViewId};
use std::error::Error;

/// Result type for presentation sink operations
pub type SinkResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Trait for anything that turns dispatched schedule entries into visible state
///
/// Every operation is synchronous: it returns once the visible change is
/// applied. The player's timers already encode all delays, so no operation
/// may wait. Implementations:
/// - `ConsoleState`, drawn by the imgui console and exported headless
/// - `RecordingSink`, which only records calls (tests only)
pub trait PresentationSink {
    /// Append a message to the message list
    fn render_message(
        &mut self,
        text: &str,
        direction: Direction,
        sender: &str,
        origin: Option<NodeId>,
    ) -> SinkResult<()>;

    /// Prepend an alert and update the badge. Emergency alerts also open the
    /// modal and cue the alert tone, in that order.
    fn render_alert(
        &mut self,
        severity: Severity,
        text: &str,
        source: &str,
        origin: NodeId,
    ) -> SinkResult<()>;

    /// Make `view` the active view
    fn switch_view(&mut self, view: ViewId) -> SinkResult<()>;

    /// Show or hide the transmit indicator
    fn set_voice_transmitting(&mut self, transmitting: bool) -> SinkResult<()>;

    /// Dismiss the alert modal, if open
    fn close_modal(&mut self) -> SinkResult<()>;

    /// Clear messages and alerts, zero the badge, return to the default view
    fn clear_all(&mut self) -> SinkResult<()>;

    /// Show an intro or outro caption
    fn announce(&mut self, banner: Banner, text: &str) -> SinkResult<()>;
}
