use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Mesh node identifier (e.g. 1042 for this device)
pub type NodeId = u32;

/// Sender name used for outgoing messages that don't name one
pub const DEFAULT_SENDER: &str = "You";

/// Direction of a console message relative to this device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

/// Alert severity, in increasing order of urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Standard,
    Urgent,
    Emergency,
}

/// Console views reachable from the navigation bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewId {
    Messages,
    Alerts,
    Voice,
    Network,
}

impl ViewId {
    /// All views in navigation order
    pub const ALL: [ViewId; 4] = [ViewId::Messages, ViewId::Alerts, ViewId::Voice, ViewId::Network];

    /// View shown after a reset
    pub const fn canonical() -> Self {
        ViewId::Messages
    }

    pub fn title(&self) -> &'static str {
        match self {
            ViewId::Messages => "Messages",
            ViewId::Alerts => "Alerts",
            ViewId::Voice => "Voice",
            ViewId::Network => "Network",
        }
    }
}

/// Intro and outro captions share one sink operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    Intro,
    Outro,
}

/// Discriminant of a schedule entry. Schedule files may spell the two
/// compound kinds in either snake or camel case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Intro,
    Message,
    Alert,
    #[serde(alias = "switchView")]
    SwitchView,
    Voice,
    #[serde(alias = "closeModal")]
    CloseModal,
    Outro,
}

/// Payload of a schedule entry, keyed by kind
#[derive(Debug, Clone, PartialEq)]
pub enum EntryPayload {
    Intro { text: String },
    Message {
        text: String,
        sender: String,
        direction: Direction,
        origin: Option<NodeId>,
    },
    Alert {
        severity: Severity,
        text: String,
        source: String,
        origin: NodeId,
    },
    SwitchView { view: ViewId },
    Voice { duration: Duration },
    CloseModal,
    Outro { text: String },
}

impl EntryPayload {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryPayload::Intro { .. } => EntryKind::Intro,
            EntryPayload::Message { .. } => EntryKind::Message,
            EntryPayload::Alert { .. } => EntryKind::Alert,
            EntryPayload::SwitchView { .. } => EntryKind::SwitchView,
            EntryPayload::Voice { .. } => EntryKind::Voice,
            EntryPayload::CloseModal => EntryKind::CloseModal,
            EntryPayload::Outro { .. } => EntryKind::Outro,
        }
    }
}

/// One scripted event: fires `offset` after the timeline starts
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub offset: Duration,
    pub payload: EntryPayload,
}

impl ScheduleEntry {
    pub fn new(offset_ms: u64, payload: EntryPayload) -> Self {
        Self {
            offset: Duration::from_millis(offset_ms),
            payload,
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.payload.kind()
    }
}

#[cfg(test)]
impl ScheduleEntry {
    pub fn intro(offset_ms: u64, text: &str) -> Self {
        Self::new(offset_ms, EntryPayload::Intro { text: text.to_string() })
    }

    pub fn outro(offset_ms: u64, text: &str) -> Self {
        Self::new(offset_ms, EntryPayload::Outro { text: text.to_string() })
    }

    pub fn sent(offset_ms: u64, text: &str) -> Self {
        Self::new(offset_ms, EntryPayload::Message {
            text: text.to_string(),
            sender: DEFAULT_SENDER.to_string(),
            direction: Direction::Sent,
            origin: None,
        })
    }

    pub fn received(offset_ms: u64, text: &str, sender: &str, origin: NodeId) -> Self {
        Self::new(offset_ms, EntryPayload::Message {
            text: text.to_string(),
            sender: sender.to_string(),
            direction: Direction::Received,
            origin: Some(origin),
        })
    }

    pub fn alert(offset_ms: u64, severity: Severity, text: &str, source: &str, origin: NodeId) -> Self {
        Self::new(offset_ms, EntryPayload::Alert {
            severity,
            text: text.to_string(),
            source: source.to_string(),
            origin,
        })
    }

    pub fn switch_view(offset_ms: u64, view: ViewId) -> Self {
        Self::new(offset_ms, EntryPayload::SwitchView { view })
    }

    pub fn voice(offset_ms: u64, duration_ms: u64) -> Self {
        Self::new(offset_ms, EntryPayload::Voice {
            duration: Duration::from_millis(duration_ms),
        })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Standard => "standard",
            Severity::Urgent => "urgent",
            Severity::Emergency => "emergency",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Sent => "sent",
            Direction::Received => "received",
        })
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewId::Messages => "messages",
            ViewId::Alerts => "alerts",
            ViewId::Voice => "voice",
            ViewId::Network => "network",
        })
    }
}
