use crate::core::entry::{
    Direction, EntryKind, EntryPayload, NodeId, ScheduleEntry, Severity, ViewId, DEFAULT_SENDER,
};
use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::IntoDeserializer;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Built-in demo script, compiled into the binary
const DEMO_SCHEDULE_JSON: &str = include_str!("../../assets/demo_schedule.json");

pub type ScheduleResult<T> = std::result::Result<T, ScheduleError>;

/// Errors raised while authoring or loading a schedule
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Schedule parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Schedule has no entries")]
    Empty,

    #[error("Entry {index}: no sink operation for kind '{kind}'")]
    InvalidEntryKind { index: usize, kind: String },

    #[error("Entry {index}: missing field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Entry {index}: invalid {field} '{value}'")]
    InvalidValue {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("Entry {index}: outro must be the final entry")]
    OutroNotLast { index: usize },
}

/// Entry as written in the schedule file, before validation
#[derive(Debug, Deserialize)]
struct RawEntry {
    offset_ms: u64,
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    sender: Option<String>,
    #[serde(default)]
    direction: Option<Direction>,
    #[serde(default)]
    origin: Option<NodeId>,
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    view: Option<ViewId>,
    #[serde(default)]
    duration_ms: Option<u64>,
}

impl RawEntry {
    fn into_entry(self, index: usize) -> ScheduleResult<ScheduleEntry> {
        // Parsed apart from the rest so an unknown kind reports its index
        let name: StrDeserializer<'_, ValueError> = self.kind.as_str().into_deserializer();
        let kind = EntryKind::deserialize(name).map_err(|_| ScheduleError::InvalidEntryKind {
            index,
            kind: self.kind.clone(),
        })?;

        let payload = match kind {
            EntryKind::Intro => EntryPayload::Intro {
                text: required(index, "text", self.text)?,
            },
            EntryKind::Outro => EntryPayload::Outro {
                text: required(index, "text", self.text)?,
            },
            EntryKind::Message => {
                let direction = required(index, "direction", self.direction)?;
                let sender = match (direction, self.sender) {
                    (_, Some(sender)) => sender,
                    (Direction::Sent, None) => DEFAULT_SENDER.to_string(),
                    (Direction::Received, None) => {
                        return Err(ScheduleError::MissingField { index, field: "sender" })
                    }
                };
                EntryPayload::Message {
                    text: required(index, "text", self.text)?,
                    sender,
                    direction,
                    origin: self.origin,
                }
            }
            EntryKind::Alert => EntryPayload::Alert {
                severity: required(index, "severity", self.severity)?,
                text: required(index, "text", self.text)?,
                source: required(index, "source", self.source)?,
                origin: required(index, "origin", self.origin)?,
            },
            EntryKind::SwitchView => EntryPayload::SwitchView {
                view: required(index, "view", self.view)?,
            },
            EntryKind::Voice => {
                let duration_ms = required(index, "duration_ms", self.duration_ms)?;
                if duration_ms == 0 {
                    return Err(ScheduleError::InvalidValue {
                        index,
                        field: "duration_ms",
                        value: duration_ms.to_string(),
                    });
                }
                EntryPayload::Voice {
                    duration: Duration::from_millis(duration_ms),
                }
            }
            EntryKind::CloseModal => EntryPayload::CloseModal,
        };

        Ok(ScheduleEntry::new(self.offset_ms, payload))
    }
}

fn required<T>(index: usize, field: &'static str, value: Option<T>) -> ScheduleResult<T> {
    value.ok_or(ScheduleError::MissingField { index, field })
}

/// Validated, immutable list of scripted events
#[derive(Debug, Clone)]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
}

impl Schedule {
    /// Validate entries into a schedule.
    ///
    /// Entries keep their authored order. A decreasing offset is allowed but
    /// logged, since later steps usually assume earlier ones already ran.
    pub fn new(entries: Vec<ScheduleEntry>) -> ScheduleResult<Self> {
        if entries.is_empty() {
            return Err(ScheduleError::Empty);
        }

        let last = entries.len() - 1;
        for (index, entry) in entries.iter().enumerate() {
            if entry.kind() == EntryKind::Outro && index != last {
                return Err(ScheduleError::OutroNotLast { index });
            }
        }

        for (index, pair) in entries.windows(2).enumerate() {
            if pair[1].offset < pair[0].offset {
                warn!(
                    "Schedule entry {} fires at {}ms, before entry {} at {}ms",
                    index + 1,
                    pair[1].offset.as_millis(),
                    index,
                    pair[0].offset.as_millis()
                );
            }
        }

        Ok(Self { entries })
    }

    /// Parse and validate a JSON array of entries
    pub fn from_json(json: &str) -> ScheduleResult<Self> {
        let raw: Vec<RawEntry> = serde_json::from_str(json)?;
        let entries = raw
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_entry(index))
            .collect::<ScheduleResult<Vec<_>>>()?;
        Self::new(entries)
    }

    /// The built-in RoamEN demo script
    pub fn demo() -> ScheduleResult<Self> {
        Self::from_json(DEMO_SCHEDULE_JSON)
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Offset of the latest-firing entry
    pub fn span(&self) -> Duration {
        self.entries.iter().map(|e| e.offset).max().unwrap_or_default()
    }

    pub fn has_outro(&self) -> bool {
        self.entries.last().map(|e| e.kind() == EntryKind::Outro).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_schedule_loads() {
        let schedule = Schedule::demo().unwrap();
        assert_eq!(schedule.len(), 20);
        assert!(schedule.has_outro());
        assert_eq!(schedule.span(), Duration::from_millis(50_000));
        assert_eq!(schedule.entries()[0].kind(), EntryKind::Intro);

        let emergencies = schedule
            .entries()
            .iter()
            .filter(|e| matches!(e.payload, EntryPayload::Alert { severity: Severity::Emergency, .. }))
            .count();
        assert_eq!(emergencies, 1);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let json = r#"[
            { "offset_ms": 0, "kind": "intro", "text": "hi" },
            { "offset_ms": 10, "kind": "teleport" }
        ]"#;
        match Schedule::from_json(json) {
            Err(ScheduleError::InvalidEntryKind { index, kind }) => {
                assert_eq!(index, 1);
                assert_eq!(kind, "teleport");
            }
            other => panic!("expected InvalidEntryKind, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_and_invalid_fields() {
        let missing = r#"[{ "offset_ms": 0, "kind": "alert", "severity": "urgent", "text": "x", "source": "y" }]"#;
        assert!(matches!(
            Schedule::from_json(missing),
            Err(ScheduleError::MissingField { index: 0, field: "origin" })
        ));

        let invalid = r#"[{ "offset_ms": 0, "kind": "switch_view", "view": "settings" }]"#;
        match Schedule::from_json(invalid) {
            Err(ScheduleError::Parse(e)) => assert!(e.to_string().contains("settings"), "{}", e),
            other => panic!("expected Parse, got {:?}", other),
        }

        let severity = r#"[{ "offset_ms": 0, "kind": "alert", "severity": "mild", "text": "x", "source": "y", "origin": 1 }]"#;
        assert!(matches!(Schedule::from_json(severity), Err(ScheduleError::Parse(_))));

        let silent = r#"[{ "offset_ms": 0, "kind": "voice", "duration_ms": 0 }]"#;
        assert!(matches!(
            Schedule::from_json(silent),
            Err(ScheduleError::InvalidValue { field: "duration_ms", .. })
        ));
    }

    #[test]
    fn test_received_message_needs_sender() {
        let json = r#"[{ "offset_ms": 0, "kind": "message", "text": "x", "direction": "received" }]"#;
        assert!(matches!(
            Schedule::from_json(json),
            Err(ScheduleError::MissingField { field: "sender", .. })
        ));

        let json = r#"[{ "offset_ms": 0, "kind": "message", "text": "x", "direction": "sent" }]"#;
        let schedule = Schedule::from_json(json).unwrap();
        assert_eq!(schedule.entries()[0], ScheduleEntry::sent(0, "x"));
    }

    #[test]
    fn test_outro_must_be_last() {
        let entries = vec![
            ScheduleEntry::intro(0, "start"),
            ScheduleEntry::outro(100, "end"),
            ScheduleEntry::sent(200, "late"),
        ];
        assert!(matches!(Schedule::new(entries), Err(ScheduleError::OutroNotLast { index: 1 })));
        assert!(matches!(Schedule::new(Vec::new()), Err(ScheduleError::Empty)));
    }

    #[test]
    fn test_decreasing_offsets_are_kept_in_authored_order() {
        let entries = vec![ScheduleEntry::sent(500, "first"), ScheduleEntry::sent(100, "second")];
        let schedule = Schedule::new(entries).unwrap();
        assert_eq!(schedule.entries()[0].offset, Duration::from_millis(500));
        assert_eq!(schedule.span(), Duration::from_millis(500));
    }
}
