use crate::core::entry::DEFAULT_SENDER;
use crate::core::topology;
use crate::core::{Banner, Direction, NodeId, Severity, ViewId};
use crate::sink::tones::AlertTone;
use crate::sink::{PresentationSink, SinkResult};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;

/// Maximum journal entries kept; the oldest are dropped first
pub const MAX_JOURNAL_ENTRIES: usize = 5000;

/// A message as shown in the message list
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub text: String,
    pub direction: Direction,
    pub sender: String,
    pub origin: Option<NodeId>,
    pub at: DateTime<Utc>,
}

impl RenderedMessage {
    /// Header label, e.g. "Relay Station A (#1001)"
    pub fn header(&self) -> String {
        match self.origin {
            Some(node) => format!("{} (#{})", self.sender, node),
            None => self.sender.clone(),
        }
    }
}

/// An alert as shown in the alert list
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAlert {
    pub severity: Severity,
    pub text: String,
    pub source: String,
    pub origin: NodeId,
    pub at: DateTime<Utc>,
}

impl RenderedAlert {
    pub fn title(&self) -> String {
        format!("{} ALERT", self.severity.to_string().to_uppercase())
    }

    pub fn source_line(&self) -> String {
        format!("From: {} (#{})", self.source, self.origin)
    }
}

/// A tone cue and when it started
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneCue {
    pub tone: AlertTone,
    pub at: DateTime<Utc>,
}

impl ToneCue {
    pub fn is_sounding(&self, now: DateTime<Utc>) -> bool {
        let elapsed = (now - self.at).to_std().unwrap_or_default();
        elapsed < self.tone.duration()
    }
}

/// A visible change, as recorded in the journal
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleEvent {
    MessageRendered {
        direction: Direction,
        header: String,
        text: String,
    },
    AlertRendered {
        severity: Severity,
        source: String,
        text: String,
        badge: usize,
    },
    ModalOpened(Severity),
    ToneTriggered(Severity),
    ModalClosed,
    ViewSwitched(ViewId),
    VoiceChanged(bool),
    Announced { banner: Banner, text: String },
    Cleared,
}

impl ConsoleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ConsoleEvent::MessageRendered { .. } => "message",
            ConsoleEvent::AlertRendered { .. } => "alert",
            ConsoleEvent::ModalOpened(_) => "modal_open",
            ConsoleEvent::ToneTriggered(_) => "tone",
            ConsoleEvent::ModalClosed => "modal_close",
            ConsoleEvent::ViewSwitched(_) => "view",
            ConsoleEvent::VoiceChanged(_) => "voice",
            ConsoleEvent::Announced { .. } => "banner",
            ConsoleEvent::Cleared => "clear",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ConsoleEvent::MessageRendered { direction, header, text } => {
                format!("{} {}: {}", direction, header, text)
            }
            ConsoleEvent::AlertRendered { severity, source, text, badge } => {
                format!("{} from {}: {} [badge {}]", severity, source, text, badge)
            }
            ConsoleEvent::ModalOpened(severity) | ConsoleEvent::ToneTriggered(severity) => {
                severity.to_string()
            }
            ConsoleEvent::ModalClosed | ConsoleEvent::Cleared => String::new(),
            ConsoleEvent::ViewSwitched(view) => view.to_string(),
            ConsoleEvent::VoiceChanged(on) => {
                let status = if *on { "transmitting" } else { "ready" };
                status.to_string()
            }
            ConsoleEvent::Announced { banner, text } => format!("{:?}: {}", banner, text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub at: DateTime<Utc>,
    pub event: ConsoleEvent,
}

#[derive(Serialize)]
struct JournalRecord<'a> {
    timestamp: String,
    event: &'a str,
    detail: String,
}

/// Everything the console shows, owned by the presentation sink
#[derive(Debug, Clone)]
pub struct ConsoleState {
    messages: Vec<RenderedMessage>,
    /// Most recent first
    alerts: VecDeque<RenderedAlert>,
    active_view: ViewId,
    voice_transmitting: bool,
    badge_count: usize,
    modal: Option<RenderedAlert>,
    banner: Option<(Banner, String)>,
    last_tone: Option<ToneCue>,
    journal: VecDeque<JournalEntry>,
}

impl Default for ConsoleState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            alerts: VecDeque::new(),
            active_view: ViewId::canonical(),
            voice_transmitting: false,
            badge_count: 0,
            modal: None,
            banner: None,
            last_tone: None,
            journal: VecDeque::with_capacity(256),
        }
    }

    pub fn messages(&self) -> &[RenderedMessage] {
        &self.messages
    }

    pub fn alerts(&self) -> impl Iterator<Item = &RenderedAlert> {
        self.alerts.iter()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }

    pub fn active_view(&self) -> ViewId {
        self.active_view
    }

    pub fn is_transmitting(&self) -> bool {
        self.voice_transmitting
    }

    pub fn badge_count(&self) -> usize {
        self.badge_count
    }

    pub fn modal(&self) -> Option<&RenderedAlert> {
        self.modal.as_ref()
    }

    pub fn banner(&self) -> Option<(Banner, &str)> {
        self.banner.as_ref().map(|(b, text)| (*b, text.as_str()))
    }

    pub fn last_tone(&self) -> Option<ToneCue> {
        self.last_tone
    }

    pub fn journal(&self) -> impl Iterator<Item = &JournalEntry> {
        self.journal.iter()
    }

    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Sent message typed into the console by the operator
    pub fn send_local_message(&mut self, text: &str) -> SinkResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        self.render_message(text, Direction::Sent, DEFAULT_SENDER, None)
    }

    /// Alert raised from the console's quick-alert buttons
    pub fn raise_local_alert(&mut self, severity: Severity, text: &str) -> SinkResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        self.render_alert(severity, text, DEFAULT_SENDER, topology::LOCAL_NODE)
    }

    fn record(&mut self, event: ConsoleEvent) {
        if self.journal.len() >= MAX_JOURNAL_ENTRIES {
            self.journal.pop_front();
        }
        self.journal.push_back(JournalEntry { at: Utc::now(), event });
    }

    /// Write the journal as CSV (timestamp, event, detail)
    pub fn write_journal_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for entry in &self.journal {
            wtr.serialize(JournalRecord {
                timestamp: entry.at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                event: entry.event.name(),
                detail: entry.event.detail(),
            })
            .context("Failed to write journal row")?;
        }
        wtr.flush().context("Failed to flush journal")?;
        Ok(())
    }

    /// Export the journal to a CSV file, returning the bytes written
    pub fn export_journal(&self, path: &Path) -> Result<u64> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        self.write_journal_csv(&file)?;
        let size = file
            .metadata()
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        Ok(size)
    }
}

impl PresentationSink for ConsoleState {
    fn render_message(
        &mut self,
        text: &str,
        direction: Direction,
        sender: &str,
        origin: Option<NodeId>,
    ) -> SinkResult<()> {
        let message = RenderedMessage {
            text: text.to_string(),
            direction,
            sender: sender.to_string(),
            origin,
            at: Utc::now(),
        };
        let header = message.header();
        self.messages.push(message);
        self.record(ConsoleEvent::MessageRendered {
            direction,
            header,
            text: text.to_string(),
        });
        Ok(())
    }

    fn render_alert(
        &mut self,
        severity: Severity,
        text: &str,
        source: &str,
        origin: NodeId,
    ) -> SinkResult<()> {
        let alert = RenderedAlert {
            severity,
            text: text.to_string(),
            source: source.to_string(),
            origin,
            at: Utc::now(),
        };

        self.alerts.push_front(alert.clone());
        self.badge_count = self.alerts.len();
        self.record(ConsoleEvent::AlertRendered {
            severity,
            source: source.to_string(),
            text: text.to_string(),
            badge: self.badge_count,
        });

        if severity == Severity::Emergency {
            self.modal = Some(alert);
            self.record(ConsoleEvent::ModalOpened(severity));

            let tone = AlertTone::for_severity(severity);
            self.last_tone = Some(ToneCue { tone, at: Utc::now() });
            self.record(ConsoleEvent::ToneTriggered(severity));
        }

        Ok(())
    }

    fn switch_view(&mut self, view: ViewId) -> SinkResult<()> {
        self.active_view = view;
        self.record(ConsoleEvent::ViewSwitched(view));
        Ok(())
    }

    fn set_voice_transmitting(&mut self, transmitting: bool) -> SinkResult<()> {
        if self.voice_transmitting != transmitting {
            self.voice_transmitting = transmitting;
            self.record(ConsoleEvent::VoiceChanged(transmitting));
        }
        Ok(())
    }

    fn close_modal(&mut self) -> SinkResult<()> {
        if self.modal.take().is_some() {
            self.record(ConsoleEvent::ModalClosed);
        }
        Ok(())
    }

    fn clear_all(&mut self) -> SinkResult<()> {
        self.messages.clear();
        self.alerts.clear();
        self.badge_count = 0;
        self.modal = None;
        self.banner = None;
        self.voice_transmitting = false;
        self.active_view = ViewId::canonical();
        self.record(ConsoleEvent::Cleared);
        Ok(())
    }

    fn announce(&mut self, banner: Banner, text: &str) -> SinkResult<()> {
        self.banner = Some((banner, text.to_string()));
        self.record(ConsoleEvent::Announced {
            banner,
            text: text.to_string(),
        });
        Ok(())
    }
}
