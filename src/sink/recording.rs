use crate::core::{Banner, Direction, NodeId, Severity, ViewId};
use crate::sink::{PresentationSink, SinkResult};

/// One recorded sink invocation
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Message {
        text: String,
        direction: Direction,
        sender: String,
        origin: Option<NodeId>,
    },
    Alert {
        severity: Severity,
        text: String,
        source: String,
        origin: NodeId,
    },
    SwitchView(ViewId),
    Voice(bool),
    CloseModal,
    ClearAll,
    Announce(Banner, String),
}

/// Presentation sink that records calls instead of drawing. Records only
/// what the player invoked; console side effects live in `ConsoleState`.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    calls: Vec<SinkCall>,
    fail_on_call: Option<usize>,
    invocations: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the n-th (1-based) sink operation fail
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    /// Drain the recorded calls (for verification)
    pub fn take_calls(&mut self) -> Vec<SinkCall> {
        self.calls.drain(..).collect()
    }

    /// Number of sink operations invoked, including the failed one
    pub fn invocations(&self) -> usize {
        self.invocations
    }

    /// Texts of rendered messages, in order
    pub fn message_texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::Message { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn invoke(&mut self, call: SinkCall) -> SinkResult<()> {
        self.invocations += 1;
        if self.fail_on_call == Some(self.invocations) {
            return Err(format!("sink failure on call {}", self.invocations).into());
        }
        self.calls.push(call);
        Ok(())
    }
}

impl PresentationSink for RecordingSink {
    fn render_message(
        &mut self,
        text: &str,
        direction: Direction,
        sender: &str,
        origin: Option<NodeId>,
    ) -> SinkResult<()> {
        self.invoke(SinkCall::Message {
            text: text.to_string(),
            direction,
            sender: sender.to_string(),
            origin,
        })
    }

    fn render_alert(
        &mut self,
        severity: Severity,
        text: &str,
        source: &str,
        origin: NodeId,
    ) -> SinkResult<()> {
        self.invoke(SinkCall::Alert {
            severity,
            text: text.to_string(),
            source: source.to_string(),
            origin,
        })
    }

    fn switch_view(&mut self, view: ViewId) -> SinkResult<()> {
        self.invoke(SinkCall::SwitchView(view))
    }

    fn set_voice_transmitting(&mut self, transmitting: bool) -> SinkResult<()> {
        self.invoke(SinkCall::Voice(transmitting))
    }

    fn close_modal(&mut self) -> SinkResult<()> {
        self.invoke(SinkCall::CloseModal)
    }

    fn clear_all(&mut self) -> SinkResult<()> {
        self.invoke(SinkCall::ClearAll)
    }

    fn announce(&mut self, banner: Banner, text: &str) -> SinkResult<()> {
        self.invoke(SinkCall::Announce(banner, text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let mut sink = RecordingSink::new();
        sink.switch_view(ViewId::Voice).unwrap();
        sink.set_voice_transmitting(true).unwrap();
        assert_eq!(sink.calls(), &[SinkCall::SwitchView(ViewId::Voice), SinkCall::Voice(true)]);
        assert_eq!(sink.take_calls().len(), 2);
        assert!(sink.calls().is_empty());
    }

    #[test]
    fn test_failing_call_is_not_recorded() {
        let mut sink = RecordingSink::failing_on(2);
        sink.close_modal().unwrap();
        assert!(sink.clear_all().is_err());
        sink.close_modal().unwrap();
        assert_eq!(sink.calls(), &[SinkCall::CloseModal, SinkCall::CloseModal]);
        assert_eq!(sink.invocations(), 3);
    }
}
