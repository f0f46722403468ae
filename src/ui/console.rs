use crate::core::topology::{self, NodeRole};
use crate::core::{Banner, Direction, Severity, ViewId};
use crate::sink::ConsoleState;
use chrono::{Local, Utc};
use imgui::{Condition, StyleColor, Ui};

const ACCENT: [f32; 4] = [0.2, 0.6, 0.9, 1.0];
const MUTED: [f32; 4] = [0.7, 0.7, 0.7, 1.0];
const TRANSMIT: [f32; 4] = [0.9, 0.25, 0.25, 1.0];

/// Operator input on the console. These go straight to the sink and never
/// touch the player's timers.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleAction {
    ShowView(ViewId),
    SendMessage(String),
    RaiseAlert(Severity, String),
    SetTransmitting(bool),
    CloseModal,
}

pub fn severity_color(severity: Severity) -> [f32; 4] {
    match severity {
        Severity::Standard => [0.3, 0.6, 0.9, 1.0],
        Severity::Urgent => [0.95, 0.6, 0.1, 1.0],
        Severity::Emergency => [0.95, 0.2, 0.2, 1.0],
    }
}

/// Navigation label; the alerts button carries the badge
pub fn nav_label(view: ViewId, badge: usize) -> String {
    if view == ViewId::Alerts && badge > 0 {
        format!("{} ({})", view.title(), badge)
    } else {
        view.title().to_string()
    }
}

/// The RoamEN console: navigation bar, the active view, and the alert modal
pub struct ConsoleWindow {
    message_input: String,
    alert_input: String,
    ptt_held: bool,
}

impl ConsoleWindow {
    pub fn new() -> Self {
        Self {
            message_input: String::new(),
            alert_input: "Need assistance at my location".to_string(),
            ptt_held: false,
        }
    }

    pub fn render(&mut self, ui: &Ui, console: &ConsoleState) -> Vec<ConsoleAction> {
        let mut actions = Vec::new();

        ui.window("RoamEN Console")
            .size([720.0, 560.0], Condition::FirstUseEver)
            .position([20.0, 40.0], Condition::FirstUseEver)
            .build(|| {
                self.render_banner(ui, console);
                self.render_nav(ui, console, &mut actions);
                ui.separator();

                match console.active_view() {
                    ViewId::Messages => self.render_messages(ui, console, &mut actions),
                    ViewId::Alerts => self.render_alerts(ui, console, &mut actions),
                    ViewId::Voice => self.render_voice(ui, console, &mut actions),
                    ViewId::Network => self.render_network(ui),
                }
            });

        self.render_modal(ui, console, &mut actions);
        actions
    }

    fn render_banner(&self, ui: &Ui, console: &ConsoleState) {
        let Some((banner, text)) = console.banner() else {
            return;
        };
        let color = match banner {
            Banner::Intro => ACCENT,
            Banner::Outro => [0.4, 0.85, 0.5, 1.0],
        };
        ui.text_colored(color, text);
        ui.separator();
    }

    fn render_nav(&self, ui: &Ui, console: &ConsoleState, actions: &mut Vec<ConsoleAction>) {
        for (i, view) in ViewId::ALL.into_iter().enumerate() {
            if i > 0 {
                ui.same_line();
            }
            let _active = (view == console.active_view())
                .then(|| ui.push_style_color(StyleColor::Button, ACCENT));
            if ui.button(nav_label(view, console.badge_count())) {
                actions.push(ConsoleAction::ShowView(view));
            }
        }

        ui.same_line();
        if console.is_transmitting() {
            ui.text_colored(TRANSMIT, "  TRANSMITTING");
        } else {
            ui.text_colored(MUTED, "  Ready");
        }

        if let Some(cue) = console.last_tone() {
            if cue.is_sounding(Utc::now()) {
                ui.same_line();
                ui.text_colored(severity_color(cue.tone.severity), format!("  [{} tone]", cue.tone.name()));
            }
        }
    }

    fn render_messages(&mut self, ui: &Ui, console: &ConsoleState, actions: &mut Vec<ConsoleAction>) {
        let list_height = ui.content_region_avail()[1] - 35.0;
        ui.child_window("message_list")
            .size([0.0, list_height])
            .border(true)
            .build(|| {
                if console.messages().is_empty() {
                    ui.text_colored(MUTED, "No messages yet");
                }
                for message in console.messages() {
                    let color = match message.direction {
                        Direction::Sent => ACCENT,
                        Direction::Received => [0.5, 0.8, 0.5, 1.0],
                    };
                    let time = message.at.with_timezone(&Local).format("%H:%M:%S");
                    ui.text_colored(color, format!("{}  {}", message.header(), time));
                    ui.text_wrapped(&message.text);
                    ui.spacing();
                }
                if ui.scroll_y() >= ui.scroll_max_y() {
                    ui.set_scroll_here_y_with_ratio(1.0);
                }
            });

        ui.set_next_item_width(ui.content_region_avail()[0] - 60.0);
        let submitted = ui
            .input_text("##message", &mut self.message_input)
            .hint("Type a message")
            .enter_returns_true(true)
            .build();
        ui.same_line();
        if (ui.button("Send") || submitted) && !self.message_input.trim().is_empty() {
            actions.push(ConsoleAction::SendMessage(std::mem::take(&mut self.message_input)));
        }
    }

    fn render_alerts(&mut self, ui: &Ui, console: &ConsoleState, actions: &mut Vec<ConsoleAction>) {
        ui.text("Quick alert:");
        ui.same_line();
        ui.set_next_item_width(260.0);
        ui.input_text("##alert_text", &mut self.alert_input).build();
        for severity in [Severity::Standard, Severity::Urgent, Severity::Emergency] {
            ui.same_line();
            let _color = ui.push_style_color(StyleColor::Button, severity_color(severity));
            if ui.button(severity.to_string()) && !self.alert_input.trim().is_empty() {
                actions.push(ConsoleAction::RaiseAlert(severity, self.alert_input.clone()));
            }
        }
        ui.separator();

        ui.child_window("alert_list").border(true).build(|| {
            if console.alert_count() == 0 {
                ui.text_colored(MUTED, "No active alerts");
            }
            for alert in console.alerts() {
                ui.text_colored(severity_color(alert.severity), alert.title());
                ui.text_wrapped(&alert.text);
                ui.text_colored(
                    MUTED,
                    format!("{}  {}", alert.source_line(), alert.at.with_timezone(&Local).format("%H:%M:%S")),
                );
                ui.separator();
            }
        });
    }

    fn render_voice(&mut self, ui: &Ui, console: &ConsoleState, actions: &mut Vec<ConsoleAction>) {
        ui.text("Channel: Emergency Ops");
        ui.spacing();

        let (label, color) = if console.is_transmitting() {
            ("TRANSMITTING###ptt", TRANSMIT)
        } else {
            ("PUSH TO TALK###ptt", ACCENT)
        };
        let _color = ui.push_style_color(StyleColor::Button, color);
        ui.button_with_size(label, [200.0, 80.0]);

        // Transmits only while the button is held
        let held = ui.is_item_active();
        if held != self.ptt_held {
            self.ptt_held = held;
            actions.push(ConsoleAction::SetTransmitting(held));
        }

        ui.spacing();
        ui.text_colored(MUTED, "Hold to transmit to all nodes in range");
    }

    fn render_network(&self, ui: &Ui) {
        let draw_list = ui.get_window_draw_list();
        let origin = ui.cursor_screen_pos();
        let avail = ui.content_region_avail();
        let size = [avail[0].max(200.0), avail[1].max(200.0)];
        let to_screen = |x: f32, y: f32| [origin[0] + size[0] * x / 100.0, origin[1] + size[1] * y / 100.0];

        draw_list
            .add_rect(origin, [origin[0] + size[0], origin[1] + size[1]], ui.style_color(StyleColor::FrameBg))
            .filled(true)
            .rounding(4.0)
            .build();

        for (from, to) in topology::resolved_links() {
            draw_list
                .add_line(to_screen(from.x, from.y), to_screen(to.x, to.y), [0.5, 0.5, 0.55, 1.0])
                .thickness(2.0)
                .build();
        }

        for node in topology::NODES {
            let center = to_screen(node.x, node.y);
            let color = match node.role {
                NodeRole::Local => ACCENT,
                NodeRole::Peer => [0.4, 0.75, 0.45, 1.0],
            };
            draw_list.add_circle(center, 14.0, color).filled(true).build();
            let label = format!("{} #{}", node.label, node.id);
            let width = ui.calc_text_size(&label)[0];
            draw_list.add_text([center[0] - width / 2.0, center[1] + 18.0], [0.9, 0.9, 0.9, 1.0], &label);
        }

        ui.dummy(size);
    }

    fn render_modal(&self, ui: &Ui, console: &ConsoleState, actions: &mut Vec<ConsoleAction>) {
        let Some(alert) = console.modal() else {
            return;
        };
        let display = ui.io().display_size;

        ui.window("Emergency Alert")
            .position([display[0] / 2.0, display[1] / 2.0], Condition::Always)
            .position_pivot([0.5, 0.5])
            .size([420.0, 0.0], Condition::Always)
            .collapsible(false)
            .resizable(false)
            .focus_on_appearing(true)
            .build(|| {
                ui.text_colored(severity_color(alert.severity), alert.title());
                ui.separator();
                ui.text_wrapped(&alert.text);
                ui.text_colored(MUTED, alert.source_line());
                ui.spacing();
                if ui.button("Close") {
                    actions.push(ConsoleAction::CloseModal);
                }
            });
    }
}

impl Default for ConsoleWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Scrolling view of the console journal
pub fn render_event_log(ui: &Ui, console: &ConsoleState, is_open: &mut bool) {
    ui.window("Event Log")
        .size([520.0, 260.0], Condition::FirstUseEver)
        .position([760.0, 40.0], Condition::FirstUseEver)
        .opened(is_open)
        .build(|| {
            ui.text_colored(MUTED, format!("{} events", console.journal_len()));
            ui.separator();
            ui.child_window("journal").build(|| {
                for entry in console.journal() {
                    ui.text(format!(
                        "{}  {:<11} {}",
                        entry.at.with_timezone(&Local).format("%H:%M:%S%.3f"),
                        entry.event.name(),
                        entry.event.detail()
                    ));
                }
                if ui.scroll_y() >= ui.scroll_max_y() {
                    ui.set_scroll_here_y_with_ratio(1.0);
                }
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_label_badge() {
        assert_eq!(nav_label(ViewId::Alerts, 0), "Alerts");
        assert_eq!(nav_label(ViewId::Alerts, 3), "Alerts (3)");
        assert_eq!(nav_label(ViewId::Messages, 3), "Messages");
    }

    #[test]
    fn test_severity_colors_are_distinct() {
        let standard = severity_color(Severity::Standard);
        let urgent = severity_color(Severity::Urgent);
        let emergency = severity_color(Severity::Emergency);
        assert_ne!(standard, urgent);
        assert_ne!(urgent, emergency);
        assert_ne!(standard, emergency);
    }
}
