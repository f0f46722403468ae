use crate::core::ViewId;
use imgui::{Condition, Ui};
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Keyboard shortcut manager
pub struct ShortcutManager {
    shortcuts: Vec<Shortcut>,
}

#[derive(Clone)]
pub struct Shortcut {
    pub key: PhysicalKey,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub action: ShortcutAction,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShortcutAction {
    StartDemo,
    StopDemo,
    RestartDemo,
    ShowView(ViewId),
    ExportJournal,
    ToggleEventLog,
    ShowHelp,
    Quit,
}

impl ShortcutManager {
    pub fn new() -> Self {
        let mut manager = Self {
            shortcuts: Vec::new(),
        };
        manager.register_defaults();
        manager
    }

    fn register_defaults(&mut self) {
        // Demo control
        self.register(KeyCode::Space, true, ShortcutAction::StartDemo, "Start Demo");
        self.register(KeyCode::Escape, false, ShortcutAction::StopDemo, "Stop Demo");
        self.register(KeyCode::KeyD, true, ShortcutAction::RestartDemo, "Reset & Restart Demo");

        // Views
        let view_keys = [KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3, KeyCode::Digit4];
        for (key, view) in view_keys.into_iter().zip(ViewId::ALL) {
            self.register(key, true, ShortcutAction::ShowView(view), &format!("Show {}", view.title()));
        }
        self.register(KeyCode::KeyL, true, ShortcutAction::ToggleEventLog, "Toggle Event Log");

        // Other
        self.register(KeyCode::KeyE, true, ShortcutAction::ExportJournal, "Export Journal");
        self.register(KeyCode::F1, false, ShortcutAction::ShowHelp, "Keyboard Shortcuts");
        self.register(KeyCode::KeyQ, true, ShortcutAction::Quit, "Quit");
    }

    fn register(&mut self, key: KeyCode, ctrl: bool, action: ShortcutAction, description: &str) {
        self.shortcuts.push(Shortcut {
            key: PhysicalKey::Code(key),
            ctrl,
            shift: false,
            alt: false,
            action,
            description: description.to_string(),
        });
    }

    /// Process a key event and return the matching action (if any)
    pub fn process_event(&self, event: &KeyEvent, ctrl: bool, shift: bool, alt: bool) -> Option<ShortcutAction> {
        if event.state != ElementState::Pressed || event.repeat {
            return None;
        }
        self.lookup(event.physical_key, ctrl, shift, alt)
    }

    pub fn lookup(&self, key: PhysicalKey, ctrl: bool, shift: bool, alt: bool) -> Option<ShortcutAction> {
        self.shortcuts
            .iter()
            .find(|s| s.key == key && s.ctrl == ctrl && s.shift == shift && s.alt == alt)
            .map(|s| s.action)
    }

    /// Render a shortcuts help window
    pub fn render_help(&self, ui: &Ui, is_open: &mut bool) {
        ui.window("Keyboard Shortcuts")
            .size([320.0, 320.0], Condition::FirstUseEver)
            .position([500.0, 200.0], Condition::FirstUseEver)
            .opened(is_open)
            .build(|| {
                let mut current_category = "";

                for shortcut in &self.shortcuts {
                    let category = match shortcut.action {
                        ShortcutAction::StartDemo | ShortcutAction::StopDemo | ShortcutAction::RestartDemo => "Demo",
                        ShortcutAction::ShowView(_) | ShortcutAction::ToggleEventLog => "View",
                        ShortcutAction::ExportJournal | ShortcutAction::ShowHelp | ShortcutAction::Quit => "General",
                    };

                    if category != current_category {
                        if !current_category.is_empty() {
                            ui.separator();
                        }
                        ui.text(category);
                        current_category = category;
                    }

                    ui.text(format!("  {:12} - {}", shortcut_label(shortcut), shortcut.description));
                }
            });
    }
}

fn shortcut_label(shortcut: &Shortcut) -> String {
    let mut label = String::new();
    if shortcut.ctrl {
        label.push_str("Ctrl+");
    }
    if shortcut.shift {
        label.push_str("Shift+");
    }
    if shortcut.alt {
        label.push_str("Alt+");
    }
    label.push_str(&key_to_string(shortcut.key));
    label
}

fn key_to_string(key: PhysicalKey) -> String {
    match key {
        PhysicalKey::Code(code) => match code {
            KeyCode::Space => "Space".to_string(),
            KeyCode::Escape => "Esc".to_string(),
            KeyCode::F1 => "F1".to_string(),
            KeyCode::Digit1 => "1".to_string(),
            KeyCode::Digit2 => "2".to_string(),
            KeyCode::Digit3 => "3".to_string(),
            KeyCode::Digit4 => "4".to_string(),
            KeyCode::KeyD => "D".to_string(),
            KeyCode::KeyE => "E".to_string(),
            KeyCode::KeyL => "L".to_string(),
            KeyCode::KeyQ => "Q".to_string(),
            _ => format!("{:?}", code),
        },
        _ => "?".to_string(),
    }
}

impl Default for ShortcutManager {
    fn default() -> Self {
        Self::new()
    }
}

/// About dialog
pub struct AboutDialog {
    show: bool,
}

impl AboutDialog {
    pub fn new() -> Self {
        Self { show: false }
    }

    pub fn show(&mut self) {
        self.show = true;
    }

    pub fn render(&mut self, ui: &Ui) {
        if !self.show {
            return;
        }

        ui.window("About RoamEN Demo")
            .size([400.0, 280.0], Condition::FirstUseEver)
            .build(|| {
                ui.text("RoamEN Demo");
                ui.text_colored([0.7, 0.7, 0.7, 1.0], concat!("Version ", env!("CARGO_PKG_VERSION")));
                ui.separator();
                ui.text("Scripted walkthrough of the RoamEN");
                ui.text("emergency mesh communication console.");
                ui.separator();
                ui.text("The demo shows:");
                ui.bullet_text("Text messaging between mesh nodes");
                ui.bullet_text("Standard, urgent and emergency alerts");
                ui.bullet_text("Push-to-talk voice");
                ui.bullet_text("Mesh network topology");
                ui.separator();
                ui.text("Built with Rust, ImGui, and Glow");
                ui.separator();
                if ui.button("Close") {
                    self.show = false;
                }
            });
    }
}

impl Default for AboutDialog {
    fn default() -> Self {
        Self::new()
    }
}
