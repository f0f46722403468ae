use crate::player::PlayerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const CONFIG_DIR: &str = "roamen-demo";

/// Persisted demo preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    pub autostart: bool,
    pub autostart_delay_ms: u64,
    pub loop_pause_ms: u64,
    pub manual_restart_delay_ms: u64,
    pub capture_window_ms: u64,
    pub show_event_log: bool,
    pub show_shortcuts: bool,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            autostart: true,
            autostart_delay_ms: 1000,
            loop_pause_ms: 7000,
            manual_restart_delay_ms: 500,
            capture_window_ms: 57_000,
            show_event_log: true,
            show_shortcuts: false,
        }
    }
}

impl DemoSettings {
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(CONFIG_DIR))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// imgui layout file, kept next to the settings
    pub fn layout_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("layout.ini"))
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                warn!("Ignoring corrupt settings in {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create {}: {}", parent.display(), e);
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(&path, json) {
                    warn!("Failed to save settings to {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("Failed to serialize settings: {}", e),
        }
    }

    pub fn autostart_delay(&self) -> Duration {
        Duration::from_millis(self.autostart_delay_ms)
    }

    pub fn manual_restart_delay(&self) -> Duration {
        Duration::from_millis(self.manual_restart_delay_ms)
    }

    pub fn capture_window(&self) -> Duration {
        Duration::from_millis(self.capture_window_ms)
    }

    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            looping: true,
            loop_pause: Duration::from_millis(self.loop_pause_ms),
        }
    }
}
