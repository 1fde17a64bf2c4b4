use crate::domain::models::{MotorMode, Port};
use crate::infrastructure::buwizz::protocol::{APPLICATION_CHAR_UUID, SERVICE_UUID};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "buwizz_controller".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Mode applied to a Power Up port when a session starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortSetup {
    pub port: Port,
    pub mode: MotorMode,
    #[serde(default)]
    pub reference: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,

    // BLE Settings
    #[serde(default = "default_service_uuid")]
    pub ble_service_uuid: String,
    #[serde(default = "default_application_uuid")]
    pub ble_application_char_uuid: String,

    // Telemetry, milliseconds; zero disables notifications
    #[serde(default = "default_refresh_rate_ms")]
    pub data_refresh_rate_ms: i32,

    // Port Settings
    #[serde(default = "default_port_setup")]
    pub port_setup: Vec<PortSetup>,
    #[serde(default)]
    pub pid_status_ports: Vec<Port>,

    // Control Loop Settings
    #[serde(default = "default_control_ticks")]
    pub control_ticks: u32,
    #[serde(default = "default_control_period_ms")]
    pub control_period_ms: u64,
    #[serde(default = "default_false")]
    pub hibernate_on_exit: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_settings: LogSettings::default(),
            ble_service_uuid: default_service_uuid(),
            ble_application_char_uuid: default_application_uuid(),
            data_refresh_rate_ms: default_refresh_rate_ms(),
            port_setup: default_port_setup(),
            pid_status_ports: Vec::new(),
            control_ticks: default_control_ticks(),
            control_period_ms: default_control_period_ms(),
            hibernate_on_exit: false,
        }
    }
}

fn default_service_uuid() -> String {
    SERVICE_UUID.to_string()
}
fn default_application_uuid() -> String {
    APPLICATION_CHAR_UUID.to_string()
}
fn default_refresh_rate_ms() -> i32 {
    100
}
fn default_port_setup() -> Vec<PortSetup> {
    vec![
        PortSetup {
            port: Port::Port3,
            mode: MotorMode::Position,
            reference: 0.0,
        },
        PortSetup {
            port: Port::Port4,
            mode: MotorMode::Position,
            reference: -90.0,
        },
    ]
}
fn default_control_ticks() -> u32 {
    200
}
fn default_control_period_ms() -> u64 {
    50
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();

        Ok(Self {
            settings,
            settings_path,
        })
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("BuWizzController");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.ble_service_uuid, SERVICE_UUID);
        assert_eq!(
            settings.ble_application_char_uuid,
            "50052901-74fb-4481-88b3-9919b1676e93"
        );
        assert_eq!(settings.data_refresh_rate_ms, 100);
        assert_eq!(settings.port_setup, default_port_setup());
        assert!(settings.pid_status_ports.is_empty());
        assert_eq!(settings.log_settings.level, "info");
        assert!(!settings.hibernate_on_exit);
    }

    #[test]
    fn test_port_setup_from_json() {
        let json = r#"{
            "port_setup": [{ "port": "port2", "mode": "speed", "reference": 0.1 }],
            "pid_status_ports": ["port1", "port4"],
            "data_refresh_rate_ms": 0
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(
            settings.port_setup,
            vec![PortSetup {
                port: Port::Port2,
                mode: MotorMode::Speed,
                reference: 0.1,
            }]
        );
        assert_eq!(settings.pid_status_ports, vec![Port::Port1, Port::Port4]);
        assert_eq!(settings.data_refresh_rate_ms, 0);
    }

    #[test]
    fn test_round_trip() {
        let settings = Settings::default();
        let json = serde_json::to_string_pretty(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.port_setup, settings.port_setup);
        assert_eq!(back.control_ticks, settings.control_ticks);
    }
}
