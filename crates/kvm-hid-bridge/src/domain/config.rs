//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is read from a TOML file, then CLI flags are applied on top (see
//! `main.rs`).  A missing file is not an error: every field has a default.
//!
//! ```toml
//! log_level = "info"
//!
//! [keyboard]
//! layout = "en-US"
//!
//! [shortcut]
//! press_delay_ms = 20
//! hold_ms = 50
//!
//! [paste]
//! per_char_delay_ms = 0
//! max_chars = 65536
//!
//! [mouse]
//! mode = "absolute"
//! screen_width = 1920
//! screen_height = 1080
//!
//! [jiggler]
//! enabled = false
//! idle_threshold_ms = 15000
//! delta = 10
//!
//! [devices]
//! keyboard = "/dev/hidg0"
//! mouse_absolute = "/dev/hidg1"
//! mouse_relative = "/dev/hidg2"
//! ```
//!
//! The session sections reuse the `kvm-hid-core` schema types, so the file
//! and the library can never disagree on field names or defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use kvm_hid_core::config::{
    ConfigError, JigglerConfig, KeyboardConfig, MouseConfig, PasteConfig, SessionConfig,
    ShortcutConfig,
};

/// All runtime configuration for the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub keyboard: KeyboardConfig,
    #[serde(default)]
    pub shortcut: ShortcutConfig,
    #[serde(default)]
    pub paste: PasteConfig,
    #[serde(default)]
    pub mouse: MouseConfig,
    #[serde(default)]
    pub jiggler: JigglerConfig,
    #[serde(default)]
    pub devices: DeviceConfig,
}

/// Gadget device files, one per HID function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    #[serde(default = "default_keyboard_device")]
    pub keyboard: PathBuf,
    #[serde(default = "default_mouse_absolute_device")]
    pub mouse_absolute: PathBuf,
    #[serde(default = "default_mouse_relative_device")]
    pub mouse_relative: PathBuf,
}

/// The keys only the bridge reads; the session sections go through
/// [`SessionConfig::from_toml_str`].
#[derive(Deserialize)]
struct BridgeSections {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    devices: DeviceConfig,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_keyboard_device() -> PathBuf {
    PathBuf::from("/dev/hidg0")
}
fn default_mouse_absolute_device() -> PathBuf {
    PathBuf::from("/dev/hidg1")
}
fn default_mouse_relative_device() -> PathBuf {
    PathBuf::from("/dev/hidg2")
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            keyboard: KeyboardConfig::default(),
            shortcut: ShortcutConfig::default(),
            paste: PasteConfig::default(),
            mouse: MouseConfig::default(),
            jiggler: JigglerConfig::default(),
            devices: DeviceConfig::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            keyboard: default_keyboard_device(),
            mouse_absolute: default_mouse_absolute_device(),
            mouse_relative: default_mouse_relative_device(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl BridgeConfig {
    /// Loads the config at `path`, returning defaults if the file does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system errors other than "not
    /// found", [`ConfigError::Parse`] if the TOML is malformed, and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let session = SessionConfig::from_toml_str(content)?;
        let BridgeSections { log_level, devices } = toml::from_str(content)?;
        Ok(Self::from_parts(session, log_level, devices))
    }

    fn from_parts(session: SessionConfig, log_level: String, devices: DeviceConfig) -> Self {
        let SessionConfig {
            keyboard,
            shortcut,
            paste,
            mouse,
            jiggler,
        } = session;
        Self {
            log_level,
            keyboard,
            shortcut,
            paste,
            mouse,
            jiggler,
            devices,
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session_config().validate()
    }

    /// The input-session part of this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            keyboard: self.keyboard.clone(),
            shortcut: self.shortcut.clone(),
            paste: self.paste.clone(),
            mouse: self.mouse.clone(),
            jiggler: self.jiggler.clone(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use kvm_hid_core::{LayoutId, MouseMode};

    #[test]
    fn test_default_devices_are_hidg0_to_hidg2() {
        // Arrange / Act
        let cfg = BridgeConfig::default();

        // Assert
        assert_eq!(cfg.devices.keyboard, PathBuf::from("/dev/hidg0"));
        assert_eq!(cfg.devices.mouse_absolute, PathBuf::from("/dev/hidg1"));
        assert_eq!(cfg.devices.mouse_relative, PathBuf::from("/dev/hidg2"));
    }

    #[test]
    fn test_default_log_level_is_info() {
        assert_eq!(BridgeConfig::default().log_level, "info");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("kvm-hid-bridge-does-not-exist.toml");

        let cfg = BridgeConfig::load(&path).unwrap();

        assert_eq!(cfg, BridgeConfig::default());
    }

    #[test]
    fn test_full_document_parses() {
        // Arrange
        let toml_str = r#"
            log_level = "debug"

            [keyboard]
            layout = "fr-FR"

            [mouse]
            mode = "relative"

            [jiggler]
            enabled = true
            idle_threshold_ms = 60000

            [devices]
            keyboard = "/tmp/kbd"
        "#;

        // Act
        let cfg = BridgeConfig::from_toml_str(toml_str).unwrap();

        // Assert
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.keyboard.layout, LayoutId::FrFr);
        assert_eq!(cfg.mouse.mode, MouseMode::Relative);
        assert!(cfg.jiggler.enabled);
        assert_eq!(cfg.jiggler.idle_threshold_ms, 60_000);
        assert_eq!(cfg.devices.keyboard, PathBuf::from("/tmp/kbd"));
        assert_eq!(cfg.devices.mouse_absolute, PathBuf::from("/dev/hidg1"));
    }

    #[test]
    fn test_session_config_carries_every_section() {
        let mut cfg = BridgeConfig::default();
        cfg.shortcut.hold_ms = 75;
        cfg.paste.per_char_delay_ms = 3;

        let session = cfg.session_config();

        assert_eq!(session.shortcut.hold_ms, 75);
        assert_eq!(session.paste.per_char_delay_ms, 3);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = BridgeConfig::from_toml_str("[mouse]\nscreen_width = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_session_sections_are_checked_by_the_core_parser() {
        // Arrange: the same document the core session parser rejects.
        let toml_str = "log_level = \"warn\"\n[jiggler]\ndelta = 200\n";
        let core = SessionConfig::from_toml_str(toml_str);

        // Act
        let result = BridgeConfig::from_toml_str(toml_str);

        // Assert
        assert!(matches!(core, Err(ConfigError::Invalid(_))));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bridge_sections_do_not_disturb_session_sections() {
        let toml_str = "log_level = \"trace\"\n[devices]\nkeyboard = \"/tmp/k\"\n[paste]\nmax_chars = 10\n";

        let cfg = BridgeConfig::from_toml_str(toml_str).unwrap();

        assert_eq!(cfg.session_config(), SessionConfig::from_toml_str(toml_str).unwrap());
        assert_eq!(cfg.log_level, "trace");
        assert_eq!(cfg.devices.keyboard, PathBuf::from("/tmp/k"));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let result = BridgeConfig::from_toml_str("[mouse\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let mut cfg = BridgeConfig::default();
        cfg.devices.mouse_relative = PathBuf::from("/dev/hidg5");

        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored = BridgeConfig::from_toml_str(&toml_str).expect("deserialize");

        assert_eq!(cfg, restored);
    }
}
