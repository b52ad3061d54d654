//! Session configuration schema.
//!
//! Every tunable of the input session lives here: the default layout, the
//! shortcut timing, paste pacing, mouse mode and screen size, and the jiggler.
//! The schema maps one-to-one onto TOML sections:
//!
//! ```toml
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
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]` and every section is
//! `#[serde(default)]`, so an empty document, a missing section, or a section
//! with only some fields set all deserialize to a usable configuration.
//! Structural checks that serde cannot express live in
//! [`SessionConfig::validate`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keymap::LayoutId;
use crate::report::mouse::{MouseMode, ScreenSize};

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but a value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Everything an [`InputSession`](crate::session::InputSession) needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub keyboard: KeyboardConfig,
    pub shortcut: ShortcutConfig,
    pub paste: PasteConfig,
    pub mouse: MouseConfig,
    pub jiggler: JigglerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KeyboardConfig {
    /// Layout used for paste when the request does not name one.
    #[serde(default)]
    pub layout: LayoutId,
}

/// Timing of scripted shortcuts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShortcutConfig {
    /// Pause after each press and after each release.
    #[serde(default = "default_press_delay_ms")]
    pub press_delay_ms: u64,
    /// Pause with every key of the shortcut held down.
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PasteConfig {
    /// Pause between characters.  Zero types as fast as the transport allows.
    #[serde(default)]
    pub per_char_delay_ms: u64,
    /// Longer pastes are truncated to this many characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MouseConfig {
    #[serde(default)]
    pub mode: MouseMode,
    /// Controller screen width in pixels; absolute coordinates are scaled
    /// from this.
    #[serde(default = "default_screen_width")]
    pub screen_width: u32,
    #[serde(default = "default_screen_height")]
    pub screen_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JigglerConfig {
    /// Start the session with the jiggler enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Idle time after which the pointer is nudged.
    #[serde(default = "default_idle_threshold_ms")]
    pub idle_threshold_ms: u64,
    /// Nudge distance on each axis, in relative mouse units.
    #[serde(default = "default_jiggle_delta")]
    pub delta: u8,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_press_delay_ms() -> u64 {
    20
}
fn default_hold_ms() -> u64 {
    50
}
fn default_max_chars() -> usize {
    65_536
}
fn default_screen_width() -> u32 {
    1920
}
fn default_screen_height() -> u32 {
    1080
}
fn default_idle_threshold_ms() -> u64 {
    15_000
}
fn default_jiggle_delta() -> u8 {
    10
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        Self {
            press_delay_ms: default_press_delay_ms(),
            hold_ms: default_hold_ms(),
        }
    }
}

impl Default for PasteConfig {
    fn default() -> Self {
        Self {
            per_char_delay_ms: 0,
            max_chars: default_max_chars(),
        }
    }
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self {
            mode: MouseMode::default(),
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
        }
    }
}

impl Default for JigglerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            idle_threshold_ms: default_idle_threshold_ms(),
            delta: default_jiggle_delta(),
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl ShortcutConfig {
    pub fn press_delay(&self) -> Duration {
        Duration::from_millis(self.press_delay_ms)
    }

    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }
}

impl PasteConfig {
    pub fn per_char_delay(&self) -> Duration {
        Duration::from_millis(self.per_char_delay_ms)
    }
}

impl MouseConfig {
    pub fn screen(&self) -> ScreenSize {
        ScreenSize {
            width: self.screen_width,
            height: self.screen_height,
        }
    }
}

impl JigglerConfig {
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_millis(self.idle_threshold_ms)
    }
}

impl SessionConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: SessionConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects values that would make the session misbehave.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jiggler.idle_threshold_ms == 0 {
            return Err(ConfigError::Invalid(
                "jiggler.idle_threshold_ms must be greater than zero".to_string(),
            ));
        }
        if self.jiggler.delta == 0 || self.jiggler.delta > 127 {
            return Err(ConfigError::Invalid(format!(
                "jiggler.delta must be within 1..=127, got {}",
                self.jiggler.delta
            )));
        }
        if self.mouse.screen_width == 0 || self.mouse.screen_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "mouse screen size must be non-zero, got {}x{}",
                self.mouse.screen_width, self.mouse.screen_height
            )));
        }
        if self.paste.max_chars == 0 {
            return Err(ConfigError::Invalid(
                "paste.max_chars must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
