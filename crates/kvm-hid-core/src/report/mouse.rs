//! Mouse report encoder.
//!
//! Two report shapes are supported, matching the two HID mouse interfaces a
//! KVM gadget usually exposes:
//!
//! ```text
//! relative (4 bytes)   [buttons, dx:i8, dy:i8, wheel:i8]
//! absolute (6 bytes)   [buttons, x_lo, x_hi, y_lo, y_hi, wheel:i8]
//! ```
//!
//! The button byte carries Left in bit 0, Right in bit 1 and Middle in bit 2;
//! the remaining bits are always zero.
//!
//! # Clamping, not wrapping
//!
//! Relative deltas and wheel steps outside `-127..=127` are clamped.  A large
//! delta therefore moves the pointer less than asked for, instead of flipping
//! direction the way an overflow-wrapped byte would.
//!
//! # Absolute coordinates
//!
//! Absolute reports address a logical `0..=32767` range on both axes.  The
//! encoder is configured with the controller's screen size and scales
//! controller pixels into that range, so `(width - 1, height - 1)` lands on
//! `(32767, 32767)`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Largest logical coordinate on either axis of an absolute report.
pub const ABSOLUTE_MAX: u16 = 32767;

/// Size of a relative mouse report in bytes.
pub const RELATIVE_REPORT_LEN: usize = 4;

/// Size of an absolute mouse report in bytes.
pub const ABSOLUTE_REPORT_LEN: usize = 6;

const AXIS_MIN: i32 = -127;
const AXIS_MAX: i32 = 127;

/// Whether an encoder produces absolute positions or relative deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseMode {
    #[default]
    Absolute,
    Relative,
}

impl fmt::Display for MouseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseMode::Absolute => f.write_str("absolute"),
            MouseMode::Relative => f.write_str("relative"),
        }
    }
}

impl FromStr for MouseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "absolute" | "abs" => Ok(MouseMode::Absolute),
            "relative" | "rel" => Ok(MouseMode::Relative),
            other => Err(format!("unknown mouse mode {other:?} (expected absolute or relative)")),
        }
    }
}

/// One of the three supported mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// The bit this button owns in the report button byte.
    pub fn bit(self) -> u8 {
        match self {
            MouseButton::Left => 0x01,
            MouseButton::Right => 0x02,
            MouseButton::Middle => 0x04,
        }
    }
}

/// Latched button state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseButtons(u8);

impl MouseButtons {
    pub fn press(&mut self, button: MouseButton) {
        self.0 |= button.bit();
    }

    pub fn release(&mut self, button: MouseButton) {
        self.0 &= !button.bit();
    }

    /// Packs the latched buttons into the report button byte.
    pub fn encode(self) -> u8 {
        self.0
    }
}

/// A fixed-size mouse report.  The variant fixes the length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseReport {
    Relative([u8; RELATIVE_REPORT_LEN]),
    Absolute([u8; ABSOLUTE_REPORT_LEN]),
}

impl MouseReport {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            MouseReport::Relative(bytes) => bytes,
            MouseReport::Absolute(bytes) => bytes,
        }
    }

    pub fn mode(&self) -> MouseMode {
        match self {
            MouseReport::Relative(_) => MouseMode::Relative,
            MouseReport::Absolute(_) => MouseMode::Absolute,
        }
    }

    pub fn buttons(&self) -> u8 {
        self.as_bytes()[0]
    }

    /// The signed `(dx, dy)` of a relative report, `None` for absolute ones.
    pub fn relative_delta(&self) -> Option<(i8, i8)> {
        match self {
            MouseReport::Relative(bytes) => Some((bytes[1] as i8, bytes[2] as i8)),
            MouseReport::Absolute(_) => None,
        }
    }

    /// The logical `(x, y)` of an absolute report, `None` for relative ones.
    pub fn absolute_position(&self) -> Option<(u16, u16)> {
        match self {
            MouseReport::Absolute(bytes) => Some((
                u16::from_le_bytes([bytes[1], bytes[2]]),
                u16::from_le_bytes([bytes[3], bytes[4]]),
            )),
            MouseReport::Relative(_) => None,
        }
    }

    pub fn wheel(&self) -> i8 {
        match self {
            MouseReport::Relative(bytes) => bytes[3] as i8,
            MouseReport::Absolute(bytes) => bytes[5] as i8,
        }
    }
}

/// Controller screen size used to scale absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// Encodes button state and per-call motion into mouse reports.
///
/// The mode is fixed at construction.  Buttons latch: a press persists across
/// calls until released.  Absolute encoders also remember the last position
/// they encoded so a button-only report does not warp the pointer to (0, 0).
#[derive(Debug, Clone)]
pub struct MouseEncoder {
    mode: MouseMode,
    screen: ScreenSize,
    buttons: MouseButtons,
    last_position: (u16, u16),
}

impl MouseEncoder {
    /// An encoder producing 4-byte relative reports.
    pub fn relative() -> Self {
        Self {
            mode: MouseMode::Relative,
            screen: ScreenSize { width: 1, height: 1 },
            buttons: MouseButtons::default(),
            last_position: (0, 0),
        }
    }

    /// An encoder producing 6-byte absolute reports for a `width` × `height`
    /// controller screen.
    pub fn absolute(width: u32, height: u32) -> Self {
        Self {
            mode: MouseMode::Absolute,
            screen: ScreenSize { width, height },
            ..Self::relative()
        }
    }

    /// Builds an encoder for `mode`.  `screen` is ignored in relative mode.
    pub fn with_mode(mode: MouseMode, screen: ScreenSize) -> Self {
        match mode {
            MouseMode::Relative => Self::relative(),
            MouseMode::Absolute => Self::absolute(screen.width, screen.height),
        }
    }

    pub fn mode(&self) -> MouseMode {
        self.mode
    }

    pub fn buttons(&self) -> MouseButtons {
        self.buttons
    }

    /// Encodes one report.
    ///
    /// In relative mode `a`/`b` are deltas; in absolute mode they are
    /// controller screen coordinates.  `wheel` is a signed step count.
    pub fn build_report(&mut self, a: i32, b: i32, wheel: i32) -> MouseReport {
        let buttons = self.buttons.encode();
        let wheel = clamp_axis(wheel);
        match self.mode {
            MouseMode::Relative => {
                MouseReport::Relative([buttons, clamp_axis(a), clamp_axis(b), wheel])
            }
            MouseMode::Absolute => {
                let x = scale_axis(a, self.screen.width);
                let y = scale_axis(b, self.screen.height);
                self.last_position = (x, y);
                self.absolute_report(wheel)
            }
        }
    }

    /// Latches `button` down and returns a report with no motion.
    pub fn press(&mut self, button: MouseButton) -> MouseReport {
        self.buttons.press(button);
        self.stationary_report()
    }

    /// Releases `button` and returns a report with no motion.
    pub fn release(&mut self, button: MouseButton) -> MouseReport {
        self.buttons.release(button);
        self.stationary_report()
    }

    /// Releases every button and returns a report with no motion.
    pub fn release_all(&mut self) -> MouseReport {
        self.buttons = MouseButtons::default();
        self.stationary_report()
    }

    /// A wheel-only report; the pointer stays where it is.
    pub fn scroll(&mut self, wheel: i32) -> MouseReport {
        match self.mode {
            MouseMode::Relative => self.build_report(0, 0, wheel),
            MouseMode::Absolute => self.absolute_report(clamp_axis(wheel)),
        }
    }

    fn stationary_report(&mut self) -> MouseReport {
        self.scroll(0)
    }

    fn absolute_report(&self, wheel: u8) -> MouseReport {
        let [x_lo, x_hi] = self.last_position.0.to_le_bytes();
        let [y_lo, y_hi] = self.last_position.1.to_le_bytes();
        MouseReport::Absolute([self.buttons.encode(), x_lo, x_hi, y_lo, y_hi, wheel])
    }
}

/// Clamps a signed value into the report's `-127..=127` range and returns its
/// two's-complement byte.
fn clamp_axis(value: i32) -> u8 {
    value.clamp(AXIS_MIN, AXIS_MAX) as i8 as u8
}

/// Scales a controller coordinate in `0..extent` to `0..=ABSOLUTE_MAX`.
fn scale_axis(value: i32, extent: u32) -> u16 {
    if extent <= 1 {
        return 0;
    }
    let max_input = u64::from(extent - 1);
    let clamped = u64::from(value.max(0).unsigned_abs()).min(max_input);
    (clamped * u64::from(ABSOLUTE_MAX) / max_input) as u16
}
