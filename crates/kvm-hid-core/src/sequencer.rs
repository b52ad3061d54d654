//! Scripted multi-key shortcuts (Ctrl+Alt+Delete, Win+Tab, ...).
//!
//! A shortcut of N keys becomes 2N+1 keyboard reports:
//!
//! ```text
//! press k1   ─ press_delay ─  press k2 ─ press_delay ─ ... press kN ─ press_delay ─
//! hold
//! release kN ─ press_delay ─  ...  release k1 ─ press_delay ─
//! reset (all zeros)
//! ```
//!
//! Each report is awaited before the next step.  If the transport fails, the
//! remaining steps are skipped, a reset report is attempted on a best-effort
//! basis so the target is not left with keys held, and the original error is
//! returned.  A failure of the final reset itself is returned as is, without
//! a second reset.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ShortcutConfig;
use crate::keymap::{HidKeyCode, KeymapError};
use crate::report::keyboard::{KeyboardReport, KeyboardState};
use crate::transport::{HidReport, ReportTransport, TransportError};

/// Error type for shortcut sequencing.
#[derive(Debug, Error)]
pub enum SequenceError {
    /// A report could not be sent.  The remaining steps were abandoned.
    #[error("shortcut aborted: {0}")]
    Transport(#[from] TransportError),
}

/// Timing of a scripted shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Pause after each press and after each release.
    pub press_delay: Duration,
    /// Pause with all keys held.
    pub hold: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self::from(&ShortcutConfig::default())
    }
}

impl From<&ShortcutConfig> for SequencerConfig {
    fn from(cfg: &ShortcutConfig) -> Self {
        Self {
            press_delay: cfg.press_delay(),
            hold: cfg.hold(),
        }
    }
}

/// Plays shortcuts through a keyboard state and a transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortcutSequencer {
    config: SequencerConfig,
}

impl ShortcutSequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> SequencerConfig {
        self.config
    }

    /// Presses `keys` in order, holds, releases them in reverse order, then
    /// sends a reset.
    ///
    /// An empty `keys` only sends the reset.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceError::Transport`] with the first transport failure.
    /// The keyboard state is reset in that case.
    pub async fn send_shortcut(
        &self,
        keyboard: &mut KeyboardState,
        transport: &dyn ReportTransport,
        keys: &[HidKeyCode],
    ) -> Result<(), SequenceError> {
        debug!(?keys, "sending shortcut");
        if let Err(e) = self.press_and_release(keyboard, transport, keys).await {
            release_best_effort(keyboard, transport).await;
            return Err(e.into());
        }

        // A failed final reset is not retried: the state is already clear.
        let report = keyboard.reset();
        transport.transmit(&HidReport::Keyboard(report)).await?;
        Ok(())
    }

    async fn press_and_release(
        &self,
        keyboard: &mut KeyboardState,
        transport: &dyn ReportTransport,
        keys: &[HidKeyCode],
    ) -> Result<(), TransportError> {
        for &key in keys {
            let report = keyboard.key_down(key);
            transport.transmit(&HidReport::Keyboard(report)).await?;
            tokio::time::sleep(self.config.press_delay).await;
        }

        if !keys.is_empty() {
            tokio::time::sleep(self.config.hold).await;
        }

        for &key in keys.iter().rev() {
            let report = keyboard.key_up(key);
            transport.transmit(&HidReport::Keyboard(report)).await?;
            tokio::time::sleep(self.config.press_delay).await;
        }
        Ok(())
    }
}

/// Clears `keyboard` and tries to send the empty report.  Failures are logged.
pub(crate) async fn release_best_effort(keyboard: &mut KeyboardState, transport: &dyn ReportTransport) {
    keyboard.reset();
    if let Err(e) = transport
        .transmit(&HidReport::Keyboard(KeyboardReport::EMPTY))
        .await
    {
        warn!("best-effort keyboard release failed: {e}");
    }
}

// ── Shortcut parsing ──────────────────────────────────────────────────────────

/// Parses a `+`-separated shortcut such as `"Ctrl+Alt+Delete"`.
///
/// Each part is, in order of preference:
/// - a modifier alias (`Ctrl`, `Control`, `Shift`, `Alt`, `Option`, `Meta`,
///   `Win`, `Cmd`, `Command`, `Super`), case-insensitive, meaning the left
///   modifier;
/// - a single ASCII letter or digit (`a` → `KeyA`, `7` → `Digit7`);
/// - anything [`HidKeyCode::from_str`] accepts (`Tab`, `F4`, `ArrowLeft`, ...).
///
/// # Errors
///
/// Returns [`KeymapError::UnknownKey`] for the first part that names no key,
/// including an empty part (`"Ctrl++A"`).
pub fn parse_shortcut(s: &str) -> Result<Vec<HidKeyCode>, KeymapError> {
    s.split('+').map(|part| parse_part(part.trim())).collect()
}

fn parse_part(part: &str) -> Result<HidKeyCode, KeymapError> {
    let modifier = match part.to_ascii_lowercase().as_str() {
        "ctrl" | "control" => Some(HidKeyCode::ControlLeft),
        "shift" => Some(HidKeyCode::ShiftLeft),
        "alt" | "option" => Some(HidKeyCode::AltLeft),
        "meta" | "win" | "cmd" | "command" | "super" => Some(HidKeyCode::MetaLeft),
        "del" => Some(HidKeyCode::Delete),
        _ => None,
    };
    if let Some(key) = modifier {
        return Ok(key);
    }

    let mut chars = part.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return HidKeyCode::from_str(&format!("Key{}", c.to_ascii_uppercase()));
        }
        if c.is_ascii_digit() {
            return HidKeyCode::from_str(&format!("Digit{c}"));
        }
    }

    HidKeyCode::from_str(part)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
