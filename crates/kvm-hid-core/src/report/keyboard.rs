//! Keyboard report encoder.
//!
//! # Report layout
//!
//! ```text
//! byte 0   modifier bits   (LCtrl 0x01, LShift 0x02, LAlt 0x04, LMeta 0x08,
//!                           RCtrl 0x10, RShift 0x20, RAlt 0x40, RMeta 0x80)
//! byte 1   reserved, always 0x00
//! byte 2-7 up to six held key usages, oldest first, unused slots 0x00
//! ```
//!
//! # Intentional lossy behaviour
//!
//! A boot keyboard report has room for six keys.  A seventh key pressed while
//! six are already held is dropped silently: the press is not recorded and the
//! report is unchanged.  This mirrors what a physical keyboard does and keeps
//! the state consistent; it is never surfaced as an error to callers.

use thiserror::Error;
use tracing::debug;

use crate::keymap::HidKeyCode;

/// Number of key slots in a boot keyboard report.
pub const MAX_PRESSED_KEYS: usize = 6;

/// Size of a keyboard report in bytes.
pub const KEYBOARD_REPORT_LEN: usize = 8;

/// The modifier byte of a keyboard report.
///
/// Bits follow the HID modifier order; see the module docs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierSet(pub u8);

impl ModifierSet {
    pub const LEFT_CTRL: u8 = 1 << 0;
    pub const LEFT_SHIFT: u8 = 1 << 1;
    pub const LEFT_ALT: u8 = 1 << 2;
    pub const LEFT_META: u8 = 1 << 3;
    pub const RIGHT_CTRL: u8 = 1 << 4;
    pub const RIGHT_SHIFT: u8 = 1 << 5;
    pub const RIGHT_ALT: u8 = 1 << 6;
    pub const RIGHT_META: u8 = 1 << 7;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every bit in `bits` is set.
    pub fn contains(self, bits: u8) -> bool {
        self.0 & bits == bits
    }

    pub fn insert(&mut self, bits: u8) {
        self.0 |= bits;
    }

    pub fn remove(&mut self, bits: u8) {
        self.0 &= !bits;
    }

    /// The modifier keys whose bits are set, in ascending bit order.
    pub fn keys(self) -> impl DoubleEndedIterator<Item = HidKeyCode> {
        (0..8u16)
            .filter(move |&bit| self.0 & (1u8 << bit) != 0)
            .map(|bit| HidKeyCode::from_u16(0xE0 + bit))
    }
}

/// A 7th key was pressed while six keys were already held.
///
/// Recovered locally by [`KeyboardState::key_down`], which drops the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("all 6 key slots are in use; {0} was not pressed")]
pub struct KeySlotExhausted(pub HidKeyCode);

/// An 8-byte boot keyboard report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyboardReport([u8; KEYBOARD_REPORT_LEN]);

impl KeyboardReport {
    /// The report with no modifiers and no keys: "everything released".
    pub const EMPTY: KeyboardReport = KeyboardReport([0; KEYBOARD_REPORT_LEN]);

    pub const fn from_bytes(bytes: [u8; KEYBOARD_REPORT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; KEYBOARD_REPORT_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn modifiers(&self) -> ModifierSet {
        ModifierSet(self.0[0])
    }

    /// The six key slot bytes, including zero padding.
    pub fn key_slots(&self) -> &[u8] {
        &self.0[2..]
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl Default for KeyboardReport {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Held modifiers plus up to six held keys.
///
/// One instance belongs to one input session.  Every mutating method returns
/// the report for the new state; transmitting it is the caller's job.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    modifiers: ModifierSet,
    /// Held non-modifier keys in press order.  Never longer than
    /// [`MAX_PRESSED_KEYS`].
    pressed: Vec<HidKeyCode>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self {
            modifiers: ModifierSet::empty(),
            pressed: Vec::with_capacity(MAX_PRESSED_KEYS),
        }
    }

    /// Presses `key` and returns the resulting report.
    ///
    /// A seventh simultaneous key is dropped silently (see the module docs).
    /// Pressing a key that is already held, or [`HidKeyCode::Unknown`], leaves
    /// the state unchanged.
    pub fn key_down(&mut self, key: HidKeyCode) -> KeyboardReport {
        match self.try_key_down(key) {
            Ok(report) => report,
            Err(dropped) => {
                debug!("{dropped}");
                self.report()
            }
        }
    }

    /// Like [`key_down`](Self::key_down) but reports a dropped seventh key.
    ///
    /// # Errors
    ///
    /// Returns [`KeySlotExhausted`] if six keys are already held and `key` is
    /// a new non-modifier key.  The state is unchanged in that case.
    pub fn try_key_down(&mut self, key: HidKeyCode) -> Result<KeyboardReport, KeySlotExhausted> {
        if key == HidKeyCode::Unknown {
            return Ok(self.report());
        }
        if let Some(bit) = key.modifier_bit() {
            self.modifiers.insert(bit);
        } else if !self.pressed.contains(&key) {
            if self.pressed.len() >= MAX_PRESSED_KEYS {
                return Err(KeySlotExhausted(key));
            }
            self.pressed.push(key);
        }
        Ok(self.report())
    }

    /// Releases `key` and returns the resulting report.
    ///
    /// Releasing a key that is not held is a no-op.  Remaining keys keep their
    /// relative order.
    pub fn key_up(&mut self, key: HidKeyCode) -> KeyboardReport {
        if let Some(bit) = key.modifier_bit() {
            self.modifiers.remove(bit);
        } else {
            self.pressed.retain(|&held| held != key);
        }
        self.report()
    }

    /// Releases every modifier and key unconditionally.
    ///
    /// Always returns [`KeyboardReport::EMPTY`].
    pub fn reset(&mut self) -> KeyboardReport {
        self.modifiers = ModifierSet::empty();
        self.pressed.clear();
        self.report()
    }

    /// Computes the report for the current state.
    pub fn report(&self) -> KeyboardReport {
        let mut bytes = [0u8; KEYBOARD_REPORT_LEN];
        bytes[0] = self.modifiers.bits();
        for (slot, key) in bytes[2..].iter_mut().zip(&self.pressed) {
            *slot = key.as_report_byte();
        }
        KeyboardReport(bytes)
    }

    pub fn modifiers(&self) -> ModifierSet {
        self.modifiers
    }

    /// Held non-modifier keys, oldest first.
    pub fn pressed_keys(&self) -> &[HidKeyCode] {
        &self.pressed
    }

    /// `true` if nothing is held.
    pub fn is_clear(&self) -> bool {
        self.modifiers.is_empty() && self.pressed.is_empty()
    }
}
