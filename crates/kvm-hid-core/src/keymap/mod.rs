//! Key identifier and keyboard layout tables.
//!
//! The canonical key representation is the USB HID Usage ID (page 0x07,
//! Keyboard/Keypad), see [`hid::HidKeyCode`].  Layout tables map a Unicode
//! character to the physical key (plus modifiers) that produces it on a target
//! configured for that layout, see [`layout`].

pub mod hid;
pub mod layout;

use thiserror::Error;

pub use hid::HidKeyCode;
pub use layout::{BuiltinLayouts, KeyStroke, LayoutId, LayoutProvider, LayoutTable};

/// Error type for key name and layout lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeymapError {
    /// A key name was not a DOM `KeyboardEvent.code` value or known alias.
    #[error("unknown key name: {0:?}")]
    UnknownKey(String),

    /// A layout tag did not name a built-in layout.
    #[error("unknown keyboard layout: {0:?}")]
    UnknownLayout(String),

    /// The character cannot be typed on the selected layout.
    ///
    /// The paste typist recovers from this locally by skipping the character.
    #[error("character {0:?} is not mapped in the selected layout")]
    UnmappedCharacter(char),
}
