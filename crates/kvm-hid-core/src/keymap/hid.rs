//! Keyboard/keypad usage page (0x07) identifiers.
//!
//! [`HidKeyCode`] is the layout-independent key identifier used throughout
//! KVM-HID.  It names a *physical key position*, never a character: the
//! character a key produces on the target depends on the target's keyboard
//! layout and on the modifiers held at the time.
//!
//! Values follow chapter 10 of the USB HID Usage Tables.
//!
//! # Usage IDs in one paragraph (for beginners)
//!
//! USB HID gives every key a number, its *Usage ID*.  A boot keyboard report
//! carries up to six of them (one per held key) plus one byte of modifier bits.
//!
//! | Key          | Usage ID | Modifier bit |
//! |--------------|----------|--------------|
//! | Letter A     | 0x04     | –            |
//! | Enter        | 0x28     | –            |
//! | Tab          | 0x2B     | –            |
//! | Left Ctrl    | 0xE0     | 0x01         |
//! | Left Meta    | 0xE3     | 0x08         |
//!
//! Modifier keys (0xE0–0xE7) never occupy a key slot.  Each one owns a bit in
//! the report's first byte instead, and the bit number equals `usage - 0xE0`.
//!
//! # Naming
//!
//! Variants are named after the DOM `KeyboardEvent.code` values browsers
//! report, so a controller can forward `event.code` unchanged.  The
//! [`FromStr`] implementation also accepts the `LeftShift` / `RightAlt` style
//! names many desktop tools use.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::KeymapError;

/// Declares [`HidKeyCode`] together with its usage lookup and variant names,
/// so the three can never drift apart.
macro_rules! usage_table {
    ($( $(#[$attr:meta])* $key:ident = $usage:literal ),* $(,)?) => {
        /// A key on the keyboard/keypad usage page.
        ///
        /// The discriminant is the key's Usage ID.  [`HidKeyCode::Unknown`]
        /// stands in for anything without a usage.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u16)]
        pub enum HidKeyCode {
            $( $(#[$attr])* $key = $usage, )*
            Unknown = 0x0000,
        }

        impl HidKeyCode {
            /// Every named key, in ascending usage order.  `Unknown` is
            /// excluded.
            pub const ALL: &'static [HidKeyCode] = &[ $( HidKeyCode::$key, )* ];

            /// Looks up the key for a raw Usage ID; unassigned values give
            /// [`HidKeyCode::Unknown`].
            pub fn from_u16(value: u16) -> Self {
                match value {
                    $( $usage => HidKeyCode::$key, )*
                    _ => HidKeyCode::Unknown,
                }
            }

            fn variant_name(self) -> &'static str {
                match self {
                    $( HidKeyCode::$key => stringify!($key), )*
                    HidKeyCode::Unknown => "Unknown",
                }
            }
        }
    };
}

usage_table! {
    // 0x04..=0x1D
    KeyA = 0x04, KeyB = 0x05, KeyC = 0x06, KeyD = 0x07, KeyE = 0x08, KeyF = 0x09,
    KeyG = 0x0A, KeyH = 0x0B, KeyI = 0x0C, KeyJ = 0x0D, KeyK = 0x0E, KeyL = 0x0F,
    KeyM = 0x10, KeyN = 0x11, KeyO = 0x12, KeyP = 0x13, KeyQ = 0x14, KeyR = 0x15,
    KeyS = 0x16, KeyT = 0x17, KeyU = 0x18, KeyV = 0x19, KeyW = 0x1A, KeyX = 0x1B,
    KeyY = 0x1C, KeyZ = 0x1D,

    // Top row digits: 1..9 then 0
    Digit1 = 0x1E, Digit2 = 0x1F, Digit3 = 0x20, Digit4 = 0x21, Digit5 = 0x22,
    Digit6 = 0x23, Digit7 = 0x24, Digit8 = 0x25, Digit9 = 0x26, Digit0 = 0x27,

    Enter = 0x28, Escape = 0x29, Backspace = 0x2A, Tab = 0x2B, Space = 0x2C,
    Minus = 0x2D, Equal = 0x2E, BracketLeft = 0x2F, BracketRight = 0x30,
    Backslash = 0x31,
    /// ISO `#~` key left of Enter (no US equivalent).
    NonUsHash = 0x32,
    Semicolon = 0x33, Quote = 0x34, Backquote = 0x35, Comma = 0x36,
    Period = 0x37, Slash = 0x38, CapsLock = 0x39,

    F1 = 0x3A, F2 = 0x3B, F3 = 0x3C, F4 = 0x3D, F5 = 0x3E, F6 = 0x3F,
    F7 = 0x40, F8 = 0x41, F9 = 0x42, F10 = 0x43, F11 = 0x44, F12 = 0x45,

    PrintScreen = 0x46, ScrollLock = 0x47, Pause = 0x48, Insert = 0x49,
    Home = 0x4A, PageUp = 0x4B, Delete = 0x4C, End = 0x4D, PageDown = 0x4E,
    ArrowRight = 0x4F, ArrowLeft = 0x50, ArrowDown = 0x51, ArrowUp = 0x52,

    NumLock = 0x53, NumpadDivide = 0x54, NumpadMultiply = 0x55,
    NumpadSubtract = 0x56, NumpadAdd = 0x57, NumpadEnter = 0x58,
    Numpad1 = 0x59, Numpad2 = 0x5A, Numpad3 = 0x5B, Numpad4 = 0x5C,
    Numpad5 = 0x5D, Numpad6 = 0x5E, Numpad7 = 0x5F, Numpad8 = 0x60,
    Numpad9 = 0x61, Numpad0 = 0x62, NumpadDecimal = 0x63,

    /// ISO `<>` key right of Left Shift.
    NonUsBackslash = 0x64,
    ContextMenu = 0x65,

    // Modifiers; bit n of the modifier byte is usage 0xE0 + n
    ControlLeft = 0xE0, ShiftLeft = 0xE1, AltLeft = 0xE2, MetaLeft = 0xE3,
    ControlRight = 0xE4, ShiftRight = 0xE5, AltRight = 0xE6, MetaRight = 0xE7,
}

impl HidKeyCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// The byte written into a report key slot.  Every usage named here fits
    /// in one byte.
    pub fn as_report_byte(self) -> u8 {
        (self.as_u16() & 0x00FF) as u8
    }

    pub fn is_modifier(self) -> bool {
        self.modifier_bit().is_some()
    }

    /// The bit this key owns in the modifier byte, or `None` for regular keys.
    pub fn modifier_bit(self) -> Option<u8> {
        match self.as_u16() {
            usage @ 0xE0..=0xE7 => Some(1u8 << (usage - 0xE0)),
            _ => None,
        }
    }

    /// The DOM `KeyboardEvent.code` for this key.
    ///
    /// `None` for [`HidKeyCode::Unknown`] and for the ISO `#~` key, which
    /// browsers report as `Backslash` and so cannot be told apart from the US
    /// backslash key.
    pub fn dom_code(self) -> Option<&'static str> {
        match self {
            HidKeyCode::NonUsBackslash => Some("IntlBackslash"),
            HidKeyCode::NonUsHash | HidKeyCode::Unknown => None,
            key => Some(key.variant_name()),
        }
    }
}

impl fmt::Display for HidKeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dom_code() {
            Some(code) => f.write_str(code),
            None => write!(f, "{self:?}"),
        }
    }
}

impl FromStr for HidKeyCode {
    type Err = KeymapError;

    /// Parses a DOM `KeyboardEvent.code` name (`"KeyA"`, `"Tab"`,
    /// `"ShiftLeft"`) or one of the common aliases (`"LeftShift"`,
    /// `"RightCtrl"`, `"LeftMeta"`, `"AltGr"`, `"Esc"`, `"Return"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(key) = HidKeyCode::ALL
            .iter()
            .copied()
            .find(|key| key.dom_code() == Some(s))
        {
            return Ok(key);
        }

        let key = match s {
            "LeftCtrl" | "LeftControl" => HidKeyCode::ControlLeft,
            "RightCtrl" | "RightControl" => HidKeyCode::ControlRight,
            "LeftShift" => HidKeyCode::ShiftLeft,
            "RightShift" => HidKeyCode::ShiftRight,
            "LeftAlt" => HidKeyCode::AltLeft,
            "RightAlt" | "AltGr" | "AltGraph" => HidKeyCode::AltRight,
            "LeftMeta" | "LeftSuper" | "LeftGui" => HidKeyCode::MetaLeft,
            "RightMeta" | "RightSuper" | "RightGui" => HidKeyCode::MetaRight,
            "Esc" => HidKeyCode::Escape,
            "Return" => HidKeyCode::Enter,
            "NonUsHash" => HidKeyCode::NonUsHash,
            "NonUsBackslash" => HidKeyCode::NonUsBackslash,
            _ => return Err(KeymapError::UnknownKey(s.to_string())),
        };
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spot checks against the published usage table.
    const PUBLISHED_USAGES: &[(u16, HidKeyCode)] = &[
        (0x04, HidKeyCode::KeyA),
        (0x05, HidKeyCode::KeyB),
        (0x1E, HidKeyCode::Digit1),
        (0x27, HidKeyCode::Digit0),
        (0x28, HidKeyCode::Enter),
        (0x29, HidKeyCode::Escape),
        (0x2A, HidKeyCode::Backspace),
        (0x2B, HidKeyCode::Tab),
        (0x2C, HidKeyCode::Space),
        (0x32, HidKeyCode::NonUsHash),
        (0x39, HidKeyCode::CapsLock),
        (0x3A, HidKeyCode::F1),
        (0x45, HidKeyCode::F12),
        (0x4C, HidKeyCode::Delete),
        (0x52, HidKeyCode::ArrowUp),
        (0x62, HidKeyCode::Numpad0),
        (0x64, HidKeyCode::NonUsBackslash),
        (0x65, HidKeyCode::ContextMenu),
        (0xE0, HidKeyCode::ControlLeft),
        (0xE3, HidKeyCode::MetaLeft),
        (0xE7, HidKeyCode::MetaRight),
    ];

    #[test]
    fn test_from_u16_matches_published_usages() {
        for &(usage, expected) in PUBLISHED_USAGES {
            // Arrange / Act
            let key = HidKeyCode::from_u16(usage);

            // Assert
            assert_eq!(key, expected, "usage 0x{usage:02X}");
            assert_eq!(key.as_u16(), usage);
        }
    }

    #[test]
    fn test_unassigned_usages_are_unknown() {
        for usage in [0x00, 0x01, 0x02, 0x03, 0x66, 0xA0, 0xFF] {
            assert_eq!(HidKeyCode::from_u16(usage), HidKeyCode::Unknown, "0x{usage:02X}");
        }
    }

    #[test]
    fn test_all_table_matches_from_u16() {
        for &key in HidKeyCode::ALL {
            assert_eq!(HidKeyCode::from_u16(key.as_u16()), key);
        }
    }

    #[test]
    fn test_modifier_bits_follow_hid_order() {
        // The modifier byte bit for usage 0xE0 + n is 1 << n.
        let expected = [
            (HidKeyCode::ControlLeft, 0x01),
            (HidKeyCode::ShiftLeft, 0x02),
            (HidKeyCode::AltLeft, 0x04),
            (HidKeyCode::MetaLeft, 0x08),
            (HidKeyCode::ControlRight, 0x10),
            (HidKeyCode::ShiftRight, 0x20),
            (HidKeyCode::AltRight, 0x40),
            (HidKeyCode::MetaRight, 0x80),
        ];
        for (key, bit) in expected {
            assert_eq!(key.modifier_bit(), Some(bit), "{key:?}");
            assert!(key.is_modifier());
        }
    }

    #[test]
    fn test_non_modifier_keys_have_no_modifier_bit() {
        for key in [
            HidKeyCode::KeyA,
            HidKeyCode::Enter,
            HidKeyCode::Tab,
            HidKeyCode::Numpad0,
            HidKeyCode::Unknown,
        ] {
            assert_eq!(key.modifier_bit(), None, "{key:?}");
            assert!(!key.is_modifier());
        }
    }

    #[test]
    fn test_report_byte_is_low_byte_of_usage() {
        assert_eq!(HidKeyCode::Tab.as_report_byte(), 0x2B);
        assert_eq!(HidKeyCode::MetaRight.as_report_byte(), 0xE7);
        assert_eq!(HidKeyCode::Unknown.as_report_byte(), 0x00);
    }

    #[test]
    fn test_from_str_accepts_dom_codes() {
        assert_eq!("KeyA".parse::<HidKeyCode>().unwrap(), HidKeyCode::KeyA);
        assert_eq!("Tab".parse::<HidKeyCode>().unwrap(), HidKeyCode::Tab);
        assert_eq!("MetaLeft".parse::<HidKeyCode>().unwrap(), HidKeyCode::MetaLeft);
        assert_eq!(
            "IntlBackslash".parse::<HidKeyCode>().unwrap(),
            HidKeyCode::NonUsBackslash
        );
    }

    #[test]
    fn test_from_str_accepts_left_right_aliases() {
        assert_eq!("LeftShift".parse::<HidKeyCode>().unwrap(), HidKeyCode::ShiftLeft);
        assert_eq!("LeftMeta".parse::<HidKeyCode>().unwrap(), HidKeyCode::MetaLeft);
        assert_eq!("RightCtrl".parse::<HidKeyCode>().unwrap(), HidKeyCode::ControlRight);
        assert_eq!("AltGr".parse::<HidKeyCode>().unwrap(), HidKeyCode::AltRight);
    }

    #[test]
    fn test_from_str_rejects_unknown_names() {
        let err = "Hyper".parse::<HidKeyCode>().unwrap_err();
        assert!(matches!(err, KeymapError::UnknownKey(ref name) if name == "Hyper"));
    }

    #[test]
    fn test_every_named_key_except_iso_hash_has_a_dom_code() {
        for &key in HidKeyCode::ALL {
            let parsed = key.dom_code().map(|code| code.parse::<HidKeyCode>());
            match key {
                HidKeyCode::NonUsHash => assert!(parsed.is_none()),
                _ => assert_eq!(parsed, Some(Ok(key)), "{key:?}"),
            }
        }
    }

    #[test]
    fn test_display_uses_dom_code() {
        assert_eq!(HidKeyCode::ArrowLeft.to_string(), "ArrowLeft");
        assert_eq!(HidKeyCode::NonUsHash.to_string(), "NonUsHash");
    }

    #[test]
    fn test_all_letter_keys_are_contiguous() {
        let letters: Vec<HidKeyCode> = HidKeyCode::ALL
            .iter()
            .copied()
            .filter(|k| k.dom_code().is_some_and(|c| c.starts_with("Key")))
            .collect();
        assert_eq!(letters.len(), 26);
        for (i, letter) in letters.iter().enumerate() {
            assert_eq!(letter.as_u16(), 0x04 + i as u16, "{letter:?}");
        }
    }
}
