//! JSON message types exchanged with the controller.
//!
//! # Message flow
//!
//! ```text
//! Controller → Bridge:  JSON line  →  Intent
//! Bridge → Controller:  BridgeEvent  →  JSON line
//! ```
//!
//! # JSON discriminant
//!
//! Every message is a JSON object with a `"type"` field naming the variant;
//! the other fields sit in the same object:
//!
//! ```json
//! {"type":"KeyDown","code":"KeyA"}
//! {"type":"MouseButton","button":"left","pressed":true}
//! {"type":"Shortcut","keys":"Ctrl+Alt+Delete"}
//! {"type":"Shortcut","keys":["MetaLeft","Tab"]}
//! {"type":"Paste","text":"hello","layout":"de-DE"}
//! ```
//!
//! Key codes are DOM `KeyboardEvent.code` names, so a browser controller can
//! forward `event.code` unchanged.

use serde::{Deserialize, Serialize};

use kvm_hid_core::{parse_shortcut, HidKeyCode, KeymapError, LayoutId, MouseButton, PasteOutcome, PasteProgress};

// ── Controller → Bridge ───────────────────────────────────────────────────────

/// Everything a controller can ask the bridge to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Intent {
    KeyDown {
        /// DOM code or alias, e.g. `"KeyA"`, `"ShiftLeft"`, `"LeftCtrl"`.
        code: String,
    },
    KeyUp {
        code: String,
    },
    /// Releases every key and mouse button.
    ReleaseAll,
    /// Absolute position in controller screen pixels, or a relative delta,
    /// depending on the configured mouse mode.
    MouseMove {
        x: i32,
        y: i32,
    },
    MouseButton {
        button: MouseButton,
        pressed: bool,
    },
    /// Wheel steps; positive scrolls up.
    MouseScroll {
        delta: i32,
    },
    Shortcut {
        keys: ShortcutKeys,
    },
    Paste {
        text: String,
        /// Overrides the session layout for this paste only.
        #[serde(default)]
        layout: Option<LayoutId>,
    },
    CancelPaste,
    Jiggler {
        enabled: bool,
    },
    SetLayout {
        layout: LayoutId,
    },
}

/// A shortcut given either as a list of key names or as a `+`-joined string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShortcutKeys {
    List(Vec<String>),
    Combo(String),
}

impl ShortcutKeys {
    /// Resolves every name to a key, in order.
    ///
    /// List entries accept the same names as the combo form, including the
    /// `Ctrl`/`Win`/`Cmd` aliases.
    ///
    /// # Errors
    ///
    /// Returns [`KeymapError::UnknownKey`] for the first name that is not a
    /// key.
    pub fn resolve(&self) -> Result<Vec<HidKeyCode>, KeymapError> {
        match self {
            ShortcutKeys::Combo(combo) => parse_shortcut(combo),
            ShortcutKeys::List(names) => {
                let mut keys = Vec::with_capacity(names.len());
                for name in names {
                    keys.extend(parse_shortcut(name)?);
                }
                Ok(keys)
            }
        }
    }
}

// ── Bridge → Controller ───────────────────────────────────────────────────────

/// Everything the bridge reports back to the controller.
///
/// ```json
/// {"type":"PasteProgress","processed":3,"total":10,"skipped":false}
/// {"type":"PasteFinished","outcome":{"status":"completed","typed":10,"skipped":0}}
/// {"type":"Error","message":"unknown key name: \"Banana\""}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeEvent {
    PasteProgress(PasteProgress),
    PasteFinished { outcome: PasteOutcome },
    Error { message: String },
}

impl BridgeEvent {
    pub fn error(err: impl std::fmt::Display) -> Self {
        BridgeEvent::Error {
            message: err.to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Intent {
        serde_json::from_str(json).expect("valid intent")
    }

    #[test]
    fn test_key_down_deserializes() {
        // Arrange / Act
        let intent = parse(r#"{"type":"KeyDown","code":"KeyA"}"#);

        // Assert
        assert_eq!(
            intent,
            Intent::KeyDown {
                code: "KeyA".to_string()
            }
        );
    }

    #[test]
    fn test_unit_variants_deserialize() {
        assert_eq!(parse(r#"{"type":"ReleaseAll"}"#), Intent::ReleaseAll);
        assert_eq!(parse(r#"{"type":"CancelPaste"}"#), Intent::CancelPaste);
    }

    #[test]
    fn test_mouse_button_uses_lowercase_names() {
        let intent = parse(r#"{"type":"MouseButton","button":"middle","pressed":false}"#);
        assert_eq!(
            intent,
            Intent::MouseButton {
                button: MouseButton::Middle,
                pressed: false
            }
        );
    }

    #[test]
    fn test_paste_layout_is_optional() {
        let without = parse(r#"{"type":"Paste","text":"hi"}"#);
        let with = parse(r#"{"type":"Paste","text":"hi","layout":"de-DE"}"#);

        assert_eq!(
            without,
            Intent::Paste {
                text: "hi".to_string(),
                layout: None
            }
        );
        assert_eq!(
            with,
            Intent::Paste {
                text: "hi".to_string(),
                layout: Some(LayoutId::DeDe)
            }
        );
    }

    #[test]
    fn test_shortcut_accepts_combo_string() {
        let Intent::Shortcut { keys } = parse(r#"{"type":"Shortcut","keys":"Ctrl+Alt+Delete"}"#)
        else {
            panic!("expected Shortcut");
        };

        assert_eq!(
            keys.resolve().unwrap(),
            vec![HidKeyCode::ControlLeft, HidKeyCode::AltLeft, HidKeyCode::Delete]
        );
    }

    #[test]
    fn test_shortcut_accepts_key_list() {
        let Intent::Shortcut { keys } = parse(r#"{"type":"Shortcut","keys":["Win","Tab"]}"#) else {
            panic!("expected Shortcut");
        };

        assert_eq!(keys.resolve().unwrap(), vec![HidKeyCode::MetaLeft, HidKeyCode::Tab]);
    }

    #[test]
    fn test_shortcut_with_unknown_key_fails_to_resolve() {
        let keys = ShortcutKeys::List(vec!["Ctrl".to_string(), "Nope".to_string()]);
        assert!(keys.resolve().is_err());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = serde_json::from_str::<Intent>(r#"{"type":"Teleport"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_paste_progress_event_is_flat() {
        // Arrange
        let event = BridgeEvent::PasteProgress(PasteProgress {
            processed: 3,
            total: 10,
            skipped: false,
        });

        // Act
        let json = serde_json::to_string(&event).unwrap();

        // Assert
        assert_eq!(
            json,
            r#"{"type":"PasteProgress","processed":3,"total":10,"skipped":false}"#
        );
    }

    #[test]
    fn test_paste_finished_event_tags_outcome() {
        let event = BridgeEvent::PasteFinished {
            outcome: PasteOutcome::Cancelled { processed: 4 },
        };

        let json = serde_json::to_string(&event).unwrap();

        assert_eq!(
            json,
            r#"{"type":"PasteFinished","outcome":{"status":"cancelled","processed":4}}"#
        );
    }
}
