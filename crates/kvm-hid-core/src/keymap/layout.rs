//! Character-to-keystroke tables for the built-in keyboard layouts.
//!
//! The target machine decides which character a physical key produces, based
//! on the layout configured *on the target*.  To type `z` on a target set to
//! German QWERTZ we must press the key a US keyboard calls `Y`.  The tables in
//! this module encode that knowledge for each supported layout.
//!
//! Dead keys (`^`, `´`, `` ` `` on de-DE, `^`, `¨` on fr-FR) are deliberately
//! absent: typing them would combine with the *next* character on the target.
//! Characters missing from a table are reported as
//! [`KeymapError::UnmappedCharacter`] and skipped by the paste typist.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::{HidKeyCode, KeymapError};
use crate::report::keyboard::ModifierSet;

const NONE: u8 = 0;
const SHIFT: u8 = ModifierSet::LEFT_SHIFT;
const ALTGR: u8 = ModifierSet::RIGHT_ALT;

/// A physical key plus the modifiers that must be held while pressing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyStroke {
    pub key: HidKeyCode,
    pub modifiers: ModifierSet,
}

impl KeyStroke {
    pub fn new(key: HidKeyCode, modifiers: ModifierSet) -> Self {
        Self { key, modifiers }
    }

    /// A keystroke with no modifiers.
    pub fn plain(key: HidKeyCode) -> Self {
        Self::new(key, ModifierSet::empty())
    }
}

/// Identifies one of the built-in layouts by its BCP 47 tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LayoutId {
    /// US English QWERTY.
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    /// German QWERTZ (ISO).
    #[serde(rename = "de-DE")]
    DeDe,
    /// French AZERTY (ISO).
    #[serde(rename = "fr-FR")]
    FrFr,
}

impl LayoutId {
    pub const ALL: [LayoutId; 3] = [LayoutId::EnUs, LayoutId::DeDe, LayoutId::FrFr];

    /// The BCP 47 tag, e.g. `"en-US"`.
    pub fn tag(self) -> &'static str {
        match self {
            LayoutId::EnUs => "en-US",
            LayoutId::DeDe => "de-DE",
            LayoutId::FrFr => "fr-FR",
        }
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for LayoutId {
    type Err = KeymapError;

    /// Tags are matched case-insensitively and `_` is accepted in place of `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('_', "-");
        LayoutId::ALL
            .into_iter()
            .find(|id| id.tag().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| KeymapError::UnknownLayout(s.to_string()))
    }
}

/// Resolves characters to keystrokes for a given layout.
///
/// The paste typist depends on this trait rather than on the built-in tables
/// directly, so callers can supply additional layouts.
pub trait LayoutProvider: Send + Sync {
    /// Looks up the keystroke that types `ch` on `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`KeymapError::UnmappedCharacter`] if the layout has no key for `ch`.
    fn resolve(&self, layout: LayoutId, ch: char) -> Result<KeyStroke, KeymapError>;
}

/// The [`LayoutProvider`] backed by the tables in this module.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLayouts;

impl LayoutProvider for BuiltinLayouts {
    fn resolve(&self, layout: LayoutId, ch: char) -> Result<KeyStroke, KeymapError> {
        LayoutTable::builtin(layout)
            .get(ch)
            .ok_or(KeymapError::UnmappedCharacter(ch))
    }
}

/// Read-only mapping from characters to keystrokes for one layout.
#[derive(Debug, Clone)]
pub struct LayoutTable {
    id: LayoutId,
    strokes: HashMap<char, KeyStroke>,
}

impl LayoutTable {
    /// Builds the table for `id`.
    ///
    /// Prefer [`LayoutTable::builtin`], which builds each table once and
    /// shares it.
    pub fn for_layout(id: LayoutId) -> Self {
        let mut strokes = HashMap::new();

        // Characters that behave the same on every supported layout.
        strokes.insert(' ', KeyStroke::plain(HidKeyCode::Space));
        strokes.insert('\n', KeyStroke::plain(HidKeyCode::Enter));
        strokes.insert('\t', KeyStroke::plain(HidKeyCode::Tab));

        let (letter_swaps, symbols): (&[(char, HidKeyCode)], &[(char, HidKeyCode, u8)]) = match id {
            LayoutId::EnUs => (&[], EN_US_SYMBOLS),
            LayoutId::DeDe => (DE_DE_LETTERS, DE_DE_SYMBOLS),
            LayoutId::FrFr => (FR_FR_LETTERS, FR_FR_SYMBOLS),
        };

        for (offset, lower) in ('a'..='z').enumerate() {
            let key = letter_swaps
                .iter()
                .find(|(c, _)| *c == lower)
                .map(|&(_, key)| key)
                .unwrap_or_else(|| HidKeyCode::from_u16(0x04 + offset as u16));
            strokes.insert(lower, KeyStroke::plain(key));
            strokes.insert(
                lower.to_ascii_uppercase(),
                KeyStroke::new(key, ModifierSet(SHIFT)),
            );
        }

        for &(ch, key, modifiers) in symbols {
            strokes.insert(ch, KeyStroke::new(key, ModifierSet(modifiers)));
        }

        Self { id, strokes }
    }

    /// Returns the shared, lazily built table for a built-in layout.
    pub fn builtin(id: LayoutId) -> &'static LayoutTable {
        static EN_US: OnceLock<LayoutTable> = OnceLock::new();
        static DE_DE: OnceLock<LayoutTable> = OnceLock::new();
        static FR_FR: OnceLock<LayoutTable> = OnceLock::new();

        let cell = match id {
            LayoutId::EnUs => &EN_US,
            LayoutId::DeDe => &DE_DE,
            LayoutId::FrFr => &FR_FR,
        };
        cell.get_or_init(|| LayoutTable::for_layout(id))
    }

    pub fn id(&self) -> LayoutId {
        self.id
    }

    /// Looks up the keystroke for `ch`, or `None` if the layout cannot type it.
    pub fn get(&self, ch: char) -> Option<KeyStroke> {
        self.strokes.get(&ch).copied()
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }
}

// ── en-US ─────────────────────────────────────────────────────────────────────

const EN_US_SYMBOLS: &[(char, HidKeyCode, u8)] = &[
    ('1', HidKeyCode::Digit1, NONE),
    ('2', HidKeyCode::Digit2, NONE),
    ('3', HidKeyCode::Digit3, NONE),
    ('4', HidKeyCode::Digit4, NONE),
    ('5', HidKeyCode::Digit5, NONE),
    ('6', HidKeyCode::Digit6, NONE),
    ('7', HidKeyCode::Digit7, NONE),
    ('8', HidKeyCode::Digit8, NONE),
    ('9', HidKeyCode::Digit9, NONE),
    ('0', HidKeyCode::Digit0, NONE),
    ('!', HidKeyCode::Digit1, SHIFT),
    ('@', HidKeyCode::Digit2, SHIFT),
    ('#', HidKeyCode::Digit3, SHIFT),
    ('$', HidKeyCode::Digit4, SHIFT),
    ('%', HidKeyCode::Digit5, SHIFT),
    ('^', HidKeyCode::Digit6, SHIFT),
    ('&', HidKeyCode::Digit7, SHIFT),
    ('*', HidKeyCode::Digit8, SHIFT),
    ('(', HidKeyCode::Digit9, SHIFT),
    (')', HidKeyCode::Digit0, SHIFT),
    ('-', HidKeyCode::Minus, NONE),
    ('_', HidKeyCode::Minus, SHIFT),
    ('=', HidKeyCode::Equal, NONE),
    ('+', HidKeyCode::Equal, SHIFT),
    ('[', HidKeyCode::BracketLeft, NONE),
    ('{', HidKeyCode::BracketLeft, SHIFT),
    (']', HidKeyCode::BracketRight, NONE),
    ('}', HidKeyCode::BracketRight, SHIFT),
    ('\\', HidKeyCode::Backslash, NONE),
    ('|', HidKeyCode::Backslash, SHIFT),
    (';', HidKeyCode::Semicolon, NONE),
    (':', HidKeyCode::Semicolon, SHIFT),
    ('\'', HidKeyCode::Quote, NONE),
    ('"', HidKeyCode::Quote, SHIFT),
    ('`', HidKeyCode::Backquote, NONE),
    ('~', HidKeyCode::Backquote, SHIFT),
    (',', HidKeyCode::Comma, NONE),
    ('<', HidKeyCode::Comma, SHIFT),
    ('.', HidKeyCode::Period, NONE),
    ('>', HidKeyCode::Period, SHIFT),
    ('/', HidKeyCode::Slash, NONE),
    ('?', HidKeyCode::Slash, SHIFT),
];

// ── de-DE ─────────────────────────────────────────────────────────────────────

const DE_DE_LETTERS: &[(char, HidKeyCode)] = &[('y', HidKeyCode::KeyZ), ('z', HidKeyCode::KeyY)];

const DE_DE_SYMBOLS: &[(char, HidKeyCode, u8)] = &[
    ('1', HidKeyCode::Digit1, NONE),
    ('2', HidKeyCode::Digit2, NONE),
    ('3', HidKeyCode::Digit3, NONE),
    ('4', HidKeyCode::Digit4, NONE),
    ('5', HidKeyCode::Digit5, NONE),
    ('6', HidKeyCode::Digit6, NONE),
    ('7', HidKeyCode::Digit7, NONE),
    ('8', HidKeyCode::Digit8, NONE),
    ('9', HidKeyCode::Digit9, NONE),
    ('0', HidKeyCode::Digit0, NONE),
    ('!', HidKeyCode::Digit1, SHIFT),
    ('"', HidKeyCode::Digit2, SHIFT),
    ('§', HidKeyCode::Digit3, SHIFT),
    ('$', HidKeyCode::Digit4, SHIFT),
    ('%', HidKeyCode::Digit5, SHIFT),
    ('&', HidKeyCode::Digit6, SHIFT),
    ('/', HidKeyCode::Digit7, SHIFT),
    ('(', HidKeyCode::Digit8, SHIFT),
    (')', HidKeyCode::Digit9, SHIFT),
    ('=', HidKeyCode::Digit0, SHIFT),
    ('²', HidKeyCode::Digit2, ALTGR),
    ('³', HidKeyCode::Digit3, ALTGR),
    ('{', HidKeyCode::Digit7, ALTGR),
    ('[', HidKeyCode::Digit8, ALTGR),
    (']', HidKeyCode::Digit9, ALTGR),
    ('}', HidKeyCode::Digit0, ALTGR),
    ('ß', HidKeyCode::Minus, NONE),
    ('?', HidKeyCode::Minus, SHIFT),
    ('\\', HidKeyCode::Minus, ALTGR),
    ('ü', HidKeyCode::BracketLeft, NONE),
    ('Ü', HidKeyCode::BracketLeft, SHIFT),
    ('+', HidKeyCode::BracketRight, NONE),
    ('*', HidKeyCode::BracketRight, SHIFT),
    ('~', HidKeyCode::BracketRight, ALTGR),
    ('ö', HidKeyCode::Semicolon, NONE),
    ('Ö', HidKeyCode::Semicolon, SHIFT),
    ('ä', HidKeyCode::Quote, NONE),
    ('Ä', HidKeyCode::Quote, SHIFT),
    ('#', HidKeyCode::NonUsHash, NONE),
    ('\'', HidKeyCode::NonUsHash, SHIFT),
    ('°', HidKeyCode::Backquote, SHIFT),
    (',', HidKeyCode::Comma, NONE),
    (';', HidKeyCode::Comma, SHIFT),
    ('.', HidKeyCode::Period, NONE),
    (':', HidKeyCode::Period, SHIFT),
    ('-', HidKeyCode::Slash, NONE),
    ('_', HidKeyCode::Slash, SHIFT),
    ('<', HidKeyCode::NonUsBackslash, NONE),
    ('>', HidKeyCode::NonUsBackslash, SHIFT),
    ('|', HidKeyCode::NonUsBackslash, ALTGR),
    ('@', HidKeyCode::KeyQ, ALTGR),
    ('€', HidKeyCode::KeyE, ALTGR),
    ('µ', HidKeyCode::KeyM, ALTGR),
];

// ── fr-FR ─────────────────────────────────────────────────────────────────────

const FR_FR_LETTERS: &[(char, HidKeyCode)] = &[
    ('a', HidKeyCode::KeyQ),
    ('q', HidKeyCode::KeyA),
    ('z', HidKeyCode::KeyW),
    ('w', HidKeyCode::KeyZ),
    ('m', HidKeyCode::Semicolon),
];

const FR_FR_SYMBOLS: &[(char, HidKeyCode, u8)] = &[
    ('&', HidKeyCode::Digit1, NONE),
    ('é', HidKeyCode::Digit2, NONE),
    ('"', HidKeyCode::Digit3, NONE),
    ('\'', HidKeyCode::Digit4, NONE),
    ('(', HidKeyCode::Digit5, NONE),
    ('-', HidKeyCode::Digit6, NONE),
    ('è', HidKeyCode::Digit7, NONE),
    ('_', HidKeyCode::Digit8, NONE),
    ('ç', HidKeyCode::Digit9, NONE),
    ('à', HidKeyCode::Digit0, NONE),
    ('1', HidKeyCode::Digit1, SHIFT),
    ('2', HidKeyCode::Digit2, SHIFT),
    ('3', HidKeyCode::Digit3, SHIFT),
    ('4', HidKeyCode::Digit4, SHIFT),
    ('5', HidKeyCode::Digit5, SHIFT),
    ('6', HidKeyCode::Digit6, SHIFT),
    ('7', HidKeyCode::Digit7, SHIFT),
    ('8', HidKeyCode::Digit8, SHIFT),
    ('9', HidKeyCode::Digit9, SHIFT),
    ('0', HidKeyCode::Digit0, SHIFT),
    ('#', HidKeyCode::Digit3, ALTGR),
    ('{', HidKeyCode::Digit4, ALTGR),
    ('[', HidKeyCode::Digit5, ALTGR),
    ('|', HidKeyCode::Digit6, ALTGR),
    ('\\', HidKeyCode::Digit8, ALTGR),
    ('^', HidKeyCode::Digit9, ALTGR),
    ('@', HidKeyCode::Digit0, ALTGR),
    (')', HidKeyCode::Minus, NONE),
    ('°', HidKeyCode::Minus, SHIFT),
    (']', HidKeyCode::Minus, ALTGR),
    ('=', HidKeyCode::Equal, NONE),
    ('+', HidKeyCode::Equal, SHIFT),
    ('}', HidKeyCode::Equal, ALTGR),
    ('$', HidKeyCode::BracketRight, NONE),
    ('£', HidKeyCode::BracketRight, SHIFT),
    ('¤', HidKeyCode::BracketRight, ALTGR),
    ('ù', HidKeyCode::Quote, NONE),
    ('%', HidKeyCode::Quote, SHIFT),
    ('*', HidKeyCode::NonUsHash, NONE),
    ('µ', HidKeyCode::NonUsHash, SHIFT),
    ('²', HidKeyCode::Backquote, NONE),
    (',', HidKeyCode::KeyM, NONE),
    ('?', HidKeyCode::KeyM, SHIFT),
    (';', HidKeyCode::Comma, NONE),
    ('.', HidKeyCode::Comma, SHIFT),
    (':', HidKeyCode::Period, NONE),
    ('/', HidKeyCode::Period, SHIFT),
    ('!', HidKeyCode::Slash, NONE),
    ('§', HidKeyCode::Slash, SHIFT),
    ('<', HidKeyCode::NonUsBackslash, NONE),
    ('>', HidKeyCode::NonUsBackslash, SHIFT),
    ('€', HidKeyCode::KeyE, ALTGR),
];
