//! # kvm-hid-core
//!
//! HID input encoding and sequencing for KVM-HID.
//!
//! A controller (browser or desktop app) describes *what* the user wants to
//! happen on the target machine: press a key, move the mouse, paste a block of
//! text, fire Ctrl+Alt+Delete.  This crate turns those intents into the exact
//! fixed-size USB HID report bytes a keyboard or mouse would send, in the
//! right order and with the right timing.
//!
//! The crate performs no OS I/O.  Reports leave through the
//! [`transport::ReportTransport`] trait, which the caller implements (a Linux
//! USB gadget device file, a serial bridge, a test recorder, ...).
//!
//! # Architecture overview (for beginners)
//!
//! ```text
//! intent ──► session ──► sequencer / typist / jiggler ──► encoder ──► bytes ──► transport
//! ```
//!
//! - **`keymap`** – Static tables: physical key identifiers (USB HID Usage IDs
//!   on page 0x07) and per-layout character tables (`en-US`, `de-DE`, `fr-FR`).
//!
//! - **`report`** – The two report encoders.  The keyboard encoder tracks held
//!   modifiers and up to six held keys and produces the 8-byte boot keyboard
//!   report.  The mouse encoder latches button state and produces 4-byte
//!   relative or 6-byte absolute reports.
//!
//! - **`sequencer`** – Drives the keyboard encoder through scripted
//!   press/hold/release sequences for multi-key shortcuts.
//!
//! - **`paste`** – Types arbitrary text one character at a time using the
//!   layout tables, with progress reporting and cooperative cancellation.
//!
//! - **`jiggler`** – Nudges the pointer back and forth when no real motion has
//!   been seen for a while, so the target does not lock or sleep.
//!
//! - **`session`** – One explicitly owned [`session::InputSession`] per
//!   controller connection ties the pieces above to a transport.

pub mod config;
pub mod jiggler;
pub mod keymap;
pub mod paste;
pub mod report;
pub mod sequencer;
pub mod session;
pub mod timer;
pub mod transport;

// Re-export the most-used types at the crate root so callers can write
// `kvm_hid_core::InputSession` instead of `kvm_hid_core::session::InputSession`.
pub use config::{ConfigError, SessionConfig};
pub use jiggler::JigglerMode;
pub use keymap::{HidKeyCode, KeyStroke, KeymapError, LayoutId};
pub use paste::{CancelHandle, PasteError, PasteJob, PasteOutcome, PasteProgress, PasteStep};
pub use report::{
    keyboard::{KeyboardReport, KeyboardState, ModifierSet},
    mouse::{MouseButton, MouseEncoder, MouseMode, MouseReport},
};
pub use sequencer::{parse_shortcut, SequenceError};
pub use session::InputSession;
pub use transport::{HidReport, ReportTransport, TransportError};
