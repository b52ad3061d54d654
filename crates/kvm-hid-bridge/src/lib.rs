//! kvm-hid-bridge library crate.
//!
//! Runs on the board that is plugged into the target machine as a USB HID
//! gadget.  A controller process (a browser relay, a desktop app) pipes input
//! intents into the bridge as JSON lines; the bridge turns them into HID
//! reports with `kvm-hid-core` and writes them to the gadget device files.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Controller (JSON lines on stdin / stdout)
//!         ↕
//! [kvm-hid-bridge]
//!   ├── domain/           Pure types: intents, events, BridgeConfig
//!   ├── application/      Dispatcher: intent → InputSession call
//!   └── infrastructure/
//!         ├── stdio/      JSON-lines reader and writer
//!         ├── gadget/     /dev/hidgN file transport
//!         └── logging_transport/  dry-run transport
//!         ↕
//! Target machine (USB HID keyboard + mouse)
//! ```
//!
//! # Layer rules
//!
//! - `domain` never touches a device; its only I/O is reading the config file.
//! - `application` depends on `domain` and `kvm-hid-core` only.
//! - `infrastructure` owns every file descriptor.

/// Domain layer: intent and event types, configuration (no I/O).
pub mod domain;

/// Application layer: applies intents to the input session.
pub mod application;

/// Infrastructure layer: stdio, device files, dry-run transport.
pub mod infrastructure;
