//! HID report encoders.
//!
//! - **`keyboard`** – the 8-byte boot keyboard report and the stateful
//!   [`keyboard::KeyboardState`] accumulator that produces it.
//! - **`mouse`** – 4-byte relative and 6-byte absolute mouse reports produced
//!   by [`mouse::MouseEncoder`].
//!
//! Encoders never perform I/O; callers hand the returned reports to a
//! [`crate::transport::ReportTransport`].

pub mod keyboard;
pub mod mouse;
