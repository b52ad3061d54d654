//! The "send a report" capability.
//!
//! The core never touches a device.  Whatever sits between the encoders and
//! the target (a Linux USB gadget device file, a serial link to a
//! microcontroller, a test recorder) implements [`ReportTransport`].
//!
//! Transports are shared between the input session and the jiggler's timer
//! task, so they must be `Send + Sync` and take `&self`.  Implementations that
//! hold mutable state (an open file handle, a recording buffer) guard it
//! internally.
//!
//! Failures are surfaced to the caller of the step that failed.  Retrying is a
//! transport concern; the core never retries.

pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::report::{keyboard::KeyboardReport, mouse::MouseReport};

/// A fully encoded report ready for the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HidReport {
    Keyboard(KeyboardReport),
    Mouse(MouseReport),
}

impl HidReport {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            HidReport::Keyboard(report) => report.as_bytes(),
            HidReport::Mouse(report) => report.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Always `false`: every report variant has a fixed non-zero length.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns the keyboard report, if this is one.
    pub fn as_keyboard(&self) -> Option<&KeyboardReport> {
        match self {
            HidReport::Keyboard(report) => Some(report),
            HidReport::Mouse(_) => None,
        }
    }

    /// Returns the mouse report, if this is one.
    pub fn as_mouse(&self) -> Option<&MouseReport> {
        match self {
            HidReport::Mouse(report) => Some(report),
            HidReport::Keyboard(_) => None,
        }
    }
}

impl From<KeyboardReport> for HidReport {
    fn from(report: KeyboardReport) -> Self {
        HidReport::Keyboard(report)
    }
}

impl From<MouseReport> for HidReport {
    fn from(report: MouseReport) -> Self {
        HidReport::Mouse(report)
    }
}

/// Errors a transport can report.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Writing to the named device failed.
    #[error("I/O error on {device}: {source}")]
    Io {
        device: String,
        #[source]
        source: std::io::Error,
    },

    /// The transport has been shut down and accepts no more reports.
    #[error("transport is closed")]
    Closed,

    /// The transport refused the report (wrong length, unsupported kind, ...).
    #[error("report rejected: {0}")]
    Rejected(String),
}

/// Delivers encoded reports to the target.
///
/// `transmit` completes when the report has been handed to the device (or the
/// transport's equivalent).  Callers await each report before encoding the
/// next, so ordering is preserved without any queue inside the core.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportTransport: Send + Sync {
    async fn transmit(&self, report: &HidReport) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::mouse::MouseEncoder;

    #[test]
    fn test_hid_report_lengths_follow_variant() {
        // Arrange
        let keyboard = HidReport::from(KeyboardReport::EMPTY);
        let relative = HidReport::from(MouseEncoder::relative().build_report(1, 1, 0));
        let absolute = HidReport::from(MouseEncoder::absolute(100, 100).build_report(1, 1, 0));

        // Act / Assert
        assert_eq!(keyboard.len(), 8);
        assert_eq!(relative.len(), 4);
        assert_eq!(absolute.len(), 6);
        assert!(!keyboard.is_empty());
    }

    #[test]
    fn test_hid_report_accessors_match_variant() {
        let keyboard = HidReport::from(KeyboardReport::EMPTY);

        assert!(keyboard.as_keyboard().is_some());
        assert!(keyboard.as_mouse().is_none());
    }

    #[test]
    fn test_io_error_message_names_device() {
        let err = TransportError::Io {
            device: "/dev/hidg0".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"),
        };

        assert_eq!(err.to_string(), "I/O error on /dev/hidg0: gone");
    }
}
