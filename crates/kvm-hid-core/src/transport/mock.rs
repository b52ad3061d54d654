//! In-memory recording transport.
//!
//! # Why a recording transport?
//!
//! Real transports write to device files that only exist on a board running
//! in USB gadget mode.  `RecordingTransport` replaces the device with a
//! `Mutex<Vec<HidReport>>` so tests can assert exactly which reports were
//! sent and in what order.  The bridge's `--dry-run` mode wraps one too.
//!
//! # Injecting failures
//!
//! [`RecordingTransport::failing`] fails every call.
//! [`RecordingTransport::fail_after`] accepts `n` reports and fails every call
//! after that, which exercises the "abort, then best-effort reset" paths in
//! the sequencer and paste typist.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{HidReport, ReportTransport, TransportError};
use crate::report::{keyboard::KeyboardReport, mouse::MouseReport};

/// A transport that records every report instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    reports: Mutex<Vec<HidReport>>,
    /// Number of calls that succeed before failures start.  `None` never fails.
    fail_after: Option<usize>,
    calls: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every call fails.
    pub fn failing() -> Self {
        Self::fail_after(0)
    }

    /// A transport that records the first `n` reports and fails afterwards.
    ///
    /// Failed calls are not recorded.
    pub fn fail_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// A snapshot of every report recorded so far, in transmit order.
    pub fn reports(&self) -> Vec<HidReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the keyboard reports, in order.
    pub fn keyboard_reports(&self) -> Vec<KeyboardReport> {
        self.reports()
            .iter()
            .filter_map(|r| r.as_keyboard().copied())
            .collect()
    }

    /// Only the mouse reports, in order.
    pub fn mouse_reports(&self) -> Vec<MouseReport> {
        self.reports()
            .iter()
            .filter_map(|r| r.as_mouse().copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets everything recorded so far.  The failure budget is unchanged.
    pub fn clear(&self) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl ReportTransport for RecordingTransport {
    async fn transmit(&self, report: &HidReport) -> Result<(), TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if call >= limit {
                return Err(TransportError::Rejected("injected failure".to_string()));
            }
        }
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_reports_in_order() {
        // Arrange
        let transport = RecordingTransport::new();
        let first = HidReport::from(KeyboardReport::EMPTY);
        let second = HidReport::from(KeyboardReport::from_bytes([0x02, 0, 0x04, 0, 0, 0, 0, 0]));

        // Act
        transport.transmit(&first).await.unwrap();
        transport.transmit(&second).await.unwrap();

        // Assert
        assert_eq!(transport.reports(), vec![first, second]);
    }

    #[tokio::test]
    async fn test_failing_transport_records_nothing() {
        let transport = RecordingTransport::failing();

        let result = transport.transmit(&HidReport::from(KeyboardReport::EMPTY)).await;

        assert!(matches!(result, Err(TransportError::Rejected(_))));
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn test_fail_after_accepts_exactly_n_reports() {
        let transport = RecordingTransport::fail_after(2);
        let report = HidReport::from(KeyboardReport::EMPTY);

        assert!(transport.transmit(&report).await.is_ok());
        assert!(transport.transmit(&report).await.is_ok());
        assert!(transport.transmit(&report).await.is_err());
        assert!(transport.transmit(&report).await.is_err());

        assert_eq!(transport.len(), 2);
    }
}
