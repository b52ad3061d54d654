//! Dry-run transport used by `--dry-run`.
//!
//! Instead of writing to `/dev/hidg*`, every report is logged at `info` and
//! kept in memory.  Handy for trying out a controller on a machine that is
//! not a USB gadget.

use async_trait::async_trait;
use tracing::info;

use kvm_hid_core::transport::mock::RecordingTransport;
use kvm_hid_core::{HidReport, ReportTransport, TransportError};

#[derive(Debug, Default)]
pub struct LoggingTransport {
    recorder: RecordingTransport,
}

impl LoggingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every report seen so far, in transmit order.
    pub fn reports(&self) -> Vec<HidReport> {
        self.recorder.reports()
    }
}

#[async_trait]
impl ReportTransport for LoggingTransport {
    async fn transmit(&self, report: &HidReport) -> Result<(), TransportError> {
        let kind = match report {
            HidReport::Keyboard(_) => "keyboard",
            HidReport::Mouse(_) => "mouse",
        };
        info!(kind, bytes = ?report.as_bytes(), "dry-run report");
        self.recorder.transmit(report).await
    }
}
