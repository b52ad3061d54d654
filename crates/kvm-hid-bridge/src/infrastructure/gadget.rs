//! Linux USB gadget transport.
//!
//! With the board configured as a composite HID gadget (configfs), the kernel
//! exposes one character device per HID function.  Writing a report's bytes
//! to the device sends it to the host:
//!
//! | Device            | Function        | Report size |
//! |-------------------|-----------------|-------------|
//! | `/dev/hidg0`      | boot keyboard   | 8 bytes     |
//! | `/dev/hidg1`      | absolute mouse  | 6 bytes     |
//! | `/dev/hidg2`      | relative mouse  | 4 bytes     |
//!
//! # Lazy open, reopen after error
//!
//! Device files are opened on first use, not at startup, so the bridge can
//! start before the gadget is bound.  When a write fails (host unplugged,
//! gadget rebound) the handle is dropped and the next report reopens the
//! device.  The failing report itself is not retried.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use kvm_hid_core::{HidReport, MouseReport, ReportTransport, TransportError};

use crate::domain::DeviceConfig;

/// Writes reports to the gadget device files.
#[derive(Debug)]
pub struct GadgetTransport {
    keyboard: DeviceWriter,
    mouse_absolute: DeviceWriter,
    mouse_relative: DeviceWriter,
}

impl GadgetTransport {
    pub fn new(devices: &DeviceConfig) -> Self {
        Self {
            keyboard: DeviceWriter::new(&devices.keyboard),
            mouse_absolute: DeviceWriter::new(&devices.mouse_absolute),
            mouse_relative: DeviceWriter::new(&devices.mouse_relative),
        }
    }

    fn writer_for(&self, report: &HidReport) -> &DeviceWriter {
        match report {
            HidReport::Keyboard(_) => &self.keyboard,
            HidReport::Mouse(MouseReport::Absolute(_)) => &self.mouse_absolute,
            HidReport::Mouse(MouseReport::Relative(_)) => &self.mouse_relative,
        }
    }
}

#[async_trait]
impl ReportTransport for GadgetTransport {
    async fn transmit(&self, report: &HidReport) -> Result<(), TransportError> {
        self.writer_for(report).write_report(report.as_bytes()).await
    }
}

/// One device file, opened on demand.
#[derive(Debug)]
struct DeviceWriter {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl DeviceWriter {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file: Mutex::new(None),
        }
    }

    async fn write_report(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.file.lock().await;

        if guard.is_none() {
            let file = OpenOptions::new()
                .write(true)
                .open(&self.path)
                .await
                .map_err(|e| self.io_error(e))?;
            info!("opened HID device {}", self.path.display());
            *guard = Some(file);
        }

        let Some(file) = guard.as_mut() else {
            return Err(TransportError::Closed);
        };
        let result = match file.write_all(bytes).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                debug!(device = %self.path.display(), ?bytes, "report written");
                Ok(())
            }
            Err(e) => {
                warn!("write to {} failed; will reopen: {e}", self.path.display());
                *guard = None;
                Err(self.io_error(e))
            }
        }
    }

    fn io_error(&self, source: std::io::Error) -> TransportError {
        TransportError::Io {
            device: self.path.display().to_string(),
            source,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use kvm_hid_core::{HidKeyCode, KeyboardState, MouseEncoder};
    use uuid::Uuid;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kvm-hid-{tag}-{}.bin", Uuid::new_v4()))
    }

    fn temp_devices() -> DeviceConfig {
        let devices = DeviceConfig {
            keyboard: temp_path("kbd"),
            mouse_absolute: temp_path("abs"),
            mouse_relative: temp_path("rel"),
        };
        for path in [&devices.keyboard, &devices.mouse_absolute, &devices.mouse_relative] {
            std::fs::write(path, b"").unwrap();
        }
        devices
    }

    fn cleanup(devices: &DeviceConfig) {
        for path in [&devices.keyboard, &devices.mouse_absolute, &devices.mouse_relative] {
            let _ = std::fs::remove_file(path);
        }
    }

    #[tokio::test]
    async fn test_reports_are_routed_to_their_device() {
        // Arrange
        let devices = temp_devices();
        let transport = GadgetTransport::new(&devices);
        let keyboard = KeyboardState::new().key_down(HidKeyCode::KeyA);
        let absolute = MouseEncoder::absolute(1920, 1080).build_report(0, 0, 0);
        let relative = MouseEncoder::relative().build_report(1, -1, 0);

        // Act
        transport.transmit(&keyboard.into()).await.unwrap();
        transport.transmit(&absolute.into()).await.unwrap();
        transport.transmit(&relative.into()).await.unwrap();

        // Assert
        assert_eq!(std::fs::read(&devices.keyboard).unwrap(), vec![0, 0, 4, 0, 0, 0, 0, 0]);
        assert_eq!(std::fs::read(&devices.mouse_absolute).unwrap(), vec![0; 6]);
        assert_eq!(std::fs::read(&devices.mouse_relative).unwrap(), vec![0, 1, 0xFF, 0]);
        cleanup(&devices);
    }

    #[tokio::test]
    async fn test_each_report_is_one_write_in_order() {
        let devices = temp_devices();
        let transport = GadgetTransport::new(&devices);
        let mut kb = KeyboardState::new();

        transport.transmit(&kb.key_down(HidKeyCode::ShiftLeft).into()).await.unwrap();
        transport.transmit(&kb.reset().into()).await.unwrap();

        let written = std::fs::read(&devices.keyboard).unwrap();
        assert_eq!(written.len(), 16);
        assert_eq!(written[0], 0x02);
        assert!(written[8..].iter().all(|&b| b == 0));
        cleanup(&devices);
    }

    #[tokio::test]
    async fn test_missing_device_is_io_error_then_opens_when_present() {
        // Arrange: the keyboard device does not exist yet.
        let mut devices = temp_devices();
        std::fs::remove_file(&devices.keyboard).unwrap();
        devices.keyboard = temp_path("late");
        let transport = GadgetTransport::new(&devices);
        let report = HidReport::Keyboard(KeyboardState::new().reset());

        // Act
        let first = transport.transmit(&report).await;
        std::fs::write(&devices.keyboard, b"").unwrap();
        let second = transport.transmit(&report).await;

        // Assert
        match first {
            Err(TransportError::Io { device, .. }) => {
                assert_eq!(device, devices.keyboard.display().to_string());
            }
            other => panic!("expected Io error, got {other:?}"),
        }
        assert!(second.is_ok());
        cleanup(&devices);
    }
}
