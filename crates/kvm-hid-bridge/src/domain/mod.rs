//! Domain layer for kvm-hid-bridge.
//!
//! - Intent and event types (the JSON "language" between controller and
//!   bridge)
//! - Configuration structures
//!
//! Nothing here touches a device or spawns a task.

pub mod config;
pub mod intent;

pub use config::{BridgeConfig, DeviceConfig};
pub use intent::{BridgeEvent, Intent, ShortcutKeys};
