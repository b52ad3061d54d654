//! Infrastructure layer: everything that touches the operating system.
//!
//! - **`gadget`** – writes reports to the Linux USB gadget device files.
//! - **`logging_transport`** – `--dry-run` transport that logs instead.
//! - **`stdio`** – JSON-lines reader/writer for the controller channel.

pub mod gadget;
pub mod logging_transport;
pub mod stdio;

pub use gadget::GadgetTransport;
pub use logging_transport::LoggingTransport;
pub use stdio::{read_intents, write_events};
