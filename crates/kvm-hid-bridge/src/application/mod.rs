//! Application layer for kvm-hid-bridge.
//!
//! Knows *what* each intent means for the input session; the infrastructure
//! layer decides where intents come from and where reports go.

pub mod dispatcher;

pub use dispatcher::{DispatchError, Dispatcher};
