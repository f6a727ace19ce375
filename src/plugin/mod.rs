//! The LV2 plugin itself.
//!
//! - `ports` - fixed port layout and host buffer bookkeeping
//! - `instance` - per-instance state, the passthrough copy and lifecycle
//! - `descriptor` - the C ABI surface handed to hosts

pub mod descriptor;
pub mod instance;
pub mod ports;

pub use instance::JackInsert;
pub use ports::{PortBuffers, PortIndex};
