//! Port binding
//!
//! Connects the plugin's send/return ports to an external peer's ports over
//! the routing daemon, from a worker thread so the audio thread never waits
//! on daemon I/O.

pub mod latch;
pub mod manager;
pub mod rules;
pub mod worker;

pub use latch::ConnectionLatch;
pub use manager::{BindMode, BindOutcome, FlowOutcome, PortBinder};
pub use rules::{Flow, PairingRule};
pub use worker::{Backoff, BindingWorker};
