//! Routing daemon seam
//!
//! The binder only needs to enumerate ports by name prefix and to connect
//! or disconnect them, so the daemon is reduced to two small traits.  The
//! production implementation talks to JACK; tests use an in-memory mock.

mod jack_daemon;
#[cfg(test)]
pub mod mock;
mod types;

pub use jack_daemon::JackDaemon;
pub use types::*;
