//! JACKInsert - an LV2 send/return insert that wires itself into JACK
//!
//! The plugin copies its stereo input to a pair of send ports, and a pair
//! of return ports to its stereo output.  A background worker connects the
//! send/return ports to an external peer (SooperLooper by default) over a
//! running JACK server, so the peer sits "inside" the host's signal chain.
//!
//! ## Architecture
//!
//! - `plugin` - LV2 descriptor, C entry points and per-instance state
//! - `binder` - pairing rules, the port binder and its worker thread
//! - `routing` - the routing daemon seam and its JACK implementation
//! - `config` - binder configuration (peer port names, retry timing)
//! - `error` - error types

pub mod binder;
pub mod config;
pub mod error;
pub mod plugin;
pub mod routing;

pub use config::BinderConfig;
pub use error::{ConfigError, RoutingError};
pub use plugin::{JackInsert, PortIndex};

/// Initialize logging for the hosting process.
///
/// Hosts load the plugin into their own process, so another component may
/// already have installed a logger; in that case ours is silently skipped.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
