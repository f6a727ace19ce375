//! Binder configuration
//!
//! Defaults target SooperLooper's common ports, with our own ports
//! registered under the `JACKInsert` client.  A bundle may ship a
//! `jackinsert.json` next to its manifest to point the binder at a
//! different peer; any field left out keeps its default.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::binder::rules::PairingRule;
use crate::error::ConfigError;

/// File looked up in the LV2 bundle directory.
pub const CONFIG_FILE_NAME: &str = "jackinsert.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    /// Name of the transient JACK client used for (dis)connecting
    pub client_name: String,
    /// Human-readable peer name for diagnostics
    pub peer_label: String,
    /// Ports required on each side before a flow is wired
    pub channels: usize,
    /// Our send ports → peer inputs
    pub inbound: PairingRule,
    /// Peer outputs → our return ports; its last pair decides "bound"
    pub outbound: PairingRule,
    /// First retry delay after a failed attempt
    pub retry_initial_ms: u64,
    /// Upper bound for the doubling retry delay
    pub retry_max_ms: u64,
    /// Undo the connections when the plugin is deactivated
    pub disconnect_on_deactivate: bool,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            client_name: "jack_connect".to_string(),
            peer_label: "Sooperlooper".to_string(),
            channels: 2,
            inbound: PairingRule::sooperlooper_send(),
            outbound: PairingRule::sooperlooper_return(),
            retry_initial_ms: 250,
            retry_max_ms: 5000,
            disconnect_on_deactivate: false,
        }
    }
}

impl BinderConfig {
    /// Load the configuration for a bundle, falling back to defaults.
    ///
    /// A missing file is the normal case.  A broken one is logged and
    /// ignored; the plugin must still instantiate.
    pub fn load(bundle_dir: &Path) -> Self {
        let path = bundle_dir.join(CONFIG_FILE_NAME);
        match Self::read(&path) {
            Ok(Some(config)) => {
                log::info!("Loaded binder configuration from {}", path.display());
                config
            }
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("{}; using default binder configuration", e);
                Self::default()
            }
        }
    }

    /// Read and validate a configuration file.  `Ok(None)` if it does not
    /// exist.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(Some(config))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_name.is_empty() {
            return Err(ConfigError::Invalid("client_name is empty".to_string()));
        }
        if self.channels == 0 {
            return Err(ConfigError::Invalid("channels must be at least 1".to_string()));
        }
        if self.retry_max_ms < self.retry_initial_ms {
            return Err(ConfigError::Invalid(
                "retry_max_ms is smaller than retry_initial_ms".to_string(),
            ));
        }
        self.inbound
            .validate(self.channels)
            .map_err(ConfigError::Invalid)?;
        self.outbound
            .validate(self.channels)
            .map_err(ConfigError::Invalid)?;
        Ok(())
    }

    pub fn retry_initial(&self) -> Duration {
        Duration::from_millis(self.retry_initial_ms)
    }

    pub fn retry_max(&self) -> Duration {
        Duration::from_millis(self.retry_max_ms)
    }
}
