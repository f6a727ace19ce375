use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the routing daemon.
///
/// None of these ever reach the host: the binder logs them and moves on.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("failed to open client `{client_name}`: {reason}")]
    SessionOpen { client_name: String, reason: String },

    #[error("failed to activate client `{client_name}`: {reason}")]
    Activate { client_name: String, reason: String },

    #[error("Failed to connect {output} -> {input}: {reason}")]
    Connect {
        output: String,
        input: String,
        reason: String,
    },

    #[error("Failed to disconnect {output} -> {input}: {reason}")]
    Disconnect {
        output: String,
        input: String,
        reason: String,
    },
}

/// Failures loading the optional binder configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
