// Error types shared by the library. Transport faults are deliberately
// absent: they are folded into terminal responses by `api`.

use std::path::PathBuf;
use thiserror::Error;

/// Problems found while building a `SimConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Invalid scenario \"{name}\": {reason}")]
    Scenario { name: String, reason: String },
}

/// Misuse of the session state machine. None of these reach the wire.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session has already been dialed")]
    AlreadyDialed,

    #[error("Session has not been dialed yet")]
    NotDialed,

    #[error("Session has ended")]
    Ended,

    #[error("Invalid input. Please try again.")]
    EmptyInput,
}
