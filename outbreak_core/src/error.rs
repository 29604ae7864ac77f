//! Error types for the outbreak engine.

use outbreak_env::{EnvError, PhoneId};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Control operation issued after `shutdown`.
    #[error("Simulation has been shut down")]
    ShutDown,

    /// A phone with this id is already registered.
    #[error("Phone {0} is already registered")]
    DuplicatePhone(PhoneId),

    /// The environment could not start a task.
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("Failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl SimError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
