//! Error types for the outbreak environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A task was spawned outside of a Tokio runtime.
    #[error("No async runtime available to spawn task '{task}'")]
    NoRuntime {
        /// Name of the task that could not be started
        task: String,
    },
}

impl EnvError {
    /// Creates a no-runtime error for the named task.
    pub fn no_runtime(task: impl Into<String>) -> Self {
        Self::NoRuntime { task: task.into() }
    }
}
