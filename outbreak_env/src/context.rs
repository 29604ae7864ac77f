//! Core environment context trait for outbreak agents.

use crate::EnvError;
use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// The central interface for environment interaction.
///
/// This trait abstracts the runtime so that phone loops and periodic tasks
/// can run against production entropy or against a seeded harness.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`, entropy-seeded RNG
/// - **Harness**: `SeededContext` (in `outbreak_sim`) - `ChaCha8Rng(seed)` streams
#[async_trait]
pub trait OutbreakContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    fn now(&self) -> Duration;

    /// Suspends the calling task for the given duration.
    async fn sleep(&self, duration: Duration);

    /// Spawns a named background task.
    ///
    /// Fails with [`EnvError::NoRuntime`] when called outside a runtime.
    fn spawn<F>(&self, name: &str, future: F) -> Result<JoinHandle<()>, EnvError>
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns an independent RNG for the given stream number.
    ///
    /// Seeded implementations derive the generator from the master seed and
    /// `stream`, so the same stream always yields the same sequence.
    fn rng(&self, stream: u64) -> ChaCha8Rng;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// Production contexts are not seeded and return 0.
    fn seed(&self) -> u64;
}

/// Spawns `future` on the current Tokio runtime inside a `task` span.
pub fn spawn_named<F>(name: &str, future: F) -> Result<JoinHandle<()>, EnvError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::runtime::Handle::try_current().map_err(|_| EnvError::no_runtime(name))?;
    let span = tracing::debug_span!("task", task = %name);
    Ok(handle.spawn(future.instrument(span)))
}
