//! Seeded context implementing OutbreakContext for reproducible runs.

use async_trait::async_trait;
use outbreak_env::{spawn_named, EnvError, OutbreakContext};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Context whose RNG streams all derive from one master seed.
///
/// Time and scheduling stay real (Tokio), so interleavings still vary
/// between runs; spawn placement, headings and repair durations do not.
#[derive(Debug, Clone)]
pub struct SeededContext {
    seed: u64,
    start: Instant,
}

impl SeededContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    fn stream_seed(&self, stream: u64) -> u64 {
        self.seed.wrapping_mul(0x517cc1b727220a95) ^ stream
    }
}

#[async_trait]
impl OutbreakContext for SeededContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, name: &str, future: F) -> Result<JoinHandle<()>, EnvError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        spawn_named(name, future)
    }

    fn rng(&self, stream: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.stream_seed(stream))
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}
