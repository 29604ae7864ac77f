//! Phone Outbreak Environment Abstraction Layer
//!
//! This crate isolates everything the outbreak engine needs from "the real
//! world" so that the same agent loops run under a production Tokio runtime
//! and under a seeded harness:
//! - Time (`now()`, `sleep()`)
//! - Task spawning (`spawn()`)
//! - Randomness (`rng(stream)`)
//!
//! Each consumer draws its own RNG stream, so an agent never shares a
//! generator with another task.
//!
//! # Example
//!
//! ```ignore
//! use outbreak_env::{OutbreakContext, TokioContext};
//!
//! async fn pace<Ctx: OutbreakContext>(ctx: &Ctx) {
//!     loop {
//!         step();
//!         ctx.sleep(Duration::from_millis(8)).await;
//!     }
//! }
//! ```

mod context;
mod types;
mod error;
mod tokio_impl;

pub use context::{spawn_named, OutbreakContext};
pub use types::PhoneId;
pub use error::EnvError;
pub use tokio_impl::TokioContext;
