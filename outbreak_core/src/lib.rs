//! Phone Outbreak Core - concurrency and coordination engine
//!
//! A population of phones moves around a bounded arena, each phone driven
//! by its own task. Infection spreads by proximity and infected phones race
//! for a single repair shop:
//! 1. **Agents**: [`Phone`] state lives in atomics; only the owning
//!    [`PhoneDriver`] moves it or drains its health.
//! 2. **Contention**: the [`RepairShop`] is a single slot claimed with a
//!    non-blocking try-acquire that hands out an RAII [`RepairTicket`].
//! 3. **Coordination**: the [`PauseCoordinator`] is the barrier every phone
//!    consults before each step; the [`InfectionScanner`] runs on its own
//!    period against registry snapshots.
//!
//! [`Simulation`] owns all of it with an explicit start/shutdown lifecycle.

pub mod config;
pub mod driver;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod pause;
pub mod phone;
pub mod registry;
pub mod repair_shop;
pub mod scanner;
pub mod simulation;
pub mod stats;

// Re-export key types for convenience
pub use config::SimulationConfig;
pub use driver::{PhoneDriver, RepairTime, Step};
pub use error::SimError;
pub use frame::{Frame, PhoneView, ShopView};
pub use geometry::{Bounds, Point, Velocity};
pub use pause::{PauseCoordinator, StopSignal};
pub use phone::{InfectionState, Phone, MAX_HEALTH, REPAIR_THRESHOLD};
pub use registry::Registry;
pub use repair_shop::{RepairShop, RepairTicket};
pub use scanner::InfectionScanner;
pub use simulation::{ShutdownReport, Simulation};
pub use stats::{InfectionHistory, Statistics};

pub use outbreak_env::{OutbreakContext, PhoneId, TokioContext};
