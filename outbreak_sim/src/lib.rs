//! Phone Outbreak headless harness
//!
//! Runs the outbreak engine without a renderer:
//! - **Seeded runs**: every RNG stream derives from one 64-bit seed
//!   ([`SeededContext`]), so spawn placement and repair durations repeat.
//! - **Scenarios**: scripted situations replayed against a live simulation
//!   with pass/fail checks ([`ScenarioRunner`]).
//! - **Live runs**: a free-running population driven by stdin commands,
//!   sampled into frames for JSON export ([`run_live`], [`SimExport`]).

mod context;
pub mod control;
mod exporter;
pub mod live;
mod runner;
pub mod scenarios;

pub use context::SeededContext;
pub use control::Command;
pub use exporter::{ExportError, SimExport};
pub use live::{finish_live, run_live, LiveOptions, LiveSummary, StopReason};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
