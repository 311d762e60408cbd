//! VDSMatch Scenario Harness
//!
//! This crate backs the `vdsmatch` command-line tool and provides a
//! deterministic harness that cross-checks the grid strategy against the
//! exhaustive one on generated networks.
//!
//! # Core Principle: Seeded Ground Truth
//!
//! All randomness comes from a single 64-bit seed:
//! - **Networks**: street lattices and scattered links
//! - **Sensors**: Gaussian jitter around streets, or uniform placement
//!
//! Any failing run is reproducible from its seed number.
//!
//! # Usage
//!
//! ```ignore
//! use vdsmatch_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let runner = ScenarioRunner::new(42, 4);
//! let result = runner.run(ScenarioId::Lattice);
//! assert!(result.passed);
//! ```

mod error;
mod exporter;
mod runner;
pub mod scenarios;
pub mod synthetic;

pub use error::SimError;
pub use exporter::ScenarioReport;
pub use runner::{ScenarioResult, ScenarioRunner, ScenarioTimings};
pub use synthetic::{LatticeParams, NetworkGenerator, RandomParams};
