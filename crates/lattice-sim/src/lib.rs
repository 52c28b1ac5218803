//! Lattice Simulation
//!
//! Loads grid scenarios from JSON, runs them for a number of ticks and keeps
//! the full event timeline.
//!
//! # Usage
//!
//! ```ignore
//! let scenario = Scenario::load("scenarios/line.json")?;
//! let mut sim = Simulation::from_scenario(&scenario)?;
//! let summary = sim.run(scenario.ticks);
//! println!("{}", serde_json::to_string_pretty(&sim.snapshot())?);
//! ```

mod error;
mod scenario;
mod simulation;

pub use error::{Error, Result};
pub use scenario::{CasingSpec, ControllerSpec, Scenario};
pub use simulation::{
    CasingView, ControllerView, GridSnapshot, ProbeLog, RunSummary, Simulation,
};
