//! Monte Carlo simulation engine.

pub mod runner;
pub mod simulate;

pub use runner::{SimulationEvent, SimulationHandle, SimulationRunner};
pub use simulate::{run_simulation, simulate};
