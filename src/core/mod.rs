//! Core data types and errors for fundsim.

pub mod error;
pub mod types;

pub use error::{Result, SimError};
pub use types::{
    AssetFilter, AssetProfile, OutcomeSample, RiskReport, SimulationOutput, SimulationRequest,
};
