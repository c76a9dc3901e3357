//! fundsim - Monte Carlo risk simulation for technology-investment
//! portfolios.
//!
//! Two components run in strict dependency order:
//! - The simulation engine evolves a notional portfolio year by year under
//!   per-technology cost/payoff uncertainty, producing N independent
//!   trajectories and their terminal values. Runs execute off the caller's
//!   thread with progress reporting and cancellation.
//! - The statistics aggregator consumes the terminal-value sample and
//!   derives percentiles, VaR/CVaR, Sharpe/Sortino, loss probability, and a
//!   pluggable per-technology allocation recommendation.
//!
//! Data flows one way: engine -> outcome sample -> aggregator -> report.
//! The aggregator never feeds back into the engine.

pub mod core;
pub mod engine;
pub mod report;
pub mod stats;

pub use crate::core::error::{Result, SimError};
pub use crate::core::types::{
    AssetFilter, AssetProfile, OutcomeSample, RiskReport, SimulationOutput, SimulationRequest,
};
pub use crate::engine::{SimulationEvent, SimulationHandle, SimulationRunner};
pub use crate::report::ReportEnvelope;
pub use crate::stats::{aggregate, AllocationStrategy, RandomWeight, RiskAdjusted};
