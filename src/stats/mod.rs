//! Statistics aggregation and allocation recommendations.

pub mod aggregate;
pub mod allocation;

pub use aggregate::{aggregate, aggregate_with};
pub use allocation::{AllocationStrategy, RandomWeight, RiskAdjusted};
