//! Core data types for fundsim.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Starting portfolio value for every simulated run, in notional units.
/// Also serves as the "risk-free" comparison point for Sharpe/Sortino and
/// loss probability. Callers treat it as the unit of measure; it is not
/// configurable.
pub const BASELINE_VALUE: f64 = 1000.0;

/// Hard floor on a drawn yearly investment cost.
pub const MIN_YEARLY_COST: f64 = 10.0;

/// Number of full trajectories retained for visualization. All runs still
/// contribute their terminal value to the outcome sample.
pub const TRAJECTORY_RETENTION_CAP: usize = 100;

/// Yearly investment cost model.
///
/// Note: `std_dev` scales *uniform* noise in the current model, not a
/// Gaussian draw. The name is kept for configuration compatibility with the
/// original model; see `engine::simulate::draw_yearly_cost`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub mean: f64,
    pub std_dev: f64,
}

/// Payoff range on success. The realized impact is uniform between `low`
/// and `median`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactRange {
    pub low: f64,
    pub median: f64,
}

/// Years until the technology's success/failure resolves.
///
/// Only `realistic` gates payoff resolution. The optimistic/pessimistic
/// bounds are carried so profile configuration round-trips; they are inputs
/// for a future sensitivity mode, not consumed by the engine today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaturityEstimate {
    pub optimistic: u32,
    pub realistic: u32,
    pub pessimistic: u32,
}

impl MaturityEstimate {
    /// Estimate with all three bounds equal.
    pub fn flat(years: u32) -> Self {
        Self {
            optimistic: years,
            realistic: years,
            pessimistic: years,
        }
    }
}

/// Static per-technology trend indicator consumed by the allocation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrendSignal {
    #[serde(rename = "Strong Buy")]
    StrongBuy,
    Buy,
    #[default]
    Hold,
}

impl TrendSignal {
    /// Display label matching the interchange format.
    pub fn as_str(self) -> &'static str {
        match self {
            TrendSignal::StrongBuy => "Strong Buy",
            TrendSignal::Buy => "Buy",
            TrendSignal::Hold => "Hold",
        }
    }
}

/// Stochastic profile for one technology/asset. Immutable input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetProfile {
    /// Yearly investment cost draw.
    pub base_cost: CostModel,
    /// Probability of success once maturity is reached.
    pub success_rate: f64,
    /// Payoff range on success.
    pub market_impact: ImpactRange,
    /// Year index at which success/failure resolves.
    pub time_to_maturity: MaturityEstimate,
    /// Carried through for aggregation modes that weight by volatility.
    #[serde(default)]
    pub volatility: f64,
    /// Carried through; not consumed by every aggregation mode.
    #[serde(default)]
    pub breakthrough_probability: f64,
    /// Confidence weighting for the profile's estimates.
    #[serde(default)]
    pub confidence: f64,
    /// Static trend indicator, input to the allocation step only.
    #[serde(default)]
    pub trend: TrendSignal,
}

impl AssetProfile {
    /// Validate the profile invariants.
    ///
    /// Rejects negative cost spread, out-of-range success probability,
    /// inverted impact range, and a maturity below one year.
    pub fn validate(&self, name: &str) -> Result<()> {
        if !self.base_cost.std_dev.is_finite() || self.base_cost.std_dev < 0.0 {
            return Err(SimError::invalid_profile(
                name,
                format!("base_cost.std_dev must be >= 0, got {}", self.base_cost.std_dev),
            ));
        }
        if !(0.0..=1.0).contains(&self.success_rate) {
            return Err(SimError::invalid_profile(
                name,
                format!("success_rate must be in [0, 1], got {}", self.success_rate),
            ));
        }
        if self.market_impact.low > self.market_impact.median {
            return Err(SimError::invalid_profile(
                name,
                format!(
                    "market_impact.low ({}) must be <= market_impact.median ({})",
                    self.market_impact.low, self.market_impact.median
                ),
            ));
        }
        if self.time_to_maturity.realistic < 1 {
            return Err(SimError::invalid_profile(
                name,
                "time_to_maturity.realistic must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Asset selection for a run: all profiles, or exactly one by name.
///
/// Serialized as `"all"` or the asset name, matching the interchange format.
/// An unknown name is not an engine error; it selects no assets, so every
/// year contributes nothing and terminal values equal the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetFilter {
    #[default]
    All,
    Only(String),
}

impl AssetFilter {
    /// Whether the named asset participates in the simulation.
    pub fn selects(&self, name: &str) -> bool {
        match self {
            AssetFilter::All => true,
            AssetFilter::Only(only) => only == name,
        }
    }
}

impl From<String> for AssetFilter {
    fn from(value: String) -> Self {
        if value == "all" {
            AssetFilter::All
        } else {
            AssetFilter::Only(value)
        }
    }
}

impl From<AssetFilter> for String {
    fn from(value: AssetFilter) -> Self {
        match value {
            AssetFilter::All => "all".to_string(),
            AssetFilter::Only(name) => name,
        }
    }
}

/// One simulation request. Created fresh per run; never mutated after
/// submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Number of independent simulated runs.
    pub simulation_count: usize,
    /// Horizon in years; each run evolves year 1 through this value.
    pub time_horizon_years: u32,
    /// Named technology profiles. BTreeMap keeps asset iteration order
    /// stable, which the seeded draw sequence relies on.
    pub asset_profiles: BTreeMap<String, AssetProfile>,
    /// Asset selection for this run.
    #[serde(default)]
    pub asset_filter: AssetFilter,
    /// Seed for the run's pseudo-random sequence. Identical requests with
    /// identical seeds reproduce bit-for-bit.
    #[serde(default)]
    pub seed: u64,
}

impl SimulationRequest {
    /// Validate the request before any sampling begins.
    pub fn validate(&self) -> Result<()> {
        if self.simulation_count == 0 {
            return Err(SimError::invalid_parameter("simulation_count must be > 0"));
        }
        if self.time_horizon_years == 0 {
            return Err(SimError::invalid_parameter("time_horizon_years must be > 0"));
        }
        for (name, profile) in &self.asset_profiles {
            profile.validate(name)?;
        }
        Ok(())
    }

    /// Profiles selected by the request's filter, in stable name order.
    pub fn selected_profiles(&self) -> Vec<(&str, &AssetProfile)> {
        self.asset_profiles
            .iter()
            .filter(|(name, _)| self.asset_filter.selects(name))
            .map(|(name, profile)| (name.as_str(), profile))
            .collect()
    }
}

/// One point of a simulated trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub year: u32,
    pub value: f64,
}

/// One simulated run: portfolio value at year 0 (baseline) through the
/// horizon, clamped to a non-negative floor at each step.
pub type Trajectory = Vec<TrajectoryPoint>;

/// Multiset of terminal portfolio values, one per simulated run.
///
/// Order carries no meaning; the aggregator sorts ascending before deriving
/// order statistics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutcomeSample(Vec<f64>);

impl OutcomeSample {
    /// Wrap a vector of terminal values.
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Number of terminal values.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw terminal values in run order.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Consume into an ascending-sorted vector of terminal values.
    pub fn into_sorted(self) -> Vec<f64> {
        let mut values = self.0;
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values
    }
}

/// Raw engine output for one run of the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    /// Terminal value of every simulated run.
    pub sample: OutcomeSample,
    /// Full trajectories for the first runs, bounded by
    /// [`TRAJECTORY_RETENTION_CAP`].
    pub trajectories: Vec<Trajectory>,
}

/// Per-technology capital allocation recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecommendation {
    pub technology: String,
    /// Integer percent of capital; across a report these sum to exactly 100.
    pub recommended_percent: u32,
    /// Strategy-specific score the percent was derived from.
    pub risk_adjusted_score: f64,
    pub real_time_signal: TrendSignal,
}

/// How the aggregator turns a sorted sample into percentile values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PercentileMethod {
    /// Direct order-statistic index: `sorted[floor(n * p)]`. Biased for
    /// small n, but reproduces the original model exactly.
    #[default]
    DirectIndex,
    /// Linear interpolation between adjacent order statistics.
    Linear,
}

/// Risk/return statistics derived from one outcome sample. Immutable once
/// returned; a new run supersedes (never mutates) the previous report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub expected_value: f64,
    pub std_dev: f64,
    /// Value at percentile p for p in {1, 5, 10, 25, 50, 75, 90, 95, 99}.
    pub percentiles: Vec<(u8, f64)>,
    pub var90: f64,
    pub var95: f64,
    pub var99: f64,
    pub cvar95: f64,
    pub best_case: f64,
    pub worst_case: f64,
    pub probability_of_loss: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub allocations: Vec<AllocationRecommendation>,
}

impl RiskReport {
    /// Look up a percentile value from the report.
    pub fn percentile(&self, p: u8) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|(pct, _)| *pct == p)
            .map(|(_, value)| *value)
    }
}
