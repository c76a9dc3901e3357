//! Serializable report envelope.
//!
//! The excluded presentation shell consumes the report as plain JSON with
//! `metadata`, `riskMetrics`, `allocations`, and `confidenceIntervals`
//! sections; this module owns that interchange shape so the core types can
//! stay idiomatic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::{RiskReport, SimulationRequest};

/// Run metadata attached to an exported report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub timestamp: DateTime<Utc>,
    pub simulations: usize,
    pub time_horizon: u32,
    /// Number of technology profiles that fed the run.
    pub expert_count: usize,
}

/// Scalar risk metrics section of the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetricsSection {
    pub expected_value: f64,
    pub standard_deviation: f64,
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
}

/// One allocation row in the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRow {
    pub technology: String,
    pub recommended_percent: u32,
    pub risk_adjusted_score: f64,
    pub real_time_signal: String,
}

/// Symmetric interval between two report percentiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Full export envelope for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEnvelope {
    pub metadata: ReportMetadata,
    pub risk_metrics: RiskMetricsSection,
    pub allocations: Vec<AllocationRow>,
    /// Keyed "50%", "90%", "98%"; bounds taken from the report percentiles.
    pub confidence_intervals: BTreeMap<String, ConfidenceInterval>,
}

impl ReportEnvelope {
    /// Build an envelope for a finished run, stamped with the current time.
    pub fn new(report: &RiskReport, request: &SimulationRequest) -> Self {
        Self::with_timestamp(report, request, Utc::now())
    }

    /// Build an envelope with an explicit timestamp (tests use this to stay
    /// deterministic).
    pub fn with_timestamp(
        report: &RiskReport,
        request: &SimulationRequest,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut confidence_intervals = BTreeMap::new();
        for (label, low_p, high_p) in [("50%", 25, 75), ("90%", 5, 95), ("98%", 1, 99)] {
            if let (Some(lower), Some(upper)) =
                (report.percentile(low_p), report.percentile(high_p))
            {
                confidence_intervals
                    .insert(label.to_string(), ConfidenceInterval { lower, upper });
            }
        }

        Self {
            metadata: ReportMetadata {
                timestamp,
                simulations: request.simulation_count,
                time_horizon: request.time_horizon_years,
                expert_count: request.asset_profiles.len(),
            },
            risk_metrics: RiskMetricsSection {
                expected_value: report.expected_value,
                standard_deviation: report.std_dev,
                percentiles: report.percentiles.clone(),
                var90: report.var90,
                var95: report.var95,
                var99: report.var99,
                cvar95: report.cvar95,
                best_case: report.best_case,
                worst_case: report.worst_case,
                probability_of_loss: report.probability_of_loss,
                sharpe_ratio: report.sharpe_ratio,
                sortino_ratio: report.sortino_ratio,
            },
            allocations: report
                .allocations
                .iter()
                .map(|rec| AllocationRow {
                    technology: rec.technology.clone(),
                    recommended_percent: rec.recommended_percent,
                    risk_adjusted_score: rec.risk_adjusted_score,
                    real_time_signal: rec.real_time_signal.as_str().to_string(),
                })
                .collect(),
            confidence_intervals,
        }
    }

    /// Pretty-printed JSON for the export feature.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| SimError::unexpected(format!("report serialization failed: {err}")))
    }
}
