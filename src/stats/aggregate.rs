//! Statistics aggregation over a terminal-value sample.
//!
//! Pure function of its inputs: the only randomness already happened inside
//! the engine (the allocation strategy draws from its own seeded generator,
//! so identical inputs always yield identical reports).

use std::collections::BTreeMap;

use crate::core::error::{Result, SimError};
use crate::core::types::{
    AssetProfile, OutcomeSample, PercentileMethod, RiskReport, BASELINE_VALUE,
};
use crate::stats::allocation::AllocationStrategy;

/// Percentiles reported, in ascending order.
pub const REPORT_PERCENTILES: [u8; 9] = [1, 5, 10, 25, 50, 75, 90, 95, 99];

/// Ratio reported by Sortino when the sample has no measurable downside but
/// a positive excess mean. Deliberate saturation, not a computed value.
pub const SORTINO_SATURATION: f64 = 10.0;

/// Compute a full risk report from an outcome sample.
///
/// Uses the direct order-statistic percentile (`sorted[floor(n * p)]`),
/// which is biased for small `n` but reproduces the original model; pass
/// [`PercentileMethod::Linear`] through [`aggregate_with`] for the
/// interpolated variant.
pub fn aggregate(
    sample: OutcomeSample,
    profiles: &BTreeMap<String, AssetProfile>,
    strategy: &dyn AllocationStrategy,
    alloc_seed: u64,
) -> Result<RiskReport> {
    aggregate_with(sample, profiles, strategy, alloc_seed, PercentileMethod::DirectIndex)
}

/// [`aggregate`] with an explicit percentile method.
pub fn aggregate_with(
    sample: OutcomeSample,
    profiles: &BTreeMap<String, AssetProfile>,
    strategy: &dyn AllocationStrategy,
    alloc_seed: u64,
    method: PercentileMethod,
) -> Result<RiskReport> {
    if sample.is_empty() {
        return Err(SimError::empty_sample("risk aggregation"));
    }

    let sorted = sample.into_sorted();
    let n = sorted.len();
    let nf = n as f64;

    let mean = sorted.iter().sum::<f64>() / nf;
    // Population variance, matching the source (not the n-1 sample form).
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / nf;
    let std_dev = variance.sqrt();

    let percentiles: Vec<(u8, f64)> = REPORT_PERCENTILES
        .iter()
        .map(|&p| (p, percentile_value(&sorted, p as f64 / 100.0, method)))
        .collect();

    // Loss tail: VaR at confidence p indexes the worst (1 - p) fraction.
    let var90 = sorted[tail_index(n, 0.10)];
    let var95 = sorted[tail_index(n, 0.05)];
    let var99 = sorted[tail_index(n, 0.01)];

    let cvar95 = {
        let cut = (nf * 0.05).floor() as usize;
        // Average over at least one element so a tiny sample never divides
        // by zero.
        let tail = &sorted[..cut.max(1)];
        tail.iter().sum::<f64>() / tail.len() as f64
    };

    let risk_free = BASELINE_VALUE;
    let below: Vec<f64> = sorted.iter().copied().filter(|&v| v < risk_free).collect();
    let downside = if below.is_empty() {
        0.0
    } else {
        let sum_sq: f64 = below.iter().map(|&v| (v - risk_free).powi(2)).sum();
        (sum_sq / below.len() as f64).sqrt()
    };

    let sharpe_ratio = if std_dev > 0.0 { (mean - risk_free) / std_dev } else { 0.0 };
    let sortino_ratio = if downside > 0.0 {
        (mean - risk_free) / downside
    } else if mean > risk_free {
        SORTINO_SATURATION
    } else {
        0.0
    };

    let probability_of_loss = below.len() as f64 / nf;

    Ok(RiskReport {
        expected_value: mean,
        std_dev,
        percentiles,
        var90,
        var95,
        var99,
        cvar95,
        best_case: sorted[n - 1],
        worst_case: sorted[0],
        probability_of_loss,
        sharpe_ratio,
        sortino_ratio,
        allocations: strategy.allocate(profiles, alloc_seed),
    })
}

/// Index of the order statistic bounding the worst `fraction` of outcomes.
#[inline]
fn tail_index(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).floor() as usize).min(n - 1)
}

/// Percentile of an ascending-sorted sample. `p` must be in [0, 1).
fn percentile_value(sorted: &[f64], p: f64, method: PercentileMethod) -> f64 {
    let n = sorted.len();
    match method {
        PercentileMethod::DirectIndex => {
            let index = ((n as f64 * p).floor() as usize).min(n - 1);
            sorted[index]
        }
        PercentileMethod::Linear => {
            let rank = (n as f64 - 1.0) * p;
            let lo = rank.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = rank - lo as f64;
            sorted[lo] + frac * (sorted[hi] - sorted[lo])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        CostModel, ImpactRange, MaturityEstimate, TrendSignal,
    };
    use crate::stats::allocation::RandomWeight;

    fn profiles() -> BTreeMap<String, AssetProfile> {
        let mut map = BTreeMap::new();
        map.insert(
            "quantum".to_string(),
            AssetProfile {
                base_cost: CostModel { mean: 50.0, std_dev: 10.0 },
                success_rate: 0.5,
                market_impact: ImpactRange { low: 100.0, median: 200.0 },
                time_to_maturity: MaturityEstimate::flat(2),
                volatility: 0.2,
                breakthrough_probability: 0.0,
                confidence: 0.5,
                trend: TrendSignal::Hold,
            },
        );
        map
    }

    fn report_for(values: Vec<f64>) -> RiskReport {
        aggregate(OutcomeSample::new(values), &profiles(), &RandomWeight, 42).unwrap()
    }

    #[test]
    fn test_empty_sample_fails_fast() {
        let result = aggregate(OutcomeSample::new(vec![]), &profiles(), &RandomWeight, 0);
        assert!(matches!(result, Err(SimError::EmptySample { .. })));
    }

    #[test]
    fn test_mean_and_population_std_dev() {
        let report = report_for(vec![900.0, 1000.0, 1100.0]);
        assert!((report.expected_value - 1000.0).abs() < 1e-12);
        // Population variance of [900, 1000, 1100] is 20000/3.
        let expected = (20000.0_f64 / 3.0).sqrt();
        assert!((report.std_dev - expected).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_direct_index() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let report = report_for(values);
        // sorted[floor(100 * p)]
        assert_eq!(report.percentile(1), Some(1.0));
        assert_eq!(report.percentile(50), Some(50.0));
        assert_eq!(report.percentile(99), Some(99.0));
    }

    #[test]
    fn test_var_indexes_loss_tail() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let report = report_for(values);
        assert_eq!(report.var90, 10.0);
        assert_eq!(report.var95, 5.0);
        assert_eq!(report.var99, 1.0);
        // CVaR95 = mean of the worst 5 outcomes [0..5) = 2.0.
        assert_eq!(report.cvar95, 2.0);
    }

    #[test]
    fn test_var_ordering_invariant() {
        let values: Vec<f64> = (0..1000).map(|i| 500.0 + (i as f64) * 1.7).collect();
        let report = report_for(values);
        assert!(report.worst_case <= report.var99);
        assert!(report.var99 <= report.var95);
        assert!(report.var95 <= report.var90);
        assert!(report.var90 <= report.expected_value);
        assert!(report.expected_value <= report.best_case);
    }

    #[test]
    fn test_probability_of_loss_strictly_below_baseline() {
        let report = report_for(vec![800.0, 999.9, 1000.0, 1200.0]);
        assert_eq!(report.probability_of_loss, 0.5);
    }

    #[test]
    fn test_sortino_saturation_no_downside() {
        let report = report_for(vec![1100.0, 1200.0, 1300.0]);
        assert_eq!(report.sortino_ratio, SORTINO_SATURATION);
    }

    #[test]
    fn test_sortino_zero_when_flat_at_baseline() {
        let report = report_for(vec![1000.0, 1000.0]);
        assert_eq!(report.sortino_ratio, 0.0);
        assert_eq!(report.sharpe_ratio, 0.0);
    }

    #[test]
    fn test_single_value_sample() {
        let report = report_for(vec![950.0]);
        assert_eq!(report.expected_value, 950.0);
        assert_eq!(report.std_dev, 0.0);
        assert_eq!(report.sharpe_ratio, 0.0);
        assert_eq!(report.var90, 950.0);
        assert_eq!(report.var95, 950.0);
        assert_eq!(report.var99, 950.0);
        assert_eq!(report.cvar95, 950.0);
        assert_eq!(report.best_case, 950.0);
        assert_eq!(report.worst_case, 950.0);
        assert_eq!(report.probability_of_loss, 1.0);
    }

    #[test]
    fn test_idempotent() {
        let values: Vec<f64> = (0..500).map(|i| 700.0 + i as f64).collect();
        let first = report_for(values.clone());
        let second = report_for(values);
        assert_eq!(first, second);
    }

    #[test]
    fn test_linear_percentile_interpolates() {
        let sample = OutcomeSample::new(vec![0.0, 10.0]);
        let report = aggregate_with(
            sample,
            &profiles(),
            &RandomWeight,
            0,
            PercentileMethod::Linear,
        )
        .unwrap();
        assert_eq!(report.percentile(50), Some(5.0));
    }
}
