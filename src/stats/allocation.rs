//! Capital allocation strategies for the recommendation step.
//!
//! The allocation output is a pluggable seam: the default [`RandomWeight`]
//! strategy reproduces the original model, whose recommendation is *not*
//! derived from the simulated outcomes at all. [`RiskAdjusted`] is the
//! documented alternative for callers that want the weights tied to the
//! profile economics. Neither is a mean-variance optimizer.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::types::{AllocationRecommendation, AssetProfile};

/// Strategy for distributing capital across technologies.
///
/// Implementations must be deterministic given `(profiles, seed)` so the
/// aggregator stays a pure function of its inputs.
pub trait AllocationStrategy {
    /// Produce one recommendation per technology. Percentages must sum to
    /// exactly 100 for any non-empty profile set.
    fn allocate(
        &self,
        profiles: &BTreeMap<String, AssetProfile>,
        seed: u64,
    ) -> Vec<AllocationRecommendation>;
}

/// Faithful reproduction of the original allocation step: an independent
/// uniform base weight per technology, normalized to 100, with the signal
/// label copied from the profile's static trend indicator. The simulated
/// outcome distribution plays no part in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomWeight;

impl AllocationStrategy for RandomWeight {
    fn allocate(
        &self,
        profiles: &BTreeMap<String, AssetProfile>,
        seed: u64,
    ) -> Vec<AllocationRecommendation> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let weights: Vec<f64> = profiles.iter().map(|_| rng.gen::<f64>()).collect();
        build_recommendations(profiles, &weights)
    }
}

/// Score-based alternative: weight proportional to the success-weighted
/// mid-impact payoff net of expected cost, over the cost spread. Floored at
/// a small positive value so an all-losing profile set still normalizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAdjusted;

impl RiskAdjusted {
    fn score(profile: &AssetProfile) -> f64 {
        let mid_impact = (profile.market_impact.low + profile.market_impact.median) / 2.0;
        let expected_payoff = profile.success_rate * mid_impact - profile.base_cost.mean;
        let spread = profile.base_cost.std_dev.max(1.0);
        (expected_payoff / spread).max(0.01)
    }
}

impl AllocationStrategy for RiskAdjusted {
    fn allocate(
        &self,
        profiles: &BTreeMap<String, AssetProfile>,
        _seed: u64,
    ) -> Vec<AllocationRecommendation> {
        let weights: Vec<f64> = profiles.values().map(Self::score).collect();
        build_recommendations(profiles, &weights)
    }
}

fn build_recommendations(
    profiles: &BTreeMap<String, AssetProfile>,
    weights: &[f64],
) -> Vec<AllocationRecommendation> {
    let percents = normalize_to_100(weights);
    profiles
        .iter()
        .zip(weights.iter().zip(percents))
        .map(
            |((name, profile), (&weight, percent))| AllocationRecommendation {
                technology: name.clone(),
                recommended_percent: percent,
                risk_adjusted_score: weight,
                real_time_signal: profile.trend,
            },
        )
        .collect()
}

/// Convert raw weights into integer percentages summing to exactly 100,
/// using largest-remainder rounding (floor everything, then hand the
/// leftover points to the largest fractional remainders).
pub fn normalize_to_100(weights: &[f64]) -> Vec<u32> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }

    let total: f64 = weights.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
    let exact: Vec<f64> = if total > 0.0 {
        weights
            .iter()
            .map(|&w| if w.is_finite() && w > 0.0 { w / total * 100.0 } else { 0.0 })
            .collect()
    } else {
        vec![100.0 / n as f64; n]
    };

    let mut percents: Vec<u32> = exact.iter().map(|&e| e.floor() as u32).collect();
    let assigned: u32 = percents.iter().sum();
    let mut leftover = 100u32.saturating_sub(assigned);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });

    for index in order {
        if leftover == 0 {
            break;
        }
        percents[index] += 1;
        leftover -= 1;
    }

    percents
}
