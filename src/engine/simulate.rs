//! Rayon-parallel Monte Carlo core.
//!
//! Each run is an independent sequential loop over years and assets;
//! the outer run loop is embarrassingly parallel. Every run index derives
//! its own ChaCha stream from the request seed, so the outcome sample is
//! bit-identical for any rayon thread count and no lock is held in the
//! hot loop.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::core::error::{Result, SimError};
use crate::core::types::{
    AssetProfile, CostModel, OutcomeSample, SimulationOutput, SimulationRequest, Trajectory,
    TrajectoryPoint, BASELINE_VALUE, MIN_YEARLY_COST, TRAJECTORY_RETENTION_CAP,
};

/// Per-run generator: one ChaCha stream per run index, all seeded from the
/// request seed. Keeps the draw sequence independent of work partitioning.
fn run_rng(seed: u64, run_index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(run_index as u64);
    rng
}

/// Draw one year's investment cost for an asset.
///
/// The spread is applied as *uniform* noise on [-std_dev, +std_dev], not a
/// Gaussian draw, reproducing the original model's behavior despite the
/// field name. Swapping in a true Gaussian sampler would change every
/// downstream statistic; see DESIGN.md before doing so.
#[inline]
pub(crate) fn draw_yearly_cost<R: Rng>(cost: &CostModel, rng: &mut R) -> f64 {
    let noise = (rng.gen::<f64>() - 0.5) * 2.0;
    (cost.mean + noise * cost.std_dev).max(MIN_YEARLY_COST)
}

/// One asset's contribution to a single year's return.
///
/// Pre-maturity the asset is a pure cost sink. From the realistic maturity
/// year onward, a Bernoulli success draw decides between payoff minus cost
/// and cost alone. Draw order is fixed (cost, success, impact) so seeded
/// runs reproduce exactly.
#[inline]
fn yearly_contribution<R: Rng>(profile: &AssetProfile, year: u32, rng: &mut R) -> f64 {
    let actual_cost = draw_yearly_cost(&profile.base_cost, rng);

    if year < profile.time_to_maturity.realistic {
        return -actual_cost;
    }

    let success = rng.gen::<f64>() < profile.success_rate;
    if success {
        let span = profile.market_impact.median - profile.market_impact.low;
        let impact = profile.market_impact.low + rng.gen::<f64>() * span;
        impact - actual_cost
    } else {
        -actual_cost
    }
}

/// Simulate one full run: baseline through the horizon, clamped to a
/// non-negative floor at every year boundary.
fn simulate_run<R: Rng>(
    horizon_years: u32,
    selected: &[(&str, &AssetProfile)],
    rng: &mut R,
) -> Trajectory {
    let mut portfolio_value = BASELINE_VALUE;
    let mut trajectory = Vec::with_capacity(horizon_years as usize + 1);
    trajectory.push(TrajectoryPoint { year: 0, value: portfolio_value });

    for year in 1..=horizon_years {
        let mut yearly_return = 0.0;
        for (_, profile) in selected {
            yearly_return += yearly_contribution(profile, year, rng);
        }
        portfolio_value = (portfolio_value + yearly_return).max(0.0);
        trajectory.push(TrajectoryPoint { year, value: portfolio_value });
    }

    trajectory
}

/// Run the full Monte Carlo simulation.
///
/// Validates the request, then executes `simulation_count` independent runs
/// across the rayon pool. The cancellation flag is checked once per run; a
/// set flag aborts with [`SimError::Cancelled`] and discards partial
/// progress. `on_progress` receives whole percentages (1..=100) as runs
/// complete; it is advisory and must not block for long.
pub fn run_simulation<F>(
    request: &SimulationRequest,
    cancel: &AtomicBool,
    on_progress: F,
) -> Result<SimulationOutput>
where
    F: Fn(u8) + Sync,
{
    request.validate()?;

    let selected = request.selected_profiles();
    let total = request.simulation_count;
    let completed = AtomicUsize::new(0);
    let reported = AtomicUsize::new(0);
    let progress_gate = Mutex::new(());

    let mut results: Vec<(usize, f64, Option<Trajectory>)> = (0..total)
        .into_par_iter()
        .map(|run_index| {
            if cancel.load(Ordering::Relaxed) {
                return Err(SimError::Cancelled);
            }

            let mut rng = run_rng(request.seed, run_index);
            let trajectory = simulate_run(request.time_horizon_years, &selected, &mut rng);
            let terminal = trajectory
                .last()
                .map(|point| point.value)
                .unwrap_or(BASELINE_VALUE);
            let kept = (run_index < TRAJECTORY_RETENTION_CAP).then_some(trajectory);

            // Advisory progress at 1% granularity. The atomic load keeps
            // the hot path lock-free; the gate is only taken on percent
            // boundary crossings (at most 100 per run) and keeps the
            // emitted sequence monotone.
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            let percent = done * 100 / total;
            if percent > reported.load(Ordering::Relaxed) {
                // Progress is advisory: a poisoned gate (callback panic on
                // another worker) just drops the tick.
                if let Ok(_guard) = progress_gate.lock() {
                    if percent > reported.load(Ordering::Relaxed) {
                        reported.store(percent, Ordering::Relaxed);
                        on_progress(percent.min(100) as u8);
                    }
                }
            }

            Ok((run_index, terminal, kept))
        })
        .collect::<Result<Vec<_>>>()?;

    // Restore run order so the sample and the retained trajectory prefix
    // are independent of the parallel merge.
    results.sort_unstable_by_key(|(run_index, _, _)| *run_index);

    let mut terminal_values = Vec::with_capacity(total);
    let mut trajectories = Vec::with_capacity(TRAJECTORY_RETENTION_CAP.min(total));
    for (_, terminal, kept) in results {
        terminal_values.push(terminal);
        if let Some(trajectory) = kept {
            trajectories.push(trajectory);
        }
    }

    Ok(SimulationOutput {
        sample: OutcomeSample::new(terminal_values),
        trajectories,
    })
}

/// Convenience wrapper: run to completion without cancellation or progress
/// reporting.
pub fn simulate(request: &SimulationRequest) -> Result<SimulationOutput> {
    run_simulation(request, &AtomicBool::new(false), |_| {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AssetFilter, ImpactRange, MaturityEstimate, TrendSignal};
    use std::collections::BTreeMap;

    fn profile(maturity: u32) -> AssetProfile {
        AssetProfile {
            base_cost: CostModel { mean: 50.0, std_dev: 10.0 },
            success_rate: 0.5,
            market_impact: ImpactRange { low: 100.0, median: 200.0 },
            time_to_maturity: MaturityEstimate::flat(maturity),
            volatility: 0.2,
            breakthrough_probability: 0.0,
            confidence: 0.5,
            trend: TrendSignal::Hold,
        }
    }

    fn request(count: usize, horizon: u32, maturity: u32) -> SimulationRequest {
        let mut profiles = BTreeMap::new();
        profiles.insert("quantum".to_string(), profile(maturity));
        SimulationRequest {
            simulation_count: count,
            time_horizon_years: horizon,
            asset_profiles: profiles,
            asset_filter: AssetFilter::All,
            seed: 7,
        }
    }

    #[test]
    fn test_cost_floor() {
        let cost = CostModel { mean: 5.0, std_dev: 100.0 };
        let mut rng = run_rng(1, 0);
        for _ in 0..1000 {
            assert!(draw_yearly_cost(&cost, &mut rng) >= MIN_YEARLY_COST);
        }
    }

    #[test]
    fn test_cost_within_spread() {
        let cost = CostModel { mean: 50.0, std_dev: 10.0 };
        let mut rng = run_rng(2, 0);
        for _ in 0..1000 {
            let drawn = draw_yearly_cost(&cost, &mut rng);
            assert!((40.0..=60.0).contains(&drawn));
        }
    }

    #[test]
    fn test_trajectory_shape() {
        let output = simulate(&request(10, 5, 2)).unwrap();
        assert_eq!(output.sample.len(), 10);
        assert_eq!(output.trajectories.len(), 10);
        for trajectory in &output.trajectories {
            assert_eq!(trajectory.len(), 6);
            assert_eq!(trajectory[0].year, 0);
            assert_eq!(trajectory[0].value, BASELINE_VALUE);
            for point in trajectory {
                assert!(point.value >= 0.0);
            }
        }
    }

    #[test]
    fn test_trajectory_retention_cap() {
        let output = simulate(&request(250, 2, 1)).unwrap();
        assert_eq!(output.sample.len(), 250);
        assert_eq!(output.trajectories.len(), TRAJECTORY_RETENTION_CAP);
    }

    #[test]
    fn test_seeded_determinism() {
        let req = request(500, 5, 2);
        let first = simulate(&req).unwrap();
        let second = simulate(&req).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seeds_differ() {
        let req_a = request(100, 5, 2);
        let mut req_b = req_a.clone();
        req_b.seed = 8;
        assert_ne!(simulate(&req_a).unwrap().sample, simulate(&req_b).unwrap().sample);
    }

    #[test]
    fn test_pre_maturity_is_pure_cost() {
        // Horizon 1, maturity 2: every run only pays cost in year 1, so
        // terminal = 1000 - actual_cost with actual_cost >= 10.
        let output = simulate(&request(1000, 1, 2)).unwrap();
        for &value in output.sample.values() {
            assert!(value <= BASELINE_VALUE - MIN_YEARLY_COST);
            assert!(value >= BASELINE_VALUE - 60.0 - 1e-9);
        }
    }

    #[test]
    fn test_unknown_filter_is_idle() {
        let mut req = request(50, 5, 2);
        req.asset_filter = AssetFilter::Only("fusion".to_string());
        let output = simulate(&req).unwrap();
        for &value in output.sample.values() {
            assert_eq!(value, BASELINE_VALUE);
        }
    }

    #[test]
    fn test_rejects_invalid_request() {
        assert!(matches!(
            simulate(&request(0, 5, 2)),
            Err(SimError::InvalidParameter { .. })
        ));
        assert!(matches!(
            simulate(&request(100, 0, 2)),
            Err(SimError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_cancellation_pre_set() {
        let cancelled = AtomicBool::new(true);
        let result = run_simulation(&request(1000, 5, 2), &cancelled, |_| {});
        assert_eq!(result, Err(SimError::Cancelled));
    }

    #[test]
    fn test_progress_reaches_completion() {
        let seen = Mutex::new(Vec::new());
        run_simulation(&request(1000, 2, 1), &AtomicBool::new(false), |pct| {
            seen.lock().unwrap().push(pct);
        })
        .unwrap();
        let seen = seen.into_inner().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|&pct| pct <= 100));
        assert_eq!(*seen.iter().max().unwrap(), 100);
    }
}
