//! Benchmark for fundsim simulation throughput.

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fundsim::core::types::{
    AssetFilter, AssetProfile, CostModel, ImpactRange, MaturityEstimate, SimulationRequest,
    TrendSignal,
};
use fundsim::engine::simulate;
use fundsim::stats::aggregate::aggregate;
use fundsim::RandomWeight;

/// Build a representative three-technology request.
fn sample_request(simulation_count: usize) -> SimulationRequest {
    let mut profiles = BTreeMap::new();
    for (name, cost, rate, maturity) in [
        ("ai", 60.0, 0.6, 2),
        ("fusion", 90.0, 0.2, 5),
        ("quantum", 45.0, 0.35, 3),
    ] {
        profiles.insert(
            name.to_string(),
            AssetProfile {
                base_cost: CostModel { mean: cost, std_dev: cost * 0.2 },
                success_rate: rate,
                market_impact: ImpactRange { low: 150.0, median: 450.0 },
                time_to_maturity: MaturityEstimate::flat(maturity),
                volatility: 0.25,
                breakthrough_probability: 0.02,
                confidence: 0.6,
                trend: TrendSignal::Buy,
            },
        );
    }
    SimulationRequest {
        simulation_count,
        time_horizon_years: 10,
        asset_profiles: profiles,
        asset_filter: AssetFilter::All,
        seed: 42,
    }
}

fn bench_simulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation");
    for count in [1_000, 10_000, 50_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let request = sample_request(count);
            b.iter(|| simulate(black_box(&request)).unwrap());
        });
    }
    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let request = sample_request(50_000);
    let output = simulate(&request).unwrap();

    c.bench_function("aggregate_50k", |b| {
        b.iter(|| {
            aggregate(
                black_box(output.sample.clone()),
                &request.asset_profiles,
                &RandomWeight,
                request.seed,
            )
            .unwrap()
        });
    });
}

criterion_group!(benches, bench_simulation, bench_aggregation);
criterion_main!(benches);
