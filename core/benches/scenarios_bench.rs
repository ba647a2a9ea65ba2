use criterion::{Criterion, criterion_group, criterion_main};
use kernelbench_core::{WorkloadConfig, perf::scenarios::prepare_scenarios};
use std::hint::black_box;
use std::time::Duration;

fn bench_scenarios(c: &mut Criterion) {
    // perf_dashboard exports its --config here so timings and recorded workload agree
    let workload = WorkloadConfig::load_from_env().expect("load benchmark workload from KERNELBENCH_CONFIG");
    let scenarios = prepare_scenarios(&workload).expect("prepare scenarios for benchmarking");
    for scenario in scenarios {
        c.bench_function(&scenario.bench_case_name(), move |b| {
            b.iter(|| {
                let outcome = scenario.run().expect("scenario execution failed for benchmarking");
                black_box(outcome.value);
            });
        });
    }
}

// The reference Leibniz workload runs tens of milliseconds per iteration.
fn config() -> Criterion {
    Criterion::default()
        .sample_size(10)
        .measurement_time(Duration::from_secs(10))
}

criterion_group! {
    name = scenarios;
    config = config();
    targets = bench_scenarios
}
criterion_main!(scenarios);
