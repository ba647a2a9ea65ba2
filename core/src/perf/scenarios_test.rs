#[cfg(test)]
mod tests {
    use crate::config::WorkloadConfig;
    use crate::perf::scenarios::{find_scenario, prepare_scenarios, scenario_keys};

    fn small_workload() -> WorkloadConfig {
        WorkloadConfig {
            series_terms: 10_000,
            batch_size: 50,
            fibonacci_terms: 40,
            fibonacci_repeats: 3,
        }
    }

    #[test]
    fn test_registry_order_and_case_names() {
        let keys: Vec<&str> = scenario_keys().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["leibniz", "objects_arrays", "fibonacci"]);

        let prepared = prepare_scenarios(&small_workload()).expect("prepare");
        let names: Vec<String> = prepared.iter().map(|s| s.bench_case_name()).collect();
        assert_eq!(names, vec!["leibniz_native", "objects_arrays_native", "fibonacci_native"]);
    }

    #[test]
    fn test_all_scenarios_verify_on_small_workload() {
        for scenario in prepare_scenarios(&small_workload()).expect("prepare") {
            let outcome = scenario
                .run()
                .unwrap_or_else(|e| panic!("{} failed: {:#}", scenario.key(), e));
            assert!(outcome.lines > 0);
            assert!(outcome.output_bytes > outcome.lines);
        }
    }

    #[test]
    fn test_scenario_outcomes() {
        let workload = small_workload();

        let leibniz = find_scenario("leibniz", &workload).expect("leibniz").run().expect("run");
        assert_eq!(leibniz.lines, 1);
        assert!((leibniz.value.expect("value") - std::f64::consts::PI).abs() < 1e-3);

        let objects = find_scenario("objects_arrays", &workload).expect("objects").run().expect("run");
        assert_eq!(objects.lines, 50);
        assert!(objects.value.is_none());

        let fib = find_scenario("fibonacci", &workload).expect("fibonacci").run().expect("run");
        assert_eq!(fib.lines, 120);
    }

    #[test]
    fn test_zero_series_terms_expects_zero() {
        let workload = WorkloadConfig {
            series_terms: 0,
            ..small_workload()
        };
        let outcome = find_scenario("leibniz", &workload).expect("leibniz").run().expect("run");
        assert_eq!(outcome.value, Some(0.0));
    }

    #[test]
    fn test_run_into_writes_kernel_output() {
        let workload = WorkloadConfig {
            batch_size: 2,
            ..small_workload()
        };
        let scenario = find_scenario("objects_arrays", &workload).expect("objects");
        let mut out = Vec::new();
        scenario.run_into(&mut out).expect("run");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "Person 1 - Age: 100, Weight: 80000\nPerson 2 - Age: 100, Weight: 80000\n"
        );
    }

    #[test]
    fn test_invalid_sizes_rejected_by_owning_scenario() {
        let empty_batch = WorkloadConfig {
            batch_size: 0,
            ..small_workload()
        };
        let err = find_scenario("objects_arrays", &empty_batch).err().expect("should reject");
        assert!(err.to_string().contains("batch_size must be at least 1"));

        let too_many_terms = WorkloadConfig {
            fibonacci_terms: 95,
            ..small_workload()
        };
        let err = find_scenario("fibonacci", &too_many_terms).err().expect("should reject");
        assert!(err.to_string().contains("fibonacci_terms 95"));
    }

    #[test]
    fn test_other_kernels_ignore_unrelated_invalid_sizes() {
        let workload = WorkloadConfig {
            batch_size: 0,
            fibonacci_terms: 100,
            ..small_workload()
        };
        let leibniz = find_scenario("leibniz", &workload).expect("leibniz is unaffected");
        assert!(leibniz.run().is_ok());

        let prepared = prepare_scenarios(&workload).expect("prepare never validates");
        let failures: Vec<&str> = prepared
            .iter()
            .filter(|scenario| scenario.run().is_err())
            .map(|scenario| scenario.key())
            .collect();
        assert_eq!(failures, vec!["objects_arrays", "fibonacci"]);
    }

    #[test]
    fn test_run_into_validates_before_writing() {
        let workload = WorkloadConfig {
            fibonacci_terms: 100,
            ..small_workload()
        };
        let scenario = prepare_scenarios(&workload)
            .expect("prepare")
            .into_iter()
            .find(|s| s.key() == "fibonacci")
            .expect("fibonacci registered");
        let mut out = Vec::new();
        assert!(scenario.run_into(&mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_scenario() {
        let err = find_scenario("mandelbrot", &small_workload()).err().expect("unknown");
        assert!(err.to_string().contains("unknown scenario 'mandelbrot'"));
    }
}
