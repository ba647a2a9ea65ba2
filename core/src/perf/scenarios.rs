use std::f64::consts::PI;
use std::io::Write;

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;

use crate::{
    config::WorkloadConfig,
    kernels::{fibonacci, records, series},
    util::CountingWriter,
};

pub struct ScenarioOutcome {
    pub value: Option<f64>,
    pub lines: u64,
    pub output_bytes: u64,
}

#[derive(Clone)]
pub struct PreparedScenario {
    spec: &'static Scenario,
    workload: WorkloadConfig,
}

impl PreparedScenario {
    pub fn key(&self) -> &'static str {
        self.spec.key
    }

    pub fn title(&self) -> &'static str {
        self.spec.title
    }

    pub fn workload(&self) -> &WorkloadConfig {
        &self.workload
    }

    pub fn bench_case_name(&self) -> String {
        format!("{}_native", self.spec.key)
    }

    /// Rejects sizes this scenario's kernel cannot produce a checkable result for.
    /// Fields belonging to other kernels are ignored.
    pub fn validate(&self) -> Result<()> {
        let workload = &self.workload;
        match self.spec.kind {
            ScenarioKind::Leibniz => {}
            ScenarioKind::ObjectsArrays => {
                if workload.batch_size == 0 {
                    bail!("invalid {} workload: batch_size must be at least 1", self.spec.key);
                }
            }
            ScenarioKind::Fibonacci => {
                if workload.fibonacci_terms > fibonacci::MAX_TERMS {
                    bail!(
                        "invalid {} workload: fibonacci_terms {} exceeds the {} terms representable in u64",
                        self.spec.key,
                        workload.fibonacci_terms,
                        fibonacci::MAX_TERMS
                    );
                }
            }
        }
        Ok(())
    }

    /// Runs the kernel into a counting null sink and checks the result.
    pub fn run(&self) -> Result<ScenarioOutcome> {
        self.validate()?;
        let mut sink = CountingWriter::discarding();
        let value = self.execute(&mut sink)?;
        let outcome = ScenarioOutcome {
            value,
            lines: sink.lines(),
            output_bytes: sink.bytes(),
        };
        self.expected().verify(&outcome)?;
        debug!(
            scenario = self.spec.key,
            lines = outcome.lines,
            bytes = outcome.output_bytes,
            "scenario verified"
        );
        Ok(outcome)
    }

    /// Runs the kernel into `out` without verification.
    pub fn run_into<W: Write + ?Sized>(&self, out: &mut W) -> Result<Option<f64>> {
        self.validate()?;
        self.execute(out)
    }

    fn execute<W: Write + ?Sized>(&self, out: &mut W) -> Result<Option<f64>> {
        let WorkloadConfig {
            series_terms,
            batch_size,
            fibonacci_terms,
            fibonacci_repeats,
        } = self.workload;
        match self.spec.kind {
            ScenarioKind::Leibniz => {
                let value = series::write_approximation(out, series_terms).context("write leibniz output")?;
                Ok(Some(value))
            }
            ScenarioKind::ObjectsArrays => {
                records::run_batch(out, batch_size).context("write record batch output")?;
                Ok(None)
            }
            ScenarioKind::Fibonacci => {
                fibonacci::run_repeated(out, fibonacci_terms, fibonacci_repeats)
                    .context("write fibonacci output")?;
                Ok(None)
            }
        }
    }

    fn expected(&self) -> ExpectedValue {
        match self.spec.kind {
            ScenarioKind::Leibniz => {
                let n = self.workload.series_terms;
                if n == 0 {
                    ExpectedValue::Near { target: 0.0, tolerance: 0.0 }
                } else {
                    ExpectedValue::Near {
                        target: PI,
                        tolerance: series::error_bound(n),
                    }
                }
            }
            ScenarioKind::ObjectsArrays => ExpectedValue::Lines(self.workload.batch_size as u64),
            ScenarioKind::Fibonacci => ExpectedValue::Lines(
                u64::from(self.workload.fibonacci_terms) * u64::from(self.workload.fibonacci_repeats),
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScenarioKind {
    Leibniz,
    ObjectsArrays,
    Fibonacci,
}

struct Scenario {
    key: &'static str,
    title: &'static str,
    kind: ScenarioKind,
}

#[derive(Clone)]
enum ExpectedValue {
    Near { target: f64, tolerance: f64 },
    Lines(u64),
}

impl ExpectedValue {
    fn verify(&self, outcome: &ScenarioOutcome) -> Result<()> {
        let matches = match self {
            ExpectedValue::Near { target, tolerance } => match outcome.value {
                Some(v) => (v - target).abs() <= *tolerance && outcome.lines == 1,
                None => false,
            },
            ExpectedValue::Lines(n) => outcome.lines == *n,
        };
        if matches {
            Ok(())
        } else {
            Err(anyhow!(
                "expected {:?} but observed value {:?} over {} lines",
                self,
                outcome.value,
                outcome.lines
            ))
        }
    }
}

impl std::fmt::Debug for ExpectedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedValue::Near { target, tolerance } => write!(f, "Near({} ± {})", target, tolerance),
            ExpectedValue::Lines(n) => write!(f, "Lines({})", n),
        }
    }
}

static SCENARIOS: &[Scenario] = &[
    Scenario {
        key: "leibniz",
        title: "Leibniz series approximation of pi",
        kind: ScenarioKind::Leibniz,
    },
    Scenario {
        key: "objects_arrays",
        title: "Record batch mutation and rendering",
        kind: ScenarioKind::ObjectsArrays,
    },
    Scenario {
        key: "fibonacci",
        title: "Repeated Fibonacci sequence output",
        kind: ScenarioKind::Fibonacci,
    },
];

/// `(key, title)` for every registered scenario, in registry order.
pub fn scenario_keys() -> impl Iterator<Item = (&'static str, &'static str)> {
    SCENARIOS.iter().map(|s| (s.key, s.title))
}

/// Registered scenarios bound to `workload`. Each checks only its own sizes when run.
pub fn prepare_scenarios(workload: &WorkloadConfig) -> Result<Vec<PreparedScenario>> {
    Ok(SCENARIOS
        .iter()
        .map(|spec| PreparedScenario {
            spec,
            workload: *workload,
        })
        .collect())
}

pub fn find_scenario(key: &str, workload: &WorkloadConfig) -> Result<PreparedScenario> {
    let scenario = prepare_scenarios(workload)?
        .into_iter()
        .find(|scenario| scenario.key() == key)
        .ok_or_else(|| anyhow!("unknown scenario '{}'", key))?;
    scenario.validate()?;
    Ok(scenario)
}
