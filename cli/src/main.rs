use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kernelbench_core::{
    CONFIG_ENV, WorkloadConfig,
    perf::scenarios::{find_scenario, prepare_scenarios, scenario_keys},
};

#[cfg(test)]
mod main_test;

static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "kernelbench_core=debug,kernelbench=info";

#[derive(Debug, Parser)]
#[command(
    name = "kernelbench",
    author,
    version,
    about = "Run benchmark kernels and print their output",
    long_about = None
)]
struct CliArgs {
    /// Workload TOML file; unset fields keep the reference sizes
    #[arg(long, global = true, value_name = "FILE", env = CONFIG_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Approximate pi with the Leibniz series and print the result.
    Leibniz {
        /// Number of series terms
        #[arg(long)]
        terms: Option<u64>,
    },
    /// Build, mutate and print a batch of person records.
    Objects {
        /// Number of records in the batch
        #[arg(long)]
        size: Option<usize>,
    },
    /// Print the Fibonacci sequence repeatedly.
    Fibonacci {
        /// Terms per sequence
        #[arg(long)]
        terms: Option<u32>,
        /// How many times the sequence is printed
        #[arg(long)]
        repeats: Option<u32>,
    },
    /// Run scenarios into a null sink and check their results.
    Verify {
        /// Scenario keys to run (default: all)
        #[arg(value_name = "SCENARIO")]
        scenarios: Vec<String>,
    },
    /// List registered scenarios.
    List,
}

impl Commands {
    /// Scenario key for commands that run a single kernel.
    fn kernel_key(&self) -> Option<&'static str> {
        match self {
            Commands::Leibniz { .. } => Some("leibniz"),
            Commands::Objects { .. } => Some("objects_arrays"),
            Commands::Fibonacci { .. } => Some("fibonacci"),
            Commands::Verify { .. } | Commands::List => None,
        }
    }

    fn apply_overrides(&self, workload: &mut WorkloadConfig) {
        match *self {
            Commands::Leibniz { terms } => {
                if let Some(terms) = terms {
                    workload.series_terms = terms;
                }
            }
            Commands::Objects { size } => {
                if let Some(size) = size {
                    workload.batch_size = size;
                }
            }
            Commands::Fibonacci { terms, repeats } => {
                if let Some(terms) = terms {
                    workload.fibonacci_terms = terms;
                }
                if let Some(repeats) = repeats {
                    workload.fibonacci_repeats = repeats;
                }
            }
            Commands::Verify { .. } | Commands::List => {}
        }
    }
}

fn resolve_workload(config: Option<&Path>, command: &Commands) -> anyhow::Result<WorkloadConfig> {
    let mut workload = WorkloadConfig::load_or_default(config)?;
    command.apply_overrides(&mut workload);
    tracing::debug!(?workload, "resolved workload");
    Ok(workload)
}

/// How a `KERNELBENCH_TRACE` value turns tracing on.
#[derive(Debug, PartialEq, Eq)]
enum TraceToggle {
    Off,
    /// Enabled with `RUST_LOG` or the built-in filter.
    Default,
    /// Enabled with the value itself as the filter expression.
    Filter(String),
}

impl TraceToggle {
    fn parse(raw: &str) -> Self {
        let value = raw.trim();
        match value.to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "off" => TraceToggle::Off,
            "1" | "true" | "on" => TraceToggle::Default,
            _ => TraceToggle::Filter(value.to_string()),
        }
    }
}

/// Installs a stderr subscriber when `KERNELBENCH_TRACE` is set; stdout stays kernel output only.
fn maybe_init_tracing() {
    let toggle = match std::env::var("KERNELBENCH_TRACE") {
        Ok(raw) => TraceToggle::parse(&raw),
        Err(_) => return,
    };
    let filter_expr = match toggle {
        TraceToggle::Off => return,
        TraceToggle::Default => std::env::var("RUST_LOG").ok(),
        TraceToggle::Filter(expr) => Some(expr),
    };

    TRACE_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt};

        let filter = filter_expr
            .and_then(|expr| EnvFilter::try_new(expr).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_TRACE_FILTER));
        let _ = fmt().with_writer(std::io::stderr).with_env_filter(filter).try_init();
    });
}

fn run_kernel(key: &str, workload: &WorkloadConfig) -> anyhow::Result<()> {
    let scenario = find_scenario(key, workload)?;
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    scenario.run_into(&mut out)?;
    out.flush().context("flush stdout")?;
    Ok(())
}

fn run_verify(keys: &[String], workload: &WorkloadConfig) -> anyhow::Result<()> {
    let scenarios = prepare_scenarios(workload)?;
    for key in keys {
        if !scenarios.iter().any(|s| s.key() == key) {
            anyhow::bail!("unknown scenario '{}'", key);
        }
    }

    let mut failed = 0usize;
    for scenario in scenarios
        .iter()
        .filter(|s| keys.is_empty() || keys.iter().any(|k| k == s.key()))
    {
        match scenario.run() {
            Ok(outcome) => println!(
                "{}: ok ({} lines, {} bytes)",
                scenario.key(),
                outcome.lines,
                outcome.output_bytes
            ),
            Err(err) => {
                eprintln!("{}: FAILED: {:#}", scenario.key(), err);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{} scenario(s) failed verification", failed);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    maybe_init_tracing();

    let CliArgs { config, command } = CliArgs::parse();

    if let Commands::List = command {
        for (key, title) in scenario_keys() {
            println!("{:<16}{}", key, title);
        }
        return Ok(());
    }

    let workload = resolve_workload(config.as_deref(), &command)?;
    if let Commands::Verify { scenarios } = &command {
        return run_verify(scenarios, &workload);
    }
    match command.kernel_key() {
        Some(key) => run_kernel(key, &workload),
        None => Ok(()),
    }
}
