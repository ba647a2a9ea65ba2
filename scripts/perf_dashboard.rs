//! Runs the scenario benches and folds criterion output plus peak-heap samples into a
//! rolling JSON/CSV history with a static HTML dashboard.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Parser;
use kernelbench_core::{
    CONFIG_ENV, WorkloadConfig,
    perf::scenarios::{PreparedScenario, prepare_scenarios},
};
use serde::{Deserialize, Serialize};
use std::alloc::{GlobalAlloc, Layout, System};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

const DASHBOARD_TEMPLATE: &str = include_str!("perf_dashboard_template.html");
const DATA_PLACEHOLDER: &str = "__DATA_PLACEHOLDER__";
const CSV_HEADER: &str =
    "scenario,variant,mean_ns,median_ns,std_dev_ns,p50_ns,p95_ns,p99_ns,memory_peak_bytes,output_bytes";

/// Counts live heap bytes so a scenario's peak can be sampled between resets.
struct PeakTrackingAllocator {
    live: AtomicUsize,
    peak: AtomicUsize,
    floor: AtomicUsize,
}

#[global_allocator]
static HEAP: PeakTrackingAllocator = PeakTrackingAllocator {
    live: AtomicUsize::new(0),
    peak: AtomicUsize::new(0),
    floor: AtomicUsize::new(0),
};

impl PeakTrackingAllocator {
    fn grow(&self, size: usize) {
        let live = self.live.fetch_add(size, Ordering::SeqCst).saturating_add(size);
        self.peak.fetch_max(live, Ordering::SeqCst);
    }

    fn shrink(&self, size: usize) {
        self.live.fetch_sub(size, Ordering::SeqCst);
    }

    fn begin_sample(&self) {
        let live = self.live.load(Ordering::SeqCst);
        self.floor.store(live, Ordering::SeqCst);
        self.peak.store(live, Ordering::SeqCst);
    }

    fn sampled_peak(&self) -> usize {
        self.peak
            .load(Ordering::SeqCst)
            .saturating_sub(self.floor.load(Ordering::SeqCst))
    }
}

unsafe impl GlobalAlloc for PeakTrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            self.grow(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            self.grow(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        self.shrink(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let moved = unsafe { System.realloc(ptr, layout, new_size) };
        if !moved.is_null() {
            let old_size = layout.size();
            if new_size > old_size {
                self.grow(new_size - old_size);
            } else {
                self.shrink(old_size - new_size);
            }
        }
        moved
    }
}

#[derive(Debug, Parser)]
#[command(name = "perf_dashboard", about = "Aggregate kernelbench criterion results into a dashboard")]
struct Options {
    /// Bench targets to run before collecting results
    #[arg(long = "benches", value_delimiter = ',', default_value = "scenarios_bench")]
    benches: Vec<String>,
    /// Append a bench target (can repeat)
    #[arg(long = "bench", value_name = "NAME")]
    extra_benches: Vec<String>,
    /// Path to criterion output
    #[arg(long, default_value = "target/criterion")]
    criterion_dir: PathBuf,
    /// Destination directory for dashboard artifacts
    #[arg(long, default_value = "docs/perf/dashboard")]
    output_dir: PathBuf,
    /// Max history snapshots to keep
    #[arg(long, default_value_t = 30)]
    history_limit: usize,
    /// Peak memory sampling iterations
    #[arg(long = "memory-iters", default_value_t = 3)]
    memory_iterations: usize,
    /// Override the RFC3339 timestamp for this run
    #[arg(long, value_parser = parse_timestamp)]
    timestamp: Option<DateTime<Utc>>,
    /// Attach notes to this snapshot
    #[arg(long)]
    notes: Option<String>,
    /// Workload TOML used for both the bench run and memory sampling
    #[arg(long)]
    config: Option<PathBuf>,
    /// Skip running cargo bench and reuse existing criterion output
    #[arg(long)]
    skip_bench: bool,
}

impl Options {
    fn bench_targets(&self) -> impl Iterator<Item = &str> {
        self.benches
            .iter()
            .chain(&self.extra_benches)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC3339 timestamp: {}", e))
}

#[derive(Debug, Serialize, Deserialize)]
struct ScenarioMetrics {
    scenario: String,
    scenario_title: String,
    variant: String,
    mean_ns: f64,
    median_ns: f64,
    std_dev_ns: f64,
    p50_ns: f64,
    p95_ns: f64,
    p99_ns: f64,
    memory_peak_bytes: u64,
    #[serde(default)]
    output_bytes: u64,
}

impl ScenarioMetrics {
    fn csv_row(&self) -> String {
        format!(
            "{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{},{}",
            self.scenario,
            self.variant,
            self.mean_ns,
            self.median_ns,
            self.std_dev_ns,
            self.p50_ns,
            self.p95_ns,
            self.p99_ns,
            self.memory_peak_bytes,
            self.output_bytes
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RunRecord {
    generated_at: String,
    git_rev: Option<String>,
    notes: Option<String>,
    #[serde(default)]
    workload: Option<WorkloadConfig>,
    metrics: Vec<ScenarioMetrics>,
}

#[derive(Debug, Serialize)]
struct HistoryFile {
    generated_at: String,
    history_limit: usize,
    runs: Vec<RunRecord>,
}

#[derive(Deserialize)]
struct Estimates {
    mean: PointEstimate,
    median: PointEstimate,
    std_dev: PointEstimate,
}

#[derive(Deserialize)]
struct PointEstimate {
    point_estimate: f64,
}

struct TimeStats {
    mean_ns: f64,
    median_ns: f64,
    std_dev_ns: f64,
    p50_ns: f64,
    p95_ns: f64,
    p99_ns: f64,
}

struct MemoryStats {
    peak_bytes: usize,
    output_bytes: u64,
}

fn main() -> Result<()> {
    let opts = Options::parse();
    if !opts.skip_bench {
        for bench in opts.bench_targets() {
            run_cargo_bench(bench, opts.config.as_deref())?;
        }
    }

    let history_dir = opts.output_dir.join("history");
    fs::create_dir_all(&history_dir).with_context(|| format!("create history directory {}", history_dir.display()))?;

    let workload = WorkloadConfig::load_or_default(opts.config.as_deref())?;
    let scenarios = prepare_scenarios(&workload).context("prepare benchmark scenarios")?;
    let metrics = scenarios
        .iter()
        .map(|scenario| collect_metrics(&opts, scenario))
        .collect::<Result<Vec<_>>>()?;

    let timestamp = opts.timestamp.unwrap_or_else(Utc::now);
    let generated_at = timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
    let run = RunRecord {
        generated_at: generated_at.clone(),
        git_rev: std::env::var("GITHUB_SHA").ok().map(|sha| sha.chars().take(8).collect()),
        notes: opts.notes.clone(),
        workload: Some(workload),
        metrics,
    };

    let stamp = timestamp.format("%Y%m%dT%H%M%SZ").to_string();
    write_snapshot(&opts.output_dir, "latest", &run)?;
    write_snapshot(&history_dir, &stamp, &run)?;

    prune_history(&history_dir, opts.history_limit)?;
    let history = HistoryFile {
        generated_at,
        history_limit: opts.history_limit,
        runs: load_history_runs(&history_dir, opts.history_limit)?,
    };
    let history_path = opts.output_dir.join("history.json");
    write_json(&history_path, &history)?;

    let index_path = opts.output_dir.join("index.html");
    fs::write(&index_path, render_dashboard(&history)?).with_context(|| format!("write {}", index_path.display()))?;

    println!(
        "Performance dashboard updated -> {}, {}, {}",
        opts.output_dir.join("latest.json").display(),
        history_path.display(),
        index_path.display()
    );
    Ok(())
}

fn collect_metrics(opts: &Options, scenario: &PreparedScenario) -> Result<ScenarioMetrics> {
    let time = load_time_stats(&opts.criterion_dir, &scenario.bench_case_name())?;
    let memory = measure_peak_memory(scenario, opts.memory_iterations)?;
    Ok(ScenarioMetrics {
        scenario: scenario.key().to_string(),
        scenario_title: scenario.title().to_string(),
        variant: "native".to_string(),
        mean_ns: time.mean_ns,
        median_ns: time.median_ns,
        std_dev_ns: time.std_dev_ns,
        p50_ns: time.p50_ns,
        p95_ns: time.p95_ns,
        p99_ns: time.p99_ns,
        memory_peak_bytes: memory.peak_bytes as u64,
        output_bytes: memory.output_bytes,
    })
}

/// `cargo bench` for one target. The workload file travels in `CONFIG_ENV` as an absolute
/// path because cargo runs bench binaries from the package directory.
fn bench_command(bench: &str, config: Option<&Path>) -> Result<Command> {
    let mut cmd = Command::new("cargo");
    cmd.args(["bench", "-p", "kernelbench-core", "--bench", bench, "--", "--noplot"]);
    match config {
        Some(path) => {
            let absolute =
                fs::canonicalize(path).with_context(|| format!("resolve workload config {}", path.display()))?;
            cmd.env(CONFIG_ENV, absolute);
        }
        None => {
            cmd.env_remove(CONFIG_ENV);
        }
    }
    Ok(cmd)
}

fn run_cargo_bench(bench: &str, config: Option<&Path>) -> Result<()> {
    let status = bench_command(bench, config)?
        .status()
        .context("failed to spawn cargo bench")?;
    if !status.success() {
        bail!("cargo bench --bench {} exited with {}", bench, status);
    }
    Ok(())
}

fn load_time_stats(criterion_dir: &Path, case: &str) -> Result<TimeStats> {
    let case_dir = criterion_dir.join(case).join("new");

    let estimates_path = case_dir.join("estimates.json");
    let raw = fs::read_to_string(&estimates_path).with_context(|| format!("read {}", estimates_path.display()))?;
    let estimates: Estimates =
        serde_json::from_str(&raw).with_context(|| format!("parse {}", estimates_path.display()))?;

    let samples_path = case_dir.join("raw.csv");
    let file = File::open(&samples_path).with_context(|| format!("open {}", samples_path.display()))?;
    let mut samples = read_samples(BufReader::new(file)).with_context(|| format!("parse {}", samples_path.display()))?;
    samples.sort_by(f64::total_cmp);

    Ok(TimeStats {
        mean_ns: estimates.mean.point_estimate,
        median_ns: estimates.median.point_estimate,
        std_dev_ns: estimates.std_dev.point_estimate,
        p50_ns: quantile(&samples, 0.5),
        p95_ns: quantile(&samples, 0.95),
        p99_ns: quantile(&samples, 0.99),
    })
}

/// Per-iteration sample times from criterion's `raw.csv`, header skipped.
fn read_samples<R: BufRead>(reader: R) -> Result<Vec<f64>> {
    let mut samples = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.starts_with("group") || line.trim().is_empty() {
            continue;
        }
        samples.push(parse_sample_value(&line)?);
    }
    Ok(samples)
}

fn parse_sample_value(line: &str) -> Result<f64> {
    let columns: Vec<&str> = line.trim_end().split(',').collect();
    if columns.len() < 8 {
        bail!("raw.csv row had {} columns, expected at least 8", columns.len());
    }
    let measured: f64 = columns[5]
        .parse()
        .context("raw.csv contained a non-numeric sample_measured_value")?;
    let iterations: f64 = columns[7]
        .parse()
        .context("raw.csv contained a non-numeric iteration_count")?;
    Ok(if iterations > 0.0 { measured / iterations } else { measured })
}

/// Linear-interpolated quantile over already sorted samples.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted {
        [] => 0.0,
        [only] => *only,
        _ => {
            let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            let weight = pos - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

fn measure_peak_memory(scenario: &PreparedScenario, iterations: usize) -> Result<MemoryStats> {
    let warm = scenario
        .run()
        .with_context(|| format!("warm-up run of {}", scenario.key()))?;

    let mut peak_bytes = 0usize;
    for _ in 0..iterations.max(1) {
        HEAP.begin_sample();
        scenario.run()?;
        peak_bytes = peak_bytes.max(HEAP.sampled_peak());
    }

    Ok(MemoryStats {
        peak_bytes,
        output_bytes: warm.output_bytes,
    })
}

fn write_snapshot(dir: &Path, stem: &str, run: &RunRecord) -> Result<()> {
    write_json(&dir.join(format!("{}.json", stem)), run)?;
    write_csv(&dir.join(format!("{}.csv", stem)), &run.metrics)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value).with_context(|| format!("write {}", path.display()))
}

fn write_csv(path: &Path, metrics: &[ScenarioMetrics]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{}", CSV_HEADER)?;
    for metric in metrics {
        writeln!(writer, "{}", metric.csv_row())?;
    }
    writer.flush().with_context(|| format!("flush {}", path.display()))
}

/// JSON snapshots in `dir`, oldest first (stamps sort lexically).
fn snapshot_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    Ok(paths)
}

fn prune_history(history_dir: &Path, limit: usize) -> Result<()> {
    let paths = snapshot_paths(history_dir)?;
    let excess = paths.len().saturating_sub(limit);
    for path in &paths[..excess] {
        fs::remove_file(path).with_context(|| format!("remove old history snapshot {}", path.display()))?;
        let csv = path.with_extension("csv");
        if csv.exists() {
            fs::remove_file(&csv).with_context(|| format!("remove old history snapshot {}", csv.display()))?;
        }
    }
    Ok(())
}

/// Newest `limit` snapshots, newest first, metrics sorted by scenario then variant.
fn load_history_runs(history_dir: &Path, limit: usize) -> Result<Vec<RunRecord>> {
    snapshot_paths(history_dir)?
        .iter()
        .rev()
        .take(limit)
        .map(|path| -> Result<RunRecord> {
            let raw =
                fs::read_to_string(path).with_context(|| format!("read history snapshot {}", path.display()))?;
            let mut run: RunRecord = serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
            run.metrics
                .sort_by(|a, b| a.scenario.cmp(&b.scenario).then_with(|| a.variant.cmp(&b.variant)));
            Ok(run)
        })
        .collect()
}

fn render_dashboard(history: &HistoryFile) -> Result<String> {
    let json = serde_json::to_string(history).context("serialize history to embed in HTML")?;
    Ok(DASHBOARD_TEMPLATE.replace(DATA_PLACEHOLDER, &json))
}
