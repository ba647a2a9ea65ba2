//! Shared performance benchmarking scaffolding used by benches and reporting
//! utilities.
//!
//! Criterion benches, the CLI `verify` command and the dashboard reporter all pull their
//! workloads from here so every tool measures the same scenarios.

pub mod scenarios;

#[cfg(test)]
mod scenarios_test;
