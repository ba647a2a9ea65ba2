pub mod config;
pub mod kernels;
pub mod util;

// Scenario registry shared by benches, the CLI and the dashboard
pub mod perf;


pub use config::{CONFIG_ENV, WorkloadConfig};
