//! Workload sizes for every kernel, loadable from a TOML file.
//!
//! ```toml
//! series_terms = 1000000
//! batch_size = 10000
//! fibonacci_terms = 40
//! fibonacci_repeats = 1000
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::kernels::{fibonacci, records, series};

/// Environment variable naming a workload TOML file, shared by the CLI, benches and dashboard.
pub const CONFIG_ENV: &str = "KERNELBENCH_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadConfig {
    pub series_terms: u64,
    pub batch_size: usize,
    pub fibonacci_terms: u32,
    pub fibonacci_repeats: u32,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            series_terms: series::REFERENCE_TERMS,
            batch_size: records::REFERENCE_BATCH_SIZE,
            fibonacci_terms: fibonacci::REFERENCE_TERMS,
            fibonacci_repeats: fibonacci::REFERENCE_REPEATS,
        }
    }
}

impl WorkloadConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("parse workload config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source =
            std::fs::read_to_string(path).with_context(|| format!("read workload config {}", path.display()))?;
        Self::from_toml_str(&source).with_context(|| format!("load workload config {}", path.display()))
    }

    /// Loads `path` when given, otherwise the reference workload.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Loads the file named by [`CONFIG_ENV`], or the reference workload when it is unset or empty.
    pub fn load_from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).context("serialize workload config")
    }
}
