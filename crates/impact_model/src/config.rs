//! Configuration for sampling, sensitivity analysis and logging

use crate::errors::{ImpactError, Result};
use lca_sobol::AnalyzeOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Impact model configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    /// Random draw configuration
    pub sampling: SamplingConfig,
    /// Sobol analysis configuration
    pub sensitivity: SensitivityConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Random draw configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Seed for reproducible draws; entropy-seeded when absent
    pub seed: Option<u64>,
    /// Sobol points skipped before the design (next power of two >= n when absent)
    pub skip_values: Option<usize>,
}

/// Sobol analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    /// Lay out the design for second-order terms (only S1 is reported)
    pub calc_second_order: bool,
    /// Bootstrap resamples for confidence intervals
    pub num_resamples: usize,
    /// Confidence level of the intervals
    pub conf_level: f64,
    /// Analyze (node, method) units on the rayon pool
    pub parallel: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// "pretty" or "compact"
    pub format: String,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            calc_second_order: true,
            num_resamples: 100,
            conf_level: 0.95,
            parallel: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl SensitivityConfig {
    /// Estimator options; `seed` drives the bootstrap
    pub fn analyze_options(&self, seed: Option<u64>) -> AnalyzeOptions {
        AnalyzeOptions {
            num_resamples: self.num_resamples,
            conf_level: self.conf_level,
            seed,
        }
    }
}

impl ImpactConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ImpactError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply `LCA_IMPACT_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("LCA_IMPACT_SEED") {
            self.sampling.seed = Some(parse_env("LCA_IMPACT_SEED", &val)?);
        }
        if let Ok(val) = std::env::var("LCA_IMPACT_SKIP_VALUES") {
            self.sampling.skip_values = Some(parse_env("LCA_IMPACT_SKIP_VALUES", &val)?);
        }
        if let Ok(val) = std::env::var("LCA_IMPACT_NUM_RESAMPLES") {
            self.sensitivity.num_resamples = parse_env("LCA_IMPACT_NUM_RESAMPLES", &val)?;
        }
        if let Ok(val) = std::env::var("LCA_IMPACT_CONF_LEVEL") {
            self.sensitivity.conf_level = parse_env("LCA_IMPACT_CONF_LEVEL", &val)?;
        }
        if let Ok(val) = std::env::var("LCA_IMPACT_PARALLEL") {
            self.sensitivity.parallel = parse_env("LCA_IMPACT_PARALLEL", &val)?;
        }
        if let Ok(val) = std::env::var("LCA_IMPACT_LOG_LEVEL") {
            self.logging.level = val;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let level = self.sensitivity.conf_level;
        if !(level > 0.0 && level < 1.0) {
            return Err(ImpactError::Config(format!(
                "sensitivity.conf_level must lie in (0, 1), got {level}"
            )));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "compact") {
            return Err(ImpactError::Config(format!(
                "logging.format must be \"pretty\" or \"compact\", got {:?}",
                self.logging.format
            )));
        }
        if self.sensitivity.num_resamples == 1 {
            warn!("a single bootstrap resample yields zero-width confidence intervals");
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ImpactError::Config(format!("{key} has invalid value {value:?}")))
}
