use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::file_utils::FileManager;

/// Pipeline configuration module
/// This module handles the pipeline configuration including loading,
/// validating and saving configuration settings.
/// Represents the pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Batching and concurrency settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Quality checking settings
    #[serde(default)]
    pub quality: QualityConfig,

    /// Crash recovery settings
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Cost estimation settings
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Quality tier requested for a translation run
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    // @tier: cheapest, no checks
    Fast,
    // @tier: default
    #[default]
    Balanced,
    // @tier: strictest, runs the quality checker on every item
    Professional,
}

impl QualityTier {
    // @returns: Whether every translated item is quality-checked
    pub fn runs_quality_checks(&self) -> bool {
        matches!(self, Self::Professional)
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Professional => "professional",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for QualityTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "professional" => Ok(Self::Professional),
            _ => Err(anyhow!("Invalid quality tier: {}", s)),
        }
    }
}

/// Batching and concurrency configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BatchConfig {
    /// Maximum canonical items per batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Estimated token budget per batch
    #[serde(default = "default_max_tokens_per_batch")]
    pub max_tokens_per_batch: usize,

    /// Maximum batches in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Pause after each batch before its worker slot frees up
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
}

impl BatchConfig {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_tokens_per_batch: default_max_tokens_per_batch(),
            concurrency: default_concurrency(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
        }
    }
}

/// Quality checking configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QualityConfig {
    /// Tier used when a request does not specify one
    #[serde(default)]
    pub tier: QualityTier,

    /// Minimum acceptable length ratio (translated / original)
    #[serde(default = "default_min_length_ratio")]
    pub min_length_ratio: f64,

    /// Maximum acceptable length ratio (translated / original)
    #[serde(default = "default_max_length_ratio")]
    pub max_length_ratio: f64,

    /// Re-translate items whose check reports error-severity issues
    #[serde(default)]
    pub retry_on_error_issues: bool,

    /// Re-translation attempts per item
    #[serde(default = "default_max_quality_retries")]
    pub max_quality_retries: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            tier: QualityTier::default(),
            min_length_ratio: default_min_length_ratio(),
            max_length_ratio: default_max_length_ratio(),
            retry_on_error_issues: false,
            max_quality_retries: default_max_quality_retries(),
        }
    }
}

/// Crash recovery configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecoveryConfig {
    /// Persist sessions to disk
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding one JSON file per session
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Autosave period in seconds
    #[serde(default = "default_autosave_interval_secs")]
    pub autosave_interval_secs: u64,

    /// Sessions older than this are removed by cleanup
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,
}

impl RecoveryConfig {
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    /// Get the recovery directory, falling back to the user data directory
    pub fn resolve_directory(&self) -> Result<PathBuf> {
        match &self.directory {
            Some(dir) => Ok(dir.clone()),
            None => FileManager::default_recovery_dir(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            autosave_interval_secs: default_autosave_interval_secs(),
            max_age_days: default_max_age_days(),
        }
    }
}

/// Pricing used for cost estimates, in minor currency units per 1000 tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PricingConfig {
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_input_cost")]
    pub input_cost_per_1k_tokens: f64,

    #[serde(default = "default_output_cost")]
    pub output_cost_per_1k_tokens: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            input_cost_per_1k_tokens: default_input_cost(),
            output_cost_per_1k_tokens: default_output_cost(),
        }
    }
}

/// Log level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_max_batch_size() -> usize {
    10
}

fn default_max_tokens_per_batch() -> usize {
    2000
}

fn default_concurrency() -> usize {
    3
}

fn default_inter_batch_delay_ms() -> u64 {
    100
}

fn default_min_length_ratio() -> f64 {
    0.5
}

fn default_max_length_ratio() -> f64 {
    2.0
}

fn default_max_quality_retries() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_autosave_interval_secs() -> u64 {
    30
}

fn default_max_age_days() -> u64 {
    7
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_input_cost() -> f64 {
    0.15
}

fn default_output_cost() -> f64 {
    0.60
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = FileManager::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        FileManager::write_to_file(path, &content)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.batch.max_batch_size == 0 {
            return Err(anyhow!("batch.max_batch_size must be greater than zero"));
        }
        if self.batch.max_tokens_per_batch == 0 {
            return Err(anyhow!("batch.max_tokens_per_batch must be greater than zero"));
        }
        if self.batch.concurrency == 0 {
            return Err(anyhow!("batch.concurrency must be greater than zero"));
        }
        if self.quality.min_length_ratio <= 0.0
            || self.quality.min_length_ratio >= self.quality.max_length_ratio
        {
            return Err(anyhow!(
                "Invalid length ratio bounds: min {} must be positive and below max {}",
                self.quality.min_length_ratio,
                self.quality.max_length_ratio
            ));
        }
        if self.recovery.autosave_interval_secs == 0 {
            return Err(anyhow!("recovery.autosave_interval_secs must be greater than zero"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            batch: BatchConfig::default(),
            quality: QualityConfig::default(),
            recovery: RecoveryConfig::default(),
            pricing: PricingConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
