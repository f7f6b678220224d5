use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;

pub const DEFAULT_CONFIG_NAME: &str = "Config";
const ENV_PREFIX: &str = "BOM_RADAR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub historical_archive: PathBuf,
    pub incoming_archive: PathBuf,
    pub critical_items: Option<PathBuf>,
    pub report_path: PathBuf,
    /// Pairs whose support falls below this are reported as rare.
    pub support_threshold: f64,
    pub columns: ColumnConfig,
    pub normalizer: NormalizerConfig,
    pub loader: LoaderConfig,
    pub mining: MiningConfig,
}

/// Header names as they appear in the BOM workbooks. Matching is exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub component: String,
    pub material: String,
    pub description: String,
    pub critical_item: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub component_pattern: String,
    /// Each character is a fallback separator.
    pub separators: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub extension: String,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiningAlgorithm {
    Apriori,
    FpGrowth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub algorithm: MiningAlgorithm,
    pub min_support: f64,
    pub min_confidence: f64,
    /// Largest itemset searched. 0 means unbounded.
    pub max_itemset_len: usize,
    /// Tag each item with the pair's status before mining.
    pub items_include_status: bool,
    pub sampling: SamplingPolicy,
}

/// Approximate mining mode: shrink the corpus to its most frequent components,
/// materials and files before searching for itemsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingPolicy {
    pub enabled: bool,
    pub sampling_quantile: f64,
    pub max_files_to_sample: usize,
    pub item_support_multiplier: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            historical_archive: PathBuf::from("Historical_BOM.zip"),
            incoming_archive: PathBuf::from("To_be_Added.zip"),
            critical_items: None,
            report_path: PathBuf::from("BOM_Report.xlsx"),
            support_threshold: 0.035,
            columns: ColumnConfig::default(),
            normalizer: NormalizerConfig::default(),
            loader: LoaderConfig::default(),
            mining: MiningConfig::default(),
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            component: "Component".to_string(),
            material: "kmfg material".to_string(),
            description: "Description / TITLE".to_string(),
            critical_item: "ItemID_KONE".to_string(),
        }
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            component_pattern: r"KM\d+".to_string(),
            separators: "/".to_string(),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extension: ".xlsx".to_string(),
            exclude_patterns: vec!["*__MACOSX*".to_string()],
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            algorithm: MiningAlgorithm::Apriori,
            min_support: 0.07,
            min_confidence: 0.5,
            max_itemset_len: 2,
            items_include_status: false,
            sampling: SamplingPolicy::default(),
        }
    }
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            sampling_quantile: 0.9,
            max_files_to_sample: 2,
            item_support_multiplier: 3.0,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Error> {
        check_fraction("support_threshold", self.support_threshold)?;
        check_fraction("mining.min_support", self.mining.min_support)?;
        check_fraction("mining.min_confidence", self.mining.min_confidence)?;

        let sampling = &self.mining.sampling;
        check_fraction("mining.sampling.sampling_quantile", sampling.sampling_quantile)?;
        if sampling.max_files_to_sample == 0 {
            return Err(Error::InvalidConfig(
                "mining.sampling.max_files_to_sample must be at least 1".to_string(),
            ));
        }
        let multiplier = sampling.item_support_multiplier;
        if multiplier.is_nan() || multiplier < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "mining.sampling.item_support_multiplier must be non-negative, got {}",
                multiplier
            )));
        }
        if self.columns.component.is_empty() || self.columns.material.is_empty() {
            return Err(Error::InvalidConfig(
                "component and material column names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_fraction(name: &str, value: f64) -> Result<(), Error> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    load_configuration_from(DEFAULT_CONFIG_NAME)
}

/// Layer `BOM_RADAR_*` environment variables over an optional config file.
/// Nested keys use `__`, e.g. `BOM_RADAR_MINING__MIN_SUPPORT`.
pub fn load_configuration_from(name: &str) -> Result<AppConfig, ConfigError> {
    with_environment(Config::builder().add_source(ConfigFile::with_name(name).required(false)))
}

/// Like [`load_configuration_from`], but the file at `path` must exist.
pub fn load_configuration_file(path: &Path) -> Result<AppConfig, ConfigError> {
    with_environment(Config::builder().add_source(ConfigFile::from(path).required(true)))
}

fn with_environment(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, ConfigError> {
    builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<AppConfig>()
}
