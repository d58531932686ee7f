use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::OutputLayout;

/// Full configuration of a generation run.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
/// Dates are written as quoted ISO strings (`"2020-01-01"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Directory that receives every table.
    pub base_dir: PathBuf,
    /// Root seed; every random stream in a run is derived from it.
    pub seed: u64,
    /// Anchor for relative dimension dates ("18 to 70 years ago").
    pub reference_date: NaiveDate,
    pub dimensions: DimensionSizes,
    pub facts: FactConfig,
    pub output: OutputConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data_fake_bigdata"),
            seed: 42,
            reference_date: ymd(2025, 12, 31),
            dimensions: DimensionSizes::default(),
            facts: FactConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl GenerationConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.base_dir)
    }
}

/// Row counts for the dimension tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DimensionSizes {
    pub customers: u64,
    pub products: u64,
    pub stores: u64,
}

impl Default for DimensionSizes {
    fn default() -> Self {
        Self {
            customers: 1_000_000,
            products: 50_000,
            stores: 5_000,
        }
    }
}

/// Parameters of the chunked fact generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactConfig {
    pub total_rows: u64,
    pub chunk_size: u64,
    /// First sale date, inclusive.
    pub start_date: NaiveDate,
    /// Last sale date, inclusive.
    pub end_date: NaiveDate,
    pub partition_layout: PartitionLayout,
    /// Skip chunks a previous run with identical parameters already wrote.
    pub resume: bool,
}

impl Default for FactConfig {
    fn default() -> Self {
        Self {
            total_rows: 50_000_000,
            chunk_size: 1_000_000,
            start_date: ymd(2020, 1, 1),
            end_date: ymd(2025, 12, 31),
            partition_layout: PartitionLayout::default(),
            resume: false,
        }
    }
}

impl FactConfig {
    /// `ceil(total_rows / chunk_size)`; zero when `chunk_size` is zero.
    pub fn chunk_count(&self) -> u64 {
        if self.chunk_size == 0 {
            return 0;
        }
        self.total_rows.div_ceil(self.chunk_size)
    }

    /// Number of days between the first and the last sale date.
    pub fn day_span(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// How fact rows are placed on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionLayout {
    /// One file per chunk; `year`/`month` are plain columns.
    #[default]
    Columns,
    /// Each chunk is split into `year=YYYY/month=MM` directories.
    Hive,
}

impl PartitionLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Columns => "columns",
            Self::Hive => "hive",
        }
    }
}

impl fmt::Display for PartitionLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionLayout {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "columns" => Ok(Self::Columns),
            "hive" => Ok(Self::Hive),
            other => Err(Error::InvalidConfig(format!(
                "unknown partition layout '{other}' (expected 'columns' or 'hive')"
            ))),
        }
    }
}

/// Columnar file settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub compression: Compression,
    pub max_row_group_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            max_row_group_size: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    #[default]
    Snappy,
    Zstd,
    None,
}

impl Compression {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snappy => "snappy",
            Self::Zstd => "zstd",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "snappy" => Ok(Self::Snappy),
            "zstd" => Ok(Self::Zstd),
            "none" => Ok(Self::None),
            other => Err(Error::InvalidConfig(format!(
                "unknown compression '{other}' (expected 'snappy', 'zstd' or 'none')"
            ))),
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_dataset() {
        let config = GenerationConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.dimensions.customers, 1_000_000);
        assert_eq!(config.dimensions.products, 50_000);
        assert_eq!(config.dimensions.stores, 5_000);
        assert_eq!(config.facts.total_rows, 50_000_000);
        assert_eq!(config.facts.chunk_size, 1_000_000);
        assert_eq!(config.facts.chunk_count(), 50);
        assert_eq!(config.facts.day_span(), 2191);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = GenerationConfig::from_toml_str(
            r#"
base_dir = "out"
seed = 7

[facts]
total_rows = 100
chunk_size = 40
start_date = "2021-06-01"
partition_layout = "hive"
"#,
        )
        .expect("parse config");

        assert_eq!(config.base_dir, PathBuf::from("out"));
        assert_eq!(config.seed, 7);
        assert_eq!(config.facts.chunk_count(), 3);
        assert_eq!(config.facts.start_date, ymd(2021, 6, 1));
        assert_eq!(config.facts.end_date, ymd(2025, 12, 31));
        assert_eq!(config.facts.partition_layout, PartitionLayout::Hive);
        assert_eq!(config.dimensions, DimensionSizes::default());
        assert_eq!(config.output.compression, Compression::Snappy);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = GenerationConfig::from_toml_str("rows = 10\n");
        assert!(matches!(result, Err(Error::TomlDecode(_))));
    }

    #[test]
    fn chunk_count_rounds_up() {
        let facts = FactConfig {
            total_rows: 2_500_000,
            chunk_size: 1_000_000,
            ..FactConfig::default()
        };
        assert_eq!(facts.chunk_count(), 3);

        let facts = FactConfig {
            total_rows: 10,
            chunk_size: 0,
            ..FactConfig::default()
        };
        assert_eq!(facts.chunk_count(), 0);
    }

    #[test]
    fn enums_parse_from_cli_strings() {
        assert_eq!("hive".parse::<PartitionLayout>().ok(), Some(PartitionLayout::Hive));
        assert_eq!("zstd".parse::<Compression>().ok(), Some(Compression::Zstd));
        assert!("gzip".parse::<Compression>().is_err());
    }
}
