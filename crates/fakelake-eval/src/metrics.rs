use serde::{Deserialize, Serialize};

/// Metrics contract version for dataset evaluation.
pub const METRICS_VERSION: &str = "0.1";

/// Machine-readable metrics for a dataset evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub metrics_version: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub base_dir: String,
    pub tables: Vec<TableMetrics>,
    pub facts: FactMetrics,
    pub checks: CheckSummary,
    pub violations_total: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<WarningItem>,
    pub performance: PerformanceMetrics,
}

/// Per-table row counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetrics {
    pub table: String,
    pub rows_found: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_expected: Option<u64>,
}

/// What was found in the fact directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactMetrics {
    pub partition_layout: String,
    pub chunks_found: u64,
    pub files_found: u64,
    pub rows_found: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_expected: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_id: Option<i64>,
}

/// Counters for each rule the dataset is checked against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckSummary {
    pub row_counts: CheckStats,
    pub dimension_ids: CheckStats,
    pub fact_ids: CheckStats,
    pub not_null: CheckStats,
    pub referential: CheckStats,
    pub unit_value: CheckStats,
    pub quantity: CheckStats,
    pub total_value: CheckStats,
    pub partition_keys: CheckStats,
    pub sale_date_range: CheckStats,
}

impl CheckSummary {
    /// Rows of the markdown table, in a fixed order.
    pub fn named(&self) -> [(&'static str, &CheckStats); 10] {
        [
            ("row_counts", &self.row_counts),
            ("dimension_ids", &self.dimension_ids),
            ("fact_ids", &self.fact_ids),
            ("not_null", &self.not_null),
            ("referential", &self.referential),
            ("unit_value", &self.unit_value),
            ("quantity", &self.quantity),
            ("total_value", &self.total_value),
            ("partition_keys", &self.partition_keys),
            ("sale_date_range", &self.sale_date_range),
        ]
    }

    pub fn violations(&self) -> u64 {
        self.named().iter().map(|(_, stats)| stats.violations).sum()
    }
}

/// Generic check counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStats {
    pub checked: u64,
    pub violations: u64,
}

/// Structured warning entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningItem {
    pub code: String,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Performance timings for the evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub load_ms: u128,
    pub validate_ms: u128,
    pub total_ms: u128,
}
