use serde::{Deserialize, Serialize};

use fakelake_core::PartitionLayout;

/// Final state of a run, as written to the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Summary of a generated dimension table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub path: String,
    pub rows_requested: u64,
    pub rows_generated: u64,
    pub bytes_written: u64,
    pub duration_ms: u64,
}

/// Summary of one fact chunk, whether written by this run or skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkReport {
    pub index: u64,
    pub first_id: i64,
    pub last_id: i64,
    pub rows: u64,
    pub files: Vec<String>,
    pub bytes_written: u64,
    pub duration_ms: u64,
    /// Already present from an earlier run with identical parameters.
    pub skipped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactReport {
    pub total_rows: u64,
    pub chunk_size: u64,
    pub partition_layout: PartitionLayout,
    pub chunks_planned: u64,
    pub chunks_written: u64,
    pub chunks_skipped: u64,
    pub rows_generated: u64,
    pub bytes_written: u64,
    pub duration_ms: u64,
    pub chunks: Vec<ChunkReport>,
}

impl FactReport {
    pub fn new(total_rows: u64, chunk_size: u64, partition_layout: PartitionLayout) -> Self {
        Self {
            total_rows,
            chunk_size,
            partition_layout,
            chunks_planned: 0,
            chunks_written: 0,
            chunks_skipped: 0,
            rows_generated: 0,
            bytes_written: 0,
            duration_ms: 0,
            chunks: Vec::new(),
        }
    }

    pub fn record_chunk(&mut self, chunk: ChunkReport) {
        if chunk.skipped {
            self.chunks_skipped += 1;
        } else {
            self.chunks_written += 1;
            self.rows_generated += chunk.rows;
            self.bytes_written += chunk.bytes_written;
        }
        self.chunks.push(chunk);
    }

    /// Rows on disk after this run, written now or earlier.
    pub fn rows_available(&self) -> u64 {
        self.chunks.iter().map(|chunk| chunk.rows).sum()
    }
}

/// Report for a generation run, written as `generation_report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub version: String,
    pub run_id: String,
    pub seed: u64,
    pub base_dir: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tables: Vec<TableReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<FactReport>,
    pub bytes_written: u64,
    pub duration_ms: u64,
    pub throughput_bytes_per_sec: f64,
}

impl GenerationReport {
    pub fn new(run_id: String, seed: u64, base_dir: String) -> Self {
        Self {
            version: fakelake_core::ARTIFACT_VERSION.to_string(),
            run_id,
            seed,
            base_dir,
            status: RunStatus::Completed,
            error: None,
            tables: Vec::new(),
            facts: None,
            bytes_written: 0,
            duration_ms: 0,
            throughput_bytes_per_sec: 0.0,
        }
    }

    pub fn record_failure(&mut self, message: String) {
        self.status = RunStatus::Failed;
        self.error = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: u64, skipped: bool) -> ChunkReport {
        ChunkReport {
            index,
            first_id: 1,
            last_id: 40,
            rows: 40,
            files: vec![],
            bytes_written: if skipped { 0 } else { 512 },
            duration_ms: 0,
            skipped,
        }
    }

    #[test]
    fn skipped_chunks_count_as_available_but_not_generated() {
        let mut report = FactReport::new(80, 40, PartitionLayout::Columns);
        report.record_chunk(chunk(0, true));
        report.record_chunk(chunk(1, false));
        assert_eq!(report.chunks_skipped, 1);
        assert_eq!(report.chunks_written, 1);
        assert_eq!(report.rows_generated, 40);
        assert_eq!(report.bytes_written, 512);
        assert_eq!(report.rows_available(), 80);
    }

    #[test]
    fn failure_is_serialized_with_its_message() {
        let mut report = GenerationReport::new("run".to_string(), 42, "out".to_string());
        report.record_failure("disk full".to_string());
        let value = serde_json::to_value(&report).expect("serialize");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "disk full");
        assert!(value.get("facts").is_none());
    }
}
