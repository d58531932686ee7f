//! Record of the chunks a fact run has completed.
//!
//! The manifest lives next to the chunks as `_manifest.json` and is
//! rewritten atomically after every chunk, so it never lists a chunk whose
//! files were not fully published.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use fakelake_core::{ARTIFACT_VERSION, DimensionSizes, GenerationConfig, PartitionLayout};

use crate::errors::GenerationError;
use crate::output::write_json_atomic;

/// Parameters that determine the content of every chunk. A resumed run must
/// match them exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestParams {
    pub seed: u64,
    /// Anchor of the dimension dates; prices depend on it through the
    /// product stream.
    pub reference_date: NaiveDate,
    pub total_rows: u64,
    pub chunk_size: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub partition_layout: PartitionLayout,
    pub dimensions: DimensionSizes,
}

impl From<&GenerationConfig> for ManifestParams {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            seed: config.seed,
            reference_date: config.reference_date,
            total_rows: config.facts.total_rows,
            chunk_size: config.facts.chunk_size,
            start_date: config.facts.start_date,
            end_date: config.facts.end_date,
            partition_layout: config.facts.partition_layout,
            dimensions: config.dimensions.clone(),
        }
    }
}

impl ManifestParams {
    /// Human readable list of fields that differ from `other`.
    pub fn differences(&self, other: &Self) -> Vec<String> {
        let mut diffs = Vec::new();
        let mut check = |name: &str, left: String, right: String| {
            if left != right {
                diffs.push(format!("{name}: manifest={left} run={right}"));
            }
        };
        check("seed", self.seed.to_string(), other.seed.to_string());
        check(
            "reference_date",
            self.reference_date.to_string(),
            other.reference_date.to_string(),
        );
        check("total_rows", self.total_rows.to_string(), other.total_rows.to_string());
        check("chunk_size", self.chunk_size.to_string(), other.chunk_size.to_string());
        check("start_date", self.start_date.to_string(), other.start_date.to_string());
        check("end_date", self.end_date.to_string(), other.end_date.to_string());
        check(
            "partition_layout",
            self.partition_layout.to_string(),
            other.partition_layout.to_string(),
        );
        check(
            "dimensions",
            format!("{:?}", self.dimensions),
            format!("{:?}", other.dimensions),
        );
        diffs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    InProgress,
    Completed,
    Failed,
}

/// One published chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub index: u64,
    pub first_id: i64,
    pub last_id: i64,
    pub rows: u64,
    /// Paths relative to the fact directory.
    pub files: Vec<String>,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactManifest {
    pub version: String,
    pub run_id: String,
    pub status: ManifestStatus,
    pub params: ManifestParams,
    pub chunks: Vec<ChunkRecord>,
}

impl FactManifest {
    pub fn new(run_id: &str, params: ManifestParams) -> Self {
        Self {
            version: ARTIFACT_VERSION.to_string(),
            run_id: run_id.to_string(),
            status: ManifestStatus::InProgress,
            params,
            chunks: Vec::new(),
        }
    }

    /// `Ok(None)` when no manifest exists at `path`.
    pub fn load(path: &Path) -> Result<Option<Self>, GenerationError> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(GenerationError::read(path, err)),
        };
        let manifest = serde_json::from_slice(&data).map_err(|err| GenerationError::read(path, err))?;
        Ok(Some(manifest))
    }

    pub fn save(&self, path: &Path) -> Result<(), GenerationError> {
        write_json_atomic(path, self)
    }

    pub fn ensure_matches(&self, params: &ManifestParams) -> Result<(), GenerationError> {
        let diffs = self.params.differences(params);
        if diffs.is_empty() {
            Ok(())
        } else {
            Err(GenerationError::ManifestMismatch(diffs.join(", ")))
        }
    }

    pub fn chunk(&self, index: u64) -> Option<&ChunkRecord> {
        self.chunks.iter().find(|chunk| chunk.index == index)
    }

    /// The record of `index` when every file it lists is still on disk.
    pub fn completed_chunk(&self, index: u64, fact_dir: &Path) -> Option<&ChunkRecord> {
        self.chunk(index)
            .filter(|chunk| chunk.files.iter().all(|file| fact_dir.join(file).is_file()))
    }

    /// Insert or replace the record of a chunk, keeping index order.
    pub fn record(&mut self, chunk: ChunkRecord) {
        self.chunks.retain(|existing| existing.index != chunk.index);
        let position = self
            .chunks
            .partition_point(|existing| existing.index < chunk.index);
        self.chunks.insert(position, chunk);
    }

    pub fn rows_recorded(&self) -> u64 {
        self.chunks.iter().map(|chunk| chunk.rows).sum()
    }
}
