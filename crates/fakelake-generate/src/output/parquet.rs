use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression as ParquetCompression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use fakelake_core::{Compression, OutputConfig};

use super::CountingWriter;
use super::atomic::{sync_dir, temp_path};
use crate::errors::{GenerationError, StorageError};

const IN_PROGRESS_SUFFIX: &str = "inprogress";

/// Parquet file settings derived from the run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    pub compression: Compression,
    pub max_row_group_size: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self::from(&OutputConfig::default())
    }
}

impl From<&OutputConfig> for WriterOptions {
    fn from(config: &OutputConfig) -> Self {
        Self {
            compression: config.compression,
            max_row_group_size: config.max_row_group_size,
        }
    }
}

impl WriterOptions {
    fn properties(&self) -> WriterProperties {
        let compression = match self.compression {
            Compression::Snappy => ParquetCompression::SNAPPY,
            Compression::Zstd => ParquetCompression::ZSTD(ZstdLevel::default()),
            Compression::None => ParquetCompression::UNCOMPRESSED,
        };
        WriterProperties::builder()
            .set_compression(compression)
            .set_max_row_group_size(self.max_row_group_size.max(1))
            .build()
    }
}

/// Writes one Parquet file that only becomes visible once it is complete.
///
/// Batches go to `<path>.inprogress`; [`ParquetTableWriter::finish`] writes
/// the footer, syncs, and renames the file into place. A writer dropped
/// before `finish` removes its temporary file, so readers never see a
/// truncated table.
pub struct ParquetTableWriter {
    path: PathBuf,
    tmp_path: PathBuf,
    writer: Option<ArrowWriter<CountingWriter<BufWriter<File>>>>,
    rows: u64,
    staged: bool,
}

impl ParquetTableWriter {
    pub fn create(
        path: &Path,
        schema: SchemaRef,
        options: &WriterOptions,
    ) -> Result<Self, GenerationError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| GenerationError::write(path, err))?;
            }
        }

        let tmp_path = temp_path(path, IN_PROGRESS_SUFFIX);
        let file = File::create(&tmp_path).map_err(|err| GenerationError::write(path, err))?;
        let sink = CountingWriter::new(BufWriter::new(file));
        let writer = ArrowWriter::try_new(sink, schema, Some(options.properties()))
            .map_err(|err| GenerationError::write(path, err))?;

        Ok(Self {
            path: path.to_path_buf(),
            tmp_path,
            writer: Some(writer),
            rows: 0,
            staged: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn write(&mut self, batch: &RecordBatch) -> Result<(), GenerationError> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            GenerationError::write(
                &self.path,
                std::io::Error::other("parquet writer already finished"),
            )
        })?;
        writer
            .write(batch)
            .map_err(|err| GenerationError::write(&self.path, err))?;
        self.rows += batch.num_rows() as u64;
        Ok(())
    }

    /// Flush the footer and publish the file. Returns the file size in bytes.
    pub fn finish(self) -> Result<u64, GenerationError> {
        self.stage()?.publish()
    }

    /// Flush the footer and sync the temporary file without renaming it.
    ///
    /// The returned [`StagedFile`] owns the temporary file from here on.
    pub fn stage(mut self) -> Result<StagedFile, GenerationError> {
        let Some(writer) = self.writer.take() else {
            return Err(GenerationError::write(
                &self.path,
                std::io::Error::other("parquet writer already finished"),
            ));
        };
        let bytes = flush(writer).map_err(|err| GenerationError::write(&self.path, err))?;
        self.staged = true;
        Ok(StagedFile {
            path: self.path.clone(),
            tmp_path: self.tmp_path.clone(),
            bytes,
            published: false,
        })
    }
}

fn flush(writer: ArrowWriter<CountingWriter<BufWriter<File>>>) -> Result<u64, StorageError> {
    let sink = writer.into_inner()?;
    let bytes = sink.bytes_written();
    let file = sink.into_inner().into_inner().map_err(|err| err.into_error())?;
    file.sync_all()?;
    Ok(bytes)
}

impl Drop for ParquetTableWriter {
    fn drop(&mut self) {
        if !self.staged {
            let _ = std::fs::remove_file(&self.tmp_path);
        }
    }
}

/// A complete Parquet file still under its temporary name.
///
/// Dropped without [`StagedFile::publish`], the temporary file is removed.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    tmp_path: PathBuf,
    bytes: u64,
    published: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Rename into place. On error the final path may exist and the caller
    /// owns its removal.
    pub fn publish(mut self) -> Result<u64, GenerationError> {
        std::fs::rename(&self.tmp_path, &self.path)
            .map_err(|err| GenerationError::write(&self.path, err))?;
        self.published = true;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                sync_dir(parent).map_err(|err| GenerationError::write(&self.path, err))?;
            }
        }
        Ok(self.bytes)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.published {
            let _ = std::fs::remove_file(&self.tmp_path);
        }
    }
}

/// Publish every staged file, or none of them.
///
/// Files already renamed are removed again when a later rename fails.
/// Returns the final paths with their sizes, in input order.
pub fn publish_all(staged: Vec<StagedFile>) -> Result<Vec<(PathBuf, u64)>, GenerationError> {
    let mut published: Vec<(PathBuf, u64)> = Vec::with_capacity(staged.len());
    for file in staged {
        let path = file.path().to_path_buf();
        match file.publish() {
            Ok(bytes) => published.push((path, bytes)),
            Err(err) => {
                let _ = std::fs::remove_file(&path);
                for (done, _) in &published {
                    let _ = std::fs::remove_file(done);
                }
                return Err(err);
            }
        }
    }
    Ok(published)
}

/// Write a set of batches as one file, left staged under its temporary name.
pub fn stage_batches(
    path: &Path,
    schema: SchemaRef,
    batches: &[RecordBatch],
    options: &WriterOptions,
) -> Result<StagedFile, GenerationError> {
    let mut writer = ParquetTableWriter::create(path, schema, options)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.stage()
}

/// Write a set of batches as one complete file.
pub fn write_batches(
    path: &Path,
    schema: SchemaRef,
    batches: &[RecordBatch],
    options: &WriterOptions,
) -> Result<u64, GenerationError> {
    stage_batches(path, schema, batches, options)?.publish()
}
