use crate::errors::GenerationError;

/// One unit of fact generation: a contiguous id range written as one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkTask {
    pub index: u64,
    /// First sale id, 1-based.
    pub first_id: i64,
    pub rows: u64,
}

impl ChunkTask {
    pub fn last_id(&self) -> i64 {
        self.first_id + self.rows as i64 - 1
    }
}

/// Split `total_rows` into `ceil(total_rows / chunk_size)` tasks with
/// contiguous ids. Only the last task may be shorter than `chunk_size`.
pub fn plan_chunks(total_rows: u64, chunk_size: u64) -> Result<Vec<ChunkTask>, GenerationError> {
    if chunk_size == 0 {
        return Err(GenerationError::Config(fakelake_core::Error::InvalidConfig(
            "facts.chunk_size must be at least 1".to_string(),
        )));
    }
    if total_rows > i64::MAX as u64 {
        return Err(GenerationError::Config(fakelake_core::Error::InvalidConfig(
            "facts.total_rows does not fit in a 64-bit id".to_string(),
        )));
    }

    let mut tasks = Vec::with_capacity(total_rows.div_ceil(chunk_size) as usize);
    let mut generated = 0_u64;
    let mut index = 0_u64;
    while generated < total_rows {
        let rows = chunk_size.min(total_rows - generated);
        tasks.push(ChunkTask {
            index,
            first_id: generated as i64 + 1,
            rows,
        });
        generated += rows;
        index += 1;
    }

    Ok(tasks)
}
