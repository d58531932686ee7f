//! Seeded value generation shared by the dimension and fact generators.

pub mod dimensions;
pub mod semantic;

use std::ops::Range;

use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use fakelake_core::Dimension;

use crate::errors::GenerationError;

pub use dimensions::{CustomerGenerator, ProductGenerator, StoreGenerator, generator_for};

/// Inputs shared by every dimension generator in a run.
#[derive(Debug, Clone, Copy)]
pub struct DimensionContext {
    /// "Today" for relative date windows.
    pub reference_date: NaiveDate,
}

/// Produces rows for one dimension table.
///
/// Generators are called with consecutive id ranges on a single random
/// stream, so the table content depends only on the seed and the row count.
pub trait DimensionGenerator {
    fn dimension(&self) -> Dimension;

    fn generate_batch(
        &self,
        ids: Range<i64>,
        ctx: &DimensionContext,
        rng: &mut dyn RngCore,
    ) -> Result<RecordBatch, GenerationError>;
}

/// Derive a per-table seed from the run seed (FNV-1a over the table name).
pub fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Derive the seed of one fact chunk from the table seed.
pub fn chunk_seed(table_seed: u64, chunk_index: u64) -> u64 {
    let mut hash = table_seed ^ chunk_index.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= chunk_index;
    hash = hash.wrapping_mul(0x100000001b3);
    hash
}

pub fn table_rng(seed: u64, table: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(hash_seed(seed, table))
}

pub fn chunk_rng(seed: u64, table: &str, chunk_index: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(chunk_seed(hash_seed(seed, table), chunk_index))
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn table_seeds_differ_per_table() {
        let seeds: Vec<u64> = Dimension::ALL
            .iter()
            .map(|dim| hash_seed(42, dim.table_name()))
            .collect();
        assert_ne!(seeds[0], seeds[1]);
        assert_ne!(seeds[1], seeds[2]);
        assert_ne!(seeds[0], seeds[2]);
    }

    #[test]
    fn chunk_streams_are_reproducible_and_distinct() {
        let first: u64 = chunk_rng(42, "fato_vendas", 0).random();
        let again: u64 = chunk_rng(42, "fato_vendas", 0).random();
        let second: u64 = chunk_rng(42, "fato_vendas", 1).random();
        assert_eq!(first, again);
        assert_ne!(first, second);
    }
}
