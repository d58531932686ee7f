use std::path::PathBuf;

use fakelake_core::{DimensionSizes, FactConfig, GenerationConfig};
use fakelake_generate::GenerationEngine;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let base_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data_fake_small"));

    let config = GenerationConfig {
        base_dir,
        dimensions: DimensionSizes {
            customers: 1_000,
            products: 200,
            stores: 20,
        },
        facts: FactConfig {
            total_rows: 250_000,
            chunk_size: 100_000,
            ..FactConfig::default()
        },
        ..GenerationConfig::default()
    };

    let result = GenerationEngine::new(config)?.run()?;
    println!("{}", serde_json::to_string_pretty(&result.report)?);
    Ok(())
}
