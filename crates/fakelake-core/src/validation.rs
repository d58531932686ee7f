use crate::config::GenerationConfig;
use crate::error::{Error, Result};

/// Validate a run configuration before any file is touched.
///
/// This checks:
/// - every dimension has at least one row
/// - the fact table has at least one row and a non-zero chunk size
/// - the sale date range is not inverted
/// - the row group size is positive
pub fn validate_config(config: &GenerationConfig) -> Result<()> {
    let sizes = &config.dimensions;
    for (name, rows) in [
        ("dimensions.customers", sizes.customers),
        ("dimensions.products", sizes.products),
        ("dimensions.stores", sizes.stores),
        ("facts.total_rows", config.facts.total_rows),
        ("facts.chunk_size", config.facts.chunk_size),
    ] {
        if rows == 0 {
            return Err(Error::InvalidConfig(format!("{name} must be at least 1")));
        }
    }

    if config.facts.start_date > config.facts.end_date {
        return Err(Error::InvalidConfig(format!(
            "facts.start_date {} is after facts.end_date {}",
            config.facts.start_date, config.facts.end_date
        )));
    }

    if config.output.max_row_group_size == 0 {
        return Err(Error::InvalidConfig(
            "output.max_row_group_size must be at least 1".to_string(),
        ));
    }

    if config.base_dir.as_os_str().is_empty() {
        return Err(Error::InvalidConfig("base_dir must not be empty".to_string()));
    }

    Ok(())
}
