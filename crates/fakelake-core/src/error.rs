use thiserror::Error;

/// Core error type shared across fakelake crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The run configuration violates its invariants.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results returned by fakelake crates.
pub type Result<T> = std::result::Result<T, Error>;
