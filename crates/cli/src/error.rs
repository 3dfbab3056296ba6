//! CLI error type.

use thiserror::Error;

use medusa_storefront_client::config::ConfigError;
use medusa_storefront_client::storage::StorageError;
use medusa_storefront_client::{LoadError, MedusaError};

/// Everything a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State directory error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Backend(#[from] MedusaError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Failed to write output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}
