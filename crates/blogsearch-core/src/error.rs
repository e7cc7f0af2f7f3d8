//! Error types for Blogsearch

use thiserror::Error;

/// Result type alias using Blogsearch's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Blogsearch error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Index errors (E001-E099)
    #[error("Failed to build search index: {0}")]
    IndexFetchFailed(String),

    // Network errors (E100-E199)
    #[error("Network error: {0}. Check that the data store is reachable.")]
    NetworkError(#[from] reqwest::Error),

    #[error("Data store returned HTTP {status} for {url}")]
    DataStoreStatus { status: u16, url: String },

    // Ranking errors (E200-E299)
    #[error("Ranking failed: {0}")]
    RankingFailed(String),

    // Storage errors (E300-E399)
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::IndexFetchFailed(_) => "E001",
            Self::NetworkError(_) => "E100",
            Self::DataStoreStatus { .. } => "E101",
            Self::RankingFailed(_) => "E200",
            Self::StorageError(_) => "E300",
            Self::SerializationError(_) => "E301",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NetworkError(_) | Self::IndexFetchFailed(_) => {
                Some("Check `api.base_url` or set BLOGSEARCH_API_URL".to_string())
            }
            Self::DataStoreStatus { status, .. } if *status == 404 => {
                Some("The data store must expose /users and /posts collections".to_string())
            }
            Self::StorageError(_) => Some("Check permissions on `storage.data_dir`".to_string()),
            Self::ConfigError(_) => Some("Review config.toml or delete it to use defaults".to_string()),
            _ => None,
        }
    }

    /// Whether the failure came from talking to the data store
    pub fn is_network(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::DataStoreStatus { .. })
    }
}
