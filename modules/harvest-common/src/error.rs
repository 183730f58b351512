use thiserror::Error;

/// Result type alias for configuration and sources-file loading.
pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read sources file {path}: {source}")]
    SourcesRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse sources file {path}: {source}")]
    SourcesParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
