use thiserror::Error;

#[derive(Error, Debug)]
pub enum NowwitError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Insight client error: {0}")]
    Client(#[from] crate::client::InsightError),

    #[error("Other error: {0}")]
    Other(String),
}

/// Failures of the local persistence slot. The collection store logs these
/// and degrades to an empty or stale collection instead of returning them.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
